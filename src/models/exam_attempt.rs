// src/models/exam_attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::Answer;

/// Lifecycle of an attempt. `Completed` and `Abandoned` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl AttemptStatus {
    /// The wire name, as used in JSON and in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::Abandoned => "abandoned",
        }
    }
}

/// Represents the 'exam_attempts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExamAttempt {
    pub id: i64,

    /// Primary key of the student (not the human-readable student ID).
    pub student_id: i64,
    pub exam_module_id: i64,

    /// 1-based, contiguous per (student, exam module).
    pub attempt_number: i64,
    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub time_taken_seconds: Option<i64>,

    /// Percentage rounded to 2 decimals; unset until scored.
    pub score: Option<f64>,

    /// Answered questions once completed; the exam size while in progress.
    pub total_questions: i64,
    pub correct_answers: i64,
    pub wrong_answers: i64,
    pub unanswered: i64,
    pub passed: bool,
}

/// Attempt joined with the exam and student it belongs to.
#[derive(Debug, Clone, FromRow)]
pub struct AttemptRow {
    #[sqlx(flatten)]
    pub attempt: ExamAttempt,
    pub exam_code: String,
    pub exam_title: String,
    pub duration_minutes: i64,
    pub show_correct_answers: bool,
    pub student_code: String,
    pub student_name: String,
}

/// Per-question breakdown shown after completion when the exam allows it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AnswerReview {
    pub question_id: i64,
    pub question_text: String,
    pub selected_answer: Option<Answer>,
    pub correct_answer: Answer,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

/// Read model returned to callers of `get_attempt`.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptView {
    #[serde(flatten)]
    pub attempt: ExamAttempt,
    pub grade: &'static str,
    pub exam_code: String,
    pub exam_title: String,
    pub student_code: String,
    pub student_name: String,

    /// Moment after which the attempt is swept as abandoned.
    pub deadline: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<Vec<AnswerReview>>,
}

/// Outcome of submitting an attempt.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptResult {
    pub attempt_id: i64,
    pub score: Option<f64>,
    pub grade: &'static str,
    pub passed: bool,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub wrong_answers: i64,
    pub unanswered: i64,
    pub time_taken_seconds: Option<i64>,
}

/// DTO for starting an attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct StartAttemptRequest {
    #[validate(length(min = 1, max = 50))]
    pub exam_code: String,
}

/// Query filters for the admin result listing.
#[derive(Debug, Default, Deserialize)]
pub struct AttemptListParams {
    pub student_id: Option<i64>,
    pub exam_module_id: Option<i64>,
    pub status: Option<AttemptStatus>,
}
