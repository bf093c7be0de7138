// src/models/student_answer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::question::Answer;

/// Represents the 'student_answers' table: one row per (attempt, question).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentAnswer {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_answer: Option<Answer>,

    /// Fixed when the answer is written; later key edits do not change it.
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// DTO for recording an answer. A `null` selection clears the choice.
#[derive(Debug, Deserialize)]
pub struct RecordAnswerRequest {
    pub question_id: i64,
    pub selected_answer: Option<Answer>,
}
