// src/models/exam_module.rs

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Exam codes are stored upper-cased; letters, digits, '-' and '_' only.
pub static EXAM_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid exam code pattern"));

/// Represents the 'exam_modules' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExamModule {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub level_id: i64,
    pub duration_minutes: i64,

    /// Minimum score percentage (0-100) required to pass.
    pub passing_score: i64,
    pub max_attempts: i64,
    pub randomize_questions: bool,
    pub show_correct_answers: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Exam module with figures derived from its questions and attempts.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExamModuleSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub module: ExamModule,

    /// Number of active questions.
    pub total_questions: i64,

    /// Sum of the marks of active questions.
    pub total_marks: i64,
    pub attempts_count: i64,
}

/// DTO for creating an exam module.
/// Omitted settings fall back to the configured exam defaults.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamModuleRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50), regex(path = *EXAM_CODE_RE))]
    pub code: String,
    pub level_id: i64,
    #[validate(range(min = 1, max = 300))]
    pub duration_minutes: Option<i64>,
    #[validate(range(min = 0, max = 100))]
    pub passing_score: Option<i64>,
    #[validate(range(min = 1, max = 10))]
    pub max_attempts: Option<i64>,
    pub randomize_questions: Option<bool>,
    pub show_correct_answers: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExamModuleRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50), regex(path = *EXAM_CODE_RE))]
    pub code: Option<String>,
    pub level_id: Option<i64>,
    #[validate(range(min = 1, max = 300))]
    pub duration_minutes: Option<i64>,
    #[validate(range(min = 0, max = 100))]
    pub passing_score: Option<i64>,
    #[validate(range(min = 1, max = 10))]
    pub max_attempts: Option<i64>,
    pub randomize_questions: Option<bool>,
    pub show_correct_answers: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ExamModuleListParams {
    pub level_id: Option<i64>,
}
