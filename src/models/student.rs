// src/models/student.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'students' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Student {
    pub id: i64,
    pub full_name: String,

    /// Human-readable login identifier, e.g. `G10004`.
    pub student_id: String,
    pub level_id: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for registering a student. `student_id` is derived from the level when omitted.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(length(min = 3, max = 100))]
    pub student_id: Option<String>,
    pub level_id: i64,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStudentRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,
    #[validate(length(min = 3, max = 100))]
    pub student_id: Option<String>,
    pub level_id: Option<i64>,
    pub is_active: Option<bool>,
}

/// A student with their exam statistics over completed attempts.
#[derive(Debug, Serialize, FromRow)]
pub struct StudentSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub student: Student,
    pub completed_exams_count: i64,
    /// Mean score of scored completed attempts, rounded to 2 decimals; 0 when none.
    pub average_score: f64,
}

#[derive(Debug, Deserialize)]
pub struct StudentListParams {
    pub level_id: Option<i64>,
}
