// src/models/question.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// One of the four option letters of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum Answer {
    #[serde(alias = "a")]
    A,
    #[serde(alias = "b")]
    B,
    #[serde(alias = "c")]
    C,
    #[serde(alias = "d")]
    D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Question {
    pub id: i64,
    pub exam_module_id: i64,

    /// The text content of the question (sanitized HTML).
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,

    /// The answer key.
    pub correct_answer: Answer,
    pub difficulty: Difficulty,
    pub category: Option<String>,
    pub marks: i64,

    /// Explanation of the correct answer, shown in result reviews.
    pub explanation: Option<String>,

    /// Display order within the exam.
    pub position: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for sending question to a student (excludes answer key and explanation).
#[derive(Debug, Serialize, FromRow)]
pub struct PublicQuestion {
    pub id: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub marks: i64,
    pub position: i64,
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,
    #[validate(length(min = 1, max = 500))]
    pub option_a: String,
    #[validate(length(min = 1, max = 500))]
    pub option_b: String,
    #[validate(length(min = 1, max = 500))]
    pub option_c: String,
    #[validate(length(min = 1, max = 500))]
    pub option_d: String,
    pub correct_answer: Answer,
    pub difficulty: Option<Difficulty>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(range(min = 1))]
    pub marks: Option<i64>,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    pub position: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub option_a: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub option_b: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub option_c: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub option_d: Option<String>,
    pub correct_answer: Option<Answer>,
    pub difficulty: Option<Difficulty>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(range(min = 1))]
    pub marks: Option<i64>,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    pub position: Option<i64>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_accepts_lowercase() {
        let parsed: Answer = serde_json::from_str("\"c\"").unwrap();
        assert_eq!(parsed, Answer::C);
        assert!(serde_json::from_str::<Answer>("\"E\"").is_err());
    }

    #[test]
    fn test_marks_must_be_positive() {
        let req = CreateQuestionRequest {
            question_text: "2 + 2 = ?".to_string(),
            option_a: "3".to_string(),
            option_b: "4".to_string(),
            option_c: "5".to_string(),
            option_d: "22".to_string(),
            correct_answer: Answer::B,
            difficulty: None,
            category: None,
            marks: Some(0),
            explanation: None,
            position: None,
            is_active: None,
        };
        assert!(req.validate().is_err());
    }
}
