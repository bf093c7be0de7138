// src/models/level.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Educational stage a level belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum LevelType {
    Primary,
    Secondary,
    Tertiary,
}

/// Represents the 'levels' table (e.g. "Grade 10", "Year 1").
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Level {
    pub id: i64,
    pub name: String,

    /// Short unique code, also the prefix of derived student IDs.
    pub code: String,
    pub level_type: LevelType,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Level row with aggregated counts for listings.
#[derive(Debug, Serialize, FromRow)]
pub struct LevelSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub level: Level,
    pub student_count: i64,
    pub exam_module_count: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLevelRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Derived from the first three characters of `name` when omitted.
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    pub level_type: LevelType,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLevelRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    pub level_type: Option<LevelType>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_level_validation() {
        let valid = CreateLevelRequest {
            name: "Grade 10".to_string(),
            code: None,
            level_type: LevelType::Secondary,
            description: None,
            is_active: None,
        };
        assert!(valid.validate().is_ok());

        let long_code = CreateLevelRequest {
            name: "Grade 10".to_string(),
            code: Some("X".repeat(21)),
            level_type: LevelType::Secondary,
            description: None,
            is_active: None,
        };
        assert!(long_code.validate().is_err());
    }

    #[test]
    fn test_level_type_serde() {
        let parsed: LevelType = serde_json::from_str("\"tertiary\"").unwrap();
        assert_eq!(parsed, LevelType::Tertiary);
        assert_eq!(
            serde_json::to_string(&LevelType::Primary).unwrap(),
            "\"primary\""
        );
    }
}
