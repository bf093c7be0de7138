// src/config.rs

use std::{env, fmt, str::FromStr};

/// Defaults applied to exam modules created without explicit settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamDefaults {
    pub duration_minutes: i64,
    pub passing_score: i64,
    pub max_attempts: i64,
    pub randomize_questions: bool,
    pub show_correct_answers: bool,
}

impl Default for ExamDefaults {
    fn default() -> Self {
        Self {
            duration_minutes: 60,
            passing_score: 60,
            max_attempts: 3,
            randomize_questions: true,
            show_correct_answers: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
    /// Seconds between abandonment sweeps. Zero disables the background task.
    pub abandon_sweep_interval_secs: u64,
    pub exam_defaults: ExamDefaults,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => {
                write!(f, "{} has an invalid value: '{}'", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` beforehand to pick up a local `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;
        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let fallback = ExamDefaults::default();
        let exam_defaults = ExamDefaults {
            duration_minutes: parse_or("DEFAULT_EXAM_DURATION", fallback.duration_minutes)?,
            passing_score: parse_or("DEFAULT_PASSING_SCORE", fallback.passing_score)?,
            max_attempts: parse_or("DEFAULT_MAX_ATTEMPTS", fallback.max_attempts)?,
            randomize_questions: parse_or(
                "DEFAULT_RANDOMIZE_QUESTIONS",
                fallback.randomize_questions,
            )?,
            show_correct_answers: parse_or(
                "DEFAULT_SHOW_CORRECT_ANSWERS",
                fallback.show_correct_answers,
            )?,
        };
        check_range("DEFAULT_EXAM_DURATION", exam_defaults.duration_minutes, 1, 300)?;
        check_range("DEFAULT_PASSING_SCORE", exam_defaults.passing_score, 0, 100)?;
        check_range("DEFAULT_MAX_ATTEMPTS", exam_defaults.max_attempts, 1, 10)?;

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration: parse_or("JWT_EXPIRATION", 86_400)?,
            rust_log,
            admin_username: env::var("ADMIN_USERNAME").ok().filter(|s| !s.is_empty()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            cors_origins,
            abandon_sweep_interval_secs: parse_or("ABANDON_SWEEP_INTERVAL_SECS", 60)?,
            exam_defaults,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

fn check_range(key: &'static str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        });
    }
    Ok(())
}
