//! Exam module catalog: exam configuration and the question bank.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use validator::Validate;

use crate::{
    config::ExamDefaults,
    error::{AppError, is_unique_violation},
    models::{
        exam_module::{
            CreateExamModuleRequest, ExamModule, ExamModuleSummary, UpdateExamModuleRequest,
        },
        question::{CreateQuestionRequest, PublicQuestion, Question, UpdateQuestionRequest},
    },
    utils::html::{clean_html, clean_optional},
};

const MODULE_SUMMARY_SELECT: &str = r#"
    SELECT
        m.*,
        (SELECT COUNT(*) FROM questions q
            WHERE q.exam_module_id = m.id AND q.is_active) AS total_questions,
        (SELECT COALESCE(SUM(q.marks), 0) FROM questions q
            WHERE q.exam_module_id = m.id AND q.is_active) AS total_marks,
        (SELECT COUNT(*) FROM exam_attempts a WHERE a.exam_module_id = m.id) AS attempts_count
    FROM exam_modules m
"#;

/// Lists exam modules, optionally restricted to one level and/or active ones.
pub async fn list_exam_modules(
    pool: &SqlitePool,
    level_id: Option<i64>,
    active_only: bool,
) -> Result<Vec<ExamModuleSummary>, AppError> {
    let modules = sqlx::query_as::<_, ExamModuleSummary>(&format!(
        "{} WHERE ($1 IS NULL OR m.level_id = $1) AND ($2 = 0 OR m.is_active) ORDER BY m.created_at DESC, m.id DESC",
        MODULE_SUMMARY_SELECT
    ))
    .bind(level_id)
    .bind(active_only)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list exam modules: {:?}", e);
        AppError::from(e)
    })?;

    Ok(modules)
}

pub async fn get_exam_module(pool: &SqlitePool, id: i64) -> Result<ExamModuleSummary, AppError> {
    sqlx::query_as::<_, ExamModuleSummary>(&format!("{} WHERE m.id = $1", MODULE_SUMMARY_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Exam module {} not found", id)))
}

/// Looks an exam module up by its (case-insensitive) code.
pub async fn find_exam_module_by_code(
    conn: &mut SqliteConnection,
    code: &str,
) -> Result<ExamModule, AppError> {
    sqlx::query_as::<_, ExamModule>("SELECT * FROM exam_modules WHERE code = $1")
        .bind(code.trim().to_uppercase())
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Exam '{}' not found", code)))
}

pub async fn find_exam_module(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<ExamModule, AppError> {
    sqlx::query_as::<_, ExamModule>("SELECT * FROM exam_modules WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Exam module {} not found", id)))
}

/// Number of active questions, i.e. the size of the exam.
pub async fn count_active_questions(
    conn: &mut SqliteConnection,
    exam_module_id: i64,
) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM questions WHERE exam_module_id = $1 AND is_active",
    )
    .bind(exam_module_id)
    .fetch_one(conn)
    .await?;

    Ok(count)
}

async fn ensure_level_exists(pool: &SqlitePool, level_id: i64) -> Result<(), AppError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM levels WHERE id = $1")
        .bind(level_id)
        .fetch_optional(pool)
        .await?;

    exists
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Level {} not found", level_id)))
}

fn module_conflict(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict(
            "Exam code already exists, or the title is already used for this level".to_string(),
        )
    } else {
        tracing::error!("Failed to write exam module: {:?}", e);
        AppError::from(e)
    }
}

/// Creates an exam module; unset settings come from the configured defaults.
pub async fn create_exam_module(
    pool: &SqlitePool,
    defaults: &ExamDefaults,
    req: CreateExamModuleRequest,
) -> Result<ExamModuleSummary, AppError> {
    req.validate()?;
    ensure_level_exists(pool, req.level_id).await?;

    let now = Utc::now();
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO exam_modules
        (title, description, code, level_id, duration_minutes, passing_score, max_attempts,
         randomize_questions, show_correct_answers, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
        RETURNING id
        "#,
    )
    .bind(req.title.trim())
    .bind(clean_optional(req.description.as_deref()))
    .bind(req.code.trim().to_uppercase())
    .bind(req.level_id)
    .bind(req.duration_minutes.unwrap_or(defaults.duration_minutes))
    .bind(req.passing_score.unwrap_or(defaults.passing_score))
    .bind(req.max_attempts.unwrap_or(defaults.max_attempts))
    .bind(req.randomize_questions.unwrap_or(defaults.randomize_questions))
    .bind(req.show_correct_answers.unwrap_or(defaults.show_correct_answers))
    .bind(req.is_active.unwrap_or(false))
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(module_conflict)?;

    tracing::info!(exam_module_id = id, code = %req.code, "Exam module created");
    get_exam_module(pool, id).await
}

pub async fn update_exam_module(
    pool: &SqlitePool,
    id: i64,
    req: UpdateExamModuleRequest,
) -> Result<ExamModuleSummary, AppError> {
    req.validate()?;
    get_exam_module(pool, id).await?;
    if let Some(level_id) = req.level_id {
        ensure_level_exists(pool, level_id).await?;
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE exam_modules SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = req.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title.trim().to_string());
    }
    if let Some(description) = req.description {
        separated.push("description = ");
        separated.push_bind_unseparated(clean_optional(Some(description.as_str())));
    }
    if let Some(code) = req.code {
        separated.push("code = ");
        separated.push_bind_unseparated(code.trim().to_uppercase());
    }
    if let Some(level_id) = req.level_id {
        separated.push("level_id = ");
        separated.push_bind_unseparated(level_id);
    }
    if let Some(duration) = req.duration_minutes {
        separated.push("duration_minutes = ");
        separated.push_bind_unseparated(duration);
    }
    if let Some(passing_score) = req.passing_score {
        separated.push("passing_score = ");
        separated.push_bind_unseparated(passing_score);
    }
    if let Some(max_attempts) = req.max_attempts {
        separated.push("max_attempts = ");
        separated.push_bind_unseparated(max_attempts);
    }
    if let Some(randomize) = req.randomize_questions {
        separated.push("randomize_questions = ");
        separated.push_bind_unseparated(randomize);
    }
    if let Some(show) = req.show_correct_answers {
        separated.push("show_correct_answers = ");
        separated.push_bind_unseparated(show);
    }
    if let Some(is_active) = req.is_active {
        separated.push("is_active = ");
        separated.push_bind_unseparated(is_active);
    }
    separated.push("updated_at = ");
    separated.push_bind_unseparated(Utc::now());

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder
        .build()
        .execute(pool)
        .await
        .map_err(module_conflict)?;

    get_exam_module(pool, id).await
}

/// Deletes an exam module and its questions. Modules with attempts are protected.
pub async fn delete_exam_module(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
    let summary = get_exam_module(pool, id).await?;
    if summary.attempts_count > 0 {
        return Err(AppError::Conflict(format!(
            "Exam '{}' already has {} attempt(s)",
            summary.module.code, summary.attempts_count
        )));
    }

    sqlx::query("DELETE FROM exam_modules WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    tracing::info!(exam_module_id = id, "Exam module deleted");
    Ok(())
}

/// Full questions including answer keys, for administrators.
pub async fn list_questions(
    pool: &SqlitePool,
    exam_module_id: i64,
) -> Result<Vec<Question>, AppError> {
    get_exam_module(pool, exam_module_id).await?;

    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE exam_module_id = $1 ORDER BY position, id",
    )
    .bind(exam_module_id)
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

/// Active questions without answer keys, for students sitting the exam.
pub async fn list_public_questions(
    pool: &SqlitePool,
    exam_module_id: i64,
) -> Result<Vec<PublicQuestion>, AppError> {
    let questions = sqlx::query_as::<_, PublicQuestion>(
        r#"
        SELECT id, question_text, option_a, option_b, option_c, option_d, marks, position
        FROM questions
        WHERE exam_module_id = $1 AND is_active
        ORDER BY position, id
        "#,
    )
    .bind(exam_module_id)
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

pub async fn get_question(conn: &mut SqliteConnection, id: i64) -> Result<Question, AppError> {
    sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Question {} not found", id)))
}

pub async fn create_question(
    pool: &SqlitePool,
    exam_module_id: i64,
    req: CreateQuestionRequest,
) -> Result<Question, AppError> {
    req.validate()?;
    get_exam_module(pool, exam_module_id).await?;

    let now = Utc::now();
    let question = sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions
        (exam_module_id, question_text, option_a, option_b, option_c, option_d, correct_answer,
         difficulty, category, marks, explanation, position, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
        RETURNING *
        "#,
    )
    .bind(exam_module_id)
    .bind(clean_html(&req.question_text))
    .bind(clean_html(&req.option_a))
    .bind(clean_html(&req.option_b))
    .bind(clean_html(&req.option_c))
    .bind(clean_html(&req.option_d))
    .bind(req.correct_answer)
    .bind(req.difficulty.unwrap_or_default())
    .bind(clean_optional(req.category.as_deref()))
    .bind(req.marks.unwrap_or(1))
    .bind(clean_optional(req.explanation.as_deref()))
    .bind(req.position.unwrap_or(0))
    .bind(req.is_active.unwrap_or(true))
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::from(e)
    })?;

    Ok(question)
}

/// Updates a question. Answers recorded earlier keep their correctness.
pub async fn update_question(
    pool: &SqlitePool,
    id: i64,
    req: UpdateQuestionRequest,
) -> Result<Question, AppError> {
    req.validate()?;

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");

    let text_fields = [
        ("question_text = ", req.question_text),
        ("option_a = ", req.option_a),
        ("option_b = ", req.option_b),
        ("option_c = ", req.option_c),
        ("option_d = ", req.option_d),
    ];
    for (column, value) in text_fields {
        if let Some(value) = value {
            separated.push(column);
            separated.push_bind_unseparated(clean_html(&value));
        }
    }
    if let Some(correct_answer) = req.correct_answer {
        separated.push("correct_answer = ");
        separated.push_bind_unseparated(correct_answer);
    }
    if let Some(difficulty) = req.difficulty {
        separated.push("difficulty = ");
        separated.push_bind_unseparated(difficulty);
    }
    if let Some(category) = req.category {
        separated.push("category = ");
        separated.push_bind_unseparated(clean_optional(Some(category.as_str())));
    }
    if let Some(marks) = req.marks {
        separated.push("marks = ");
        separated.push_bind_unseparated(marks);
    }
    if let Some(explanation) = req.explanation {
        separated.push("explanation = ");
        separated.push_bind_unseparated(clean_optional(Some(explanation.as_str())));
    }
    if let Some(position) = req.position {
        separated.push("position = ");
        separated.push_bind_unseparated(position);
    }
    if let Some(is_active) = req.is_active {
        separated.push("is_active = ");
        separated.push_bind_unseparated(is_active);
    }
    separated.push("updated_at = ");
    separated.push_bind_unseparated(Utc::now());

    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");

    builder
        .build_query_as::<Question>()
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Question {} not found", id)))
}

pub async fn delete_question(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Question {} not found", id)));
    }
    Ok(())
}
