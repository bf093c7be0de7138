// src/handlers/exam.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        exam_attempt::{AttemptListParams, StartAttemptRequest},
        student::Student,
        student_answer::RecordAnswerRequest,
    },
    services::{answers, attempts, catalog, registry},
    utils::jwt::Claims,
};

async fn current_student(pool: &SqlitePool, claims: &Claims) -> Result<Student, AppError> {
    let student = registry::get_student(pool, claims.subject_id()?).await?;
    if !student.is_active {
        return Err(AppError::Forbidden("Student account is inactive".to_string()));
    }
    Ok(student)
}

/// Loads an attempt and checks it belongs to the caller.
/// Other students' attempts are reported as missing.
async fn owned_attempt(
    pool: &SqlitePool,
    claims: &Claims,
    attempt_id: i64,
) -> Result<Student, AppError> {
    let student = current_student(pool, claims).await?;
    let owner: Option<i64> = sqlx::query_scalar("SELECT student_id FROM exam_attempts WHERE id = $1")
        .bind(attempt_id)
        .fetch_optional(pool)
        .await?;

    match owner {
        Some(owner) if owner == student.id => Ok(student),
        _ => Err(AppError::NotFound(format!("Attempt {} not found", attempt_id))),
    }
}

/// Active exams offered for the student's level.
pub async fn list_available_exams(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student = current_student(&pool, &claims).await?;
    let modules = catalog::list_exam_modules(&pool, Some(student.level_id), true).await?;
    Ok(Json(modules))
}

/// Questions of an exam without answer keys.
pub async fn list_exam_questions(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let student = current_student(&pool, &claims).await?;
    let mut conn = pool.acquire().await?;
    let module = catalog::find_exam_module_by_code(&mut conn, &code).await?;
    drop(conn);

    if !module.is_active || module.level_id != student.level_id {
        return Err(AppError::NotFound(format!("Exam '{}' not found", code)));
    }

    Ok(Json(catalog::list_public_questions(&pool, module.id).await?))
}

/// Starts a new attempt, or resumes the one in progress.
pub async fn start_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let student = current_student(&pool, &claims).await?;

    let (attempt, created) =
        attempts::start_attempt(&pool, &student.student_id, &payload.exam_code).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(attempt)))
}

/// The caller's own attempt history, newest first.
pub async fn list_my_attempts(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student = current_student(&pool, &claims).await?;
    let params = AttemptListParams {
        student_id: Some(student.id),
        ..Default::default()
    };
    Ok(Json(attempts::list_attempts(&pool, &params).await?))
}

pub async fn get_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_attempt(&pool, &claims, id).await?;
    Ok(Json(attempts::get_attempt(&pool, id).await?))
}

pub async fn record_answer(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<RecordAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    owned_attempt(&pool, &claims, id).await?;

    let answer =
        answers::record_answer(&pool, id, payload.question_id, payload.selected_answer).await?;

    // The correctness flag stays server-side until the attempt is reviewed.
    Ok(Json(json!({
        "attempt_id": answer.attempt_id,
        "question_id": answer.question_id,
        "selected_answer": answer.selected_answer,
        "answered_at": answer.answered_at,
    })))
}

pub async fn submit_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_attempt(&pool, &claims, id).await?;
    Ok(Json(attempts::submit_attempt(&pool, id).await?))
}

pub async fn abandon_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_attempt(&pool, &claims, id).await?;
    Ok(Json(attempts::abandon_attempt(&pool, id).await?))
}
