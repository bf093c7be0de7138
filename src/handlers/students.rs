// src/handlers/students.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::student::{CreateStudentRequest, StudentListParams, UpdateStudentRequest},
    services::registry,
};

pub async fn list_students(
    State(pool): State<SqlitePool>,
    Query(params): Query<StudentListParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(registry::list_students(&pool, params.level_id).await?))
}

pub async fn get_student(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(registry::get_student_summary(&pool, id).await?))
}

/// Registers a student. Without an explicit `student_id` one is derived
/// from the level code, e.g. `G10004`.
pub async fn create_student(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let student = registry::register_student(&pool, payload).await?;
    let summary = registry::get_student_summary(&pool, student.id).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn update_student(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    registry::update_student(&pool, id, payload).await?;
    Ok(Json(registry::get_student_summary(&pool, id).await?))
}

/// Deletes a student along with their attempts.
pub async fn delete_student(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    registry::delete_student(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
