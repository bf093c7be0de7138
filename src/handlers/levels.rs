// src/handlers/levels.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::level::{CreateLevelRequest, UpdateLevelRequest},
    services::registry,
};

/// Lists all levels with their student and exam counts.
pub async fn list_levels(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(registry::list_levels(&pool).await?))
}

pub async fn get_level(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(registry::get_level(&pool, id).await?))
}

/// Creates a level. The code defaults to the first three letters of the name.
pub async fn create_level(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateLevelRequest>,
) -> Result<impl IntoResponse, AppError> {
    let level = registry::create_level(&pool, payload).await?;
    Ok((StatusCode::CREATED, Json(level)))
}

pub async fn update_level(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateLevelRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(registry::update_level(&pool, id, payload).await?))
}

/// Deletes a level. Refused while students or exams still belong to it.
pub async fn delete_level(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    registry::delete_level(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Previews the student ID the next registration in this level would get.
pub async fn next_student_id(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = registry::preview_student_id(&pool, id).await?;
    Ok(Json(json!({ "student_id": student_id })))
}
