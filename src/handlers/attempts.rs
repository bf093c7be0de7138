// src/handlers/attempts.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::exam_attempt::AttemptListParams,
    services::{attempts, sweeper},
};

/// Result listing for administrators.
pub async fn list_attempts(
    State(pool): State<SqlitePool>,
    Query(params): Query<AttemptListParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(attempts::list_attempts(&pool, &params).await?))
}

pub async fn get_attempt(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(attempts::get_attempt(&pool, id).await?))
}

/// Runs the abandonment sweep immediately.
pub async fn sweep_expired(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let swept = sweeper::abandon_expired(&pool, Utc::now()).await?;
    Ok(Json(json!({ "abandoned": swept })))
}
