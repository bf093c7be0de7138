// src/handlers/exam_modules.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::AppError,
    models::{
        exam_module::{CreateExamModuleRequest, ExamModuleListParams, UpdateExamModuleRequest},
        question::{CreateQuestionRequest, UpdateQuestionRequest},
    },
    services::catalog,
};

pub async fn list_exam_modules(
    State(pool): State<SqlitePool>,
    Query(params): Query<ExamModuleListParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        catalog::list_exam_modules(&pool, params.level_id, false).await?,
    ))
}

pub async fn get_exam_module(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(catalog::get_exam_module(&pool, id).await?))
}

/// Creates an exam module. Missing settings take the configured defaults.
pub async fn create_exam_module(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<CreateExamModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let module = catalog::create_exam_module(&pool, &config.exam_defaults, payload).await?;
    Ok((StatusCode::CREATED, Json(module)))
}

pub async fn update_exam_module(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(catalog::update_exam_module(&pool, id, payload).await?))
}

pub async fn delete_exam_module(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    catalog::delete_exam_module(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lists every question of an exam, answer keys included.
pub async fn list_questions(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(catalog::list_questions(&pool, id).await?))
}

pub async fn create_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let question = catalog::create_question(&pool, id, payload).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn update_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(catalog::update_question(&pool, id, payload).await?))
}

pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    catalog::delete_question(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
