// src/handlers/auth.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::admin::{Admin, AdminLoginRequest, StudentLoginRequest},
    services::registry,
    utils::{
        hash::verify_password,
        jwt::{ROLE_ADMIN, ROLE_STUDENT, sign_jwt},
    },
};

/// Authenticates an administrator and returns a JWT token.
pub async fn admin_login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let admin = sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE username = $1")
        .bind(&payload.username)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Login DB error: {:?}", e);
            AppError::from(e)
        })?
        .ok_or_else(|| AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &admin.password)? {
        return Err(AppError::AuthError(
            "Invalid username or password".to_string(),
        ));
    }

    let token = sign_jwt(admin.id, ROLE_ADMIN, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "role": ROLE_ADMIN,
    })))
}

/// Authenticates a student by student ID.
/// Unknown and inactive students are rejected alike.
pub async fn student_login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<StudentLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let student = match registry::find_student_by_code(&pool, &payload.student_id).await {
        Ok(student) if student.is_active => student,
        Ok(_) | Err(AppError::NotFound(_)) => {
            return Err(AppError::AuthError("Invalid student ID".to_string()));
        }
        Err(e) => return Err(e),
    };

    let token = sign_jwt(
        student.id,
        ROLE_STUDENT,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "role": ROLE_STUDENT,
        "student_id": student.student_id,
        "full_name": student.full_name,
    })))
}
