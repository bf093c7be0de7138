// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempts, auth, exam, exam_modules, levels, students},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, student_middleware},
};

/// Assembles the main application router.
///
/// * Public auth routes (admin and student login).
/// * Student exam routes (bearer token, student role).
/// * Admin management routes (bearer token, admin role).
/// * Global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/admin/login", post(auth::admin_login))
        .route("/student/login", post(auth::student_login));

    // Layers run bottom-up: authenticate first, then check the role.
    let exam_routes = Router::new()
        .route("/modules", get(exam::list_available_exams))
        .route("/modules/{code}/questions", get(exam::list_exam_questions))
        .route(
            "/attempts",
            get(exam::list_my_attempts).post(exam::start_attempt),
        )
        .route("/attempts/{id}", get(exam::get_attempt))
        .route("/attempts/{id}/answers", put(exam::record_answer))
        .route("/attempts/{id}/submit", post(exam::submit_attempt))
        .route("/attempts/{id}/abandon", post(exam::abandon_attempt))
        .layer(middleware::from_fn(student_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route(
            "/levels",
            get(levels::list_levels).post(levels::create_level),
        )
        .route(
            "/levels/{id}",
            get(levels::get_level)
                .put(levels::update_level)
                .delete(levels::delete_level),
        )
        .route("/levels/{id}/next-student-id", get(levels::next_student_id))
        .route(
            "/students",
            get(students::list_students).post(students::create_student),
        )
        .route(
            "/students/{id}",
            get(students::get_student)
                .put(students::update_student)
                .delete(students::delete_student),
        )
        .route(
            "/exam-modules",
            get(exam_modules::list_exam_modules).post(exam_modules::create_exam_module),
        )
        .route(
            "/exam-modules/{id}",
            get(exam_modules::get_exam_module)
                .put(exam_modules::update_exam_module)
                .delete(exam_modules::delete_exam_module),
        )
        .route(
            "/exam-modules/{id}/questions",
            get(exam_modules::list_questions).post(exam_modules::create_question),
        )
        .route(
            "/questions/{id}",
            put(exam_modules::update_question).delete(exam_modules::delete_question),
        )
        .route("/attempts", get(attempts::list_attempts))
        .route("/attempts/sweep", post(attempts::sweep_expired))
        .route("/attempts/{id}", get(attempts::get_attempt))
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/exam", exam_routes)
        .nest("/api/admin", admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
