// tests/api_tests.rs

use chrono::Utc;
use serde_json::{Value, json};
use smartexam::{
    config::{Config, ExamDefaults},
    db, routes,
    state::AppState,
    utils::hash::hash_password,
};
use sqlx::SqlitePool;

const ADMIN_USERNAME: &str = "admin";
const ADMIN_PASSWORD: &str = "password123";

struct TestApp {
    address: String,
    pool: SqlitePool,
    client: reqwest::Client,
}

/// Spawns the app on a random port, backed by a fresh in-memory database
/// with one administrator.
async fn spawn_app() -> TestApp {
    let database_url = "sqlite::memory:".to_string();

    let pool = db::connect(&database_url)
        .await
        .expect("Failed to open in-memory database");
    db::migrate(&pool).await.expect("Failed to migrate database");

    sqlx::query("INSERT INTO admins (username, password, created_at) VALUES ($1, $2, $3)")
        .bind(ADMIN_USERNAME)
        .bind(hash_password(ADMIN_PASSWORD).unwrap())
        .bind(Utc::now())
        .execute(&pool)
        .await
        .expect("Failed to seed admin");

    let config = Config {
        database_url,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        bind_addr: "127.0.0.1:0".to_string(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        abandon_sweep_interval_secs: 0,
        exam_defaults: ExamDefaults::default(),
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn admin_token(&self) -> String {
        let body: Value = self
            .client
            .post(self.url("/api/auth/admin/login"))
            .json(&json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }))
            .send()
            .await
            .expect("Admin login failed")
            .json()
            .await
            .unwrap();
        body["token"].as_str().expect("Token not found").to_string()
    }

    async fn student_token(&self, student_id: &str) -> String {
        let body: Value = self
            .client
            .post(self.url("/api/auth/student/login"))
            .json(&json!({ "student_id": student_id }))
            .send()
            .await
            .expect("Student login failed")
            .json()
            .await
            .unwrap();
        body["token"].as_str().expect("Token not found").to_string()
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn put(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Creates a level, a student and an active exam with three questions
    /// keyed `A`, `B`, `C`. Returns the student ID and exam code.
    async fn seed_exam(&self, admin: &str) -> (String, String) {
        let level: Value = self
            .post(
                "/api/admin/levels",
                admin,
                json!({ "name": "Grade 10", "code": "G10", "level_type": "secondary" }),
            )
            .await
            .json()
            .await
            .unwrap();

        let student: Value = self
            .post(
                "/api/admin/students",
                admin,
                json!({ "full_name": "Ada Lovelace", "level_id": level["id"] }),
            )
            .await
            .json()
            .await
            .unwrap();

        let module: Value = self
            .post(
                "/api/admin/exam-modules",
                admin,
                json!({
                    "title": "Mathematics",
                    "code": "MATH101",
                    "level_id": level["id"],
                    "max_attempts": 2,
                    "is_active": true
                }),
            )
            .await
            .json()
            .await
            .unwrap();

        for (n, key) in ["A", "B", "C"].iter().enumerate() {
            let response = self
                .post(
                    &format!("/api/admin/exam-modules/{}/questions", module["id"]),
                    admin,
                    json!({
                        "question_text": format!("Question {}", n + 1),
                        "option_a": "one",
                        "option_b": "two",
                        "option_c": "three",
                        "option_d": "four",
                        "correct_answer": key,
                        "position": n
                    }),
                )
                .await;
            assert_eq!(response.status().as_u16(), 201);
        }

        (
            student["student_id"].as_str().unwrap().to_string(),
            module["code"].as_str().unwrap().to_string(),
        )
    }
}

#[tokio::test]
async fn unknown_path_returns_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn admin_login_rejects_wrong_password() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/auth/admin/login"))
        .json(&json!({ "username": ADMIN_USERNAME, "password": "wrong-password" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn admin_routes_require_an_admin_token() {
    let app = spawn_app().await;

    let anonymous = app
        .client
        .get(app.url("/api/admin/levels"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(anonymous.status().as_u16(), 401);

    let admin = app.admin_token().await;
    let (student_id, _) = app.seed_exam(&admin).await;
    let student = app.student_token(&student_id).await;

    let forbidden = app.get("/api/admin/levels", &student).await;
    assert_eq!(forbidden.status().as_u16(), 403);
    let body: Value = forbidden.json().await.unwrap();
    assert_eq!(body["code"], "forbidden");

    let wrong_side = app.get("/api/exam/modules", &admin).await;
    assert_eq!(wrong_side.status().as_u16(), 403);
}

#[tokio::test]
async fn create_level_fails_validation() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let response = app
        .post(
            "/api/admin/levels",
            &admin,
            json!({ "name": "", "level_type": "primary" }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn exam_code_must_be_alphanumeric() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let level: Value = app
        .post(
            "/api/admin/levels",
            &admin,
            json!({ "name": "Year One", "level_type": "tertiary" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(level["code"], "YEA");

    let response = app
        .post(
            "/api/admin/exam-modules",
            &admin,
            json!({ "title": "Bad", "code": "no spaces!", "level_id": level["id"] }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_level_names_conflict() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let payload = json!({ "name": "Grade 10", "level_type": "secondary" });

    let first = app.post("/api/admin/levels", &admin, payload.clone()).await;
    assert_eq!(first.status().as_u16(), 201);

    let second = app.post("/api/admin/levels", &admin, payload).await;
    assert_eq!(second.status().as_u16(), 409);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["code"], "duplicate_constraint");
}

#[tokio::test]
async fn next_student_id_is_previewed_per_level() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (student_id, _) = app.seed_exam(&admin).await;
    assert_eq!(student_id, "G10001");

    let levels: Vec<Value> = app
        .get("/api/admin/levels", &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(levels.len(), 1);
    assert_eq!(levels[0]["student_count"], 1);
    assert_eq!(levels[0]["exam_module_count"], 1);

    let preview: Value = app
        .get(
            &format!("/api/admin/levels/{}/next-student-id", levels[0]["id"]),
            &admin,
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(preview["student_id"], "G10002");
}

#[tokio::test]
async fn inactive_students_cannot_log_in() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (student_id, _) = app.seed_exam(&admin).await;

    sqlx::query("UPDATE students SET is_active = FALSE WHERE student_id = $1")
        .bind(&student_id)
        .execute(&app.pool)
        .await
        .unwrap();

    let response = app
        .client
        .post(app.url("/api/auth/student/login"))
        .json(&json!({ "student_id": student_id }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);

    let unknown = app
        .client
        .post(app.url("/api/auth/student/login"))
        .json(&json!({ "student_id": "NOPE999" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(unknown.status().as_u16(), 401);
}

#[tokio::test]
async fn full_exam_flow() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (student_id, exam_code) = app.seed_exam(&admin).await;
    let student = app.student_token(&student_id).await;

    // 1. The exam is listed for the student's level
    let modules: Vec<Value> = app.get("/api/exam/modules", &student).await.json().await.unwrap();
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0]["code"], exam_code);
    assert_eq!(modules[0]["total_questions"], 3);

    // 2. Questions come without answer keys
    let questions: Vec<Value> = app
        .get(&format!("/api/exam/modules/{}/questions", exam_code), &student)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(questions.len(), 3);
    assert!(questions.iter().all(|q| q.get("correct_answer").is_none()));

    // 3. Start an attempt
    let response = app
        .post("/api/exam/attempts", &student, json!({ "exam_code": exam_code }))
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let attempt: Value = response.json().await.unwrap();
    assert_eq!(attempt["attempt_number"], 1);
    assert_eq!(attempt["status"], "in_progress");
    let attempt_id = attempt["id"].as_i64().unwrap();

    // 4. Answer the first two questions, the second one wrong
    for (question, choice) in questions.iter().take(2).zip(["A", "D"]) {
        let response = app
            .put(
                &format!("/api/exam/attempts/{}/answers", attempt_id),
                &student,
                json!({ "question_id": question["id"], "selected_answer": choice }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        assert!(body.get("is_correct").is_none());
    }

    // 5. Submit
    let result: Value = app
        .post(
            &format!("/api/exam/attempts/{}/submit", attempt_id),
            &student,
            json!({}),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(result["score"], 50.0);
    assert_eq!(result["grade"], "D");
    assert_eq!(result["passed"], false);
    assert_eq!(result["correct_answers"], 1);
    assert_eq!(result["wrong_answers"], 1);
    assert_eq!(result["unanswered"], 1);

    // 6. A second submit is rejected
    let again = app
        .post(
            &format!("/api/exam/attempts/{}/submit", attempt_id),
            &student,
            json!({}),
        )
        .await;
    assert_eq!(again.status().as_u16(), 409);
    let body: Value = again.json().await.unwrap();
    assert_eq!(body["code"], "invalid_state_transition");

    // 7. The completed attempt carries a review
    let view: Value = app
        .get(&format!("/api/exam/attempts/{}", attempt_id), &student)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(view["status"], "completed");
    assert_eq!(view["review"].as_array().unwrap().len(), 3);

    // 8. The administrator sees the same result
    let listed: Vec<Value> = app
        .get(
            &format!("/api/admin/attempts?status=completed&student_id={}", view["student_id"]),
            &admin,
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["grade"], "D");
}

#[tokio::test]
async fn attempt_limit_is_enforced() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (student_id, exam_code) = app.seed_exam(&admin).await;
    let student = app.student_token(&student_id).await;

    for expected in 1..=2 {
        let attempt: Value = app
            .post("/api/exam/attempts", &student, json!({ "exam_code": exam_code }))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(attempt["attempt_number"], expected);

        let response = app
            .post(
                &format!("/api/exam/attempts/{}/abandon", attempt["id"]),
                &student,
                json!({}),
            )
            .await;
        assert_eq!(response.status().as_u16(), 200);
    }

    let response = app
        .post("/api/exam/attempts", &student, json!({ "exam_code": exam_code }))
        .await;
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "attempt_limit_exceeded");
}

#[tokio::test]
async fn students_cannot_touch_other_students_attempts() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (student_id, exam_code) = app.seed_exam(&admin).await;

    let level_id: i64 = sqlx::query_scalar("SELECT level_id FROM students WHERE student_id = $1")
        .bind(&student_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    let other: Value = app
        .post(
            "/api/admin/students",
            &admin,
            json!({ "full_name": "Grace Hopper", "level_id": level_id }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(other["student_id"], "G10002");

    let owner = app.student_token(&student_id).await;
    let intruder = app.student_token(other["student_id"].as_str().unwrap()).await;

    let attempt: Value = app
        .post("/api/exam/attempts", &owner, json!({ "exam_code": exam_code }))
        .await
        .json()
        .await
        .unwrap();

    let response = app
        .post(
            &format!("/api/exam/attempts/{}/submit", attempt["id"]),
            &intruder,
            json!({}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn level_with_students_cannot_be_deleted() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.seed_exam(&admin).await;

    let levels: Vec<Value> = app
        .get("/api/admin/levels", &admin)
        .await
        .json()
        .await
        .unwrap();

    let response = app
        .client
        .delete(app.url(&format!("/api/admin/levels/{}", levels[0]["id"])))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn starting_again_resumes_the_open_attempt() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (student_id, exam_code) = app.seed_exam(&admin).await;
    let student = app.student_token(&student_id).await;

    let first = app
        .post("/api/exam/attempts", &student, json!({ "exam_code": exam_code }))
        .await;
    assert_eq!(first.status().as_u16(), 201);
    let first: Value = first.json().await.unwrap();

    let again = app
        .post("/api/exam/attempts", &student, json!({ "exam_code": exam_code }))
        .await;
    assert_eq!(again.status().as_u16(), 200);
    let again: Value = again.json().await.unwrap();
    assert_eq!(again["id"], first["id"]);
    assert_eq!(again["attempt_number"], 1);
}

#[tokio::test]
async fn student_details_include_exam_statistics() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (student_id, exam_code) = app.seed_exam(&admin).await;
    let student = app.student_token(&student_id).await;

    let attempt: Value = app
        .post("/api/exam/attempts", &student, json!({ "exam_code": exam_code }))
        .await
        .json()
        .await
        .unwrap();
    let questions: Vec<Value> = app
        .get(&format!("/api/exam/modules/{}/questions", exam_code), &student)
        .await
        .json()
        .await
        .unwrap();
    app.put(
        &format!("/api/exam/attempts/{}/answers", attempt["id"]),
        &student,
        json!({ "question_id": questions[0]["id"], "selected_answer": "A" }),
    )
    .await;
    app.post(
        &format!("/api/exam/attempts/{}/submit", attempt["id"]),
        &student,
        json!({}),
    )
    .await;

    let details: Value = app
        .get(&format!("/api/admin/students/{}", attempt["student_id"]), &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(details["student_id"], student_id);
    assert_eq!(details["completed_exams_count"], 1);
    assert_eq!(details["average_score"], 100.0);

    let listed: Vec<Value> = app
        .get("/api/admin/students", &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed[0]["completed_exams_count"], 1);
}
