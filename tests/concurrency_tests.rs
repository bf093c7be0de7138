// tests/concurrency_tests.rs
//
// Runs against a file-backed database so the pool hands out several
// connections and writes really race.

use serde_json::json;
use smartexam::{
    config::ExamDefaults,
    db,
    error::AppError,
    models::{exam_attempt::AttemptStatus, question::Answer},
    services::{answers, attempts, catalog, registry},
};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Opens a fresh database file. Keep the `TempDir` alive for the test.
async fn file_pool() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("exam.db").display());

    let pool = db::connect(&url).await.expect("Failed to open database file");
    db::migrate(&pool).await.expect("Failed to migrate database");
    (pool, dir)
}

async fn create_level(pool: &SqlitePool) -> i64 {
    registry::create_level(
        pool,
        serde_json::from_value(json!({
            "name": "Grade 10",
            "code": "G10",
            "level_type": "secondary"
        }))
        .unwrap(),
    )
    .await
    .unwrap()
    .id
}

async fn register(pool: &SqlitePool, level_id: i64, name: &str) -> String {
    registry::register_student(
        pool,
        serde_json::from_value(json!({ "full_name": name, "level_id": level_id })).unwrap(),
    )
    .await
    .unwrap()
    .student_id
}

/// An active exam with five questions keyed `B`. Returns the exam code and question ids.
async fn create_exam(pool: &SqlitePool, level_id: i64) -> (String, Vec<i64>) {
    let module = catalog::create_exam_module(
        pool,
        &ExamDefaults::default(),
        serde_json::from_value(json!({
            "title": "Mathematics",
            "code": "MATH101",
            "level_id": level_id,
            "max_attempts": 10,
            "is_active": true
        }))
        .unwrap(),
    )
    .await
    .unwrap();

    let mut question_ids = Vec::new();
    for n in 1..=5 {
        let question = catalog::create_question(
            pool,
            module.module.id,
            serde_json::from_value(json!({
                "question_text": format!("Question {}", n),
                "option_a": "one",
                "option_b": "two",
                "option_c": "three",
                "option_d": "four",
                "correct_answer": "B",
                "position": n
            }))
            .unwrap(),
        )
        .await
        .unwrap();
        question_ids.push(question.id);
    }

    (module.module.code, question_ids)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_get_distinct_contiguous_ids() {
    let (pool, _dir) = file_pool().await;
    let level_id = create_level(&pool).await;

    let handles: Vec<_> = (0..20)
        .map(|n| {
            let pool = pool.clone();
            tokio::spawn(async move {
                registry::register_student(
                    &pool,
                    serde_json::from_value(
                        json!({ "full_name": format!("Student {}", n), "level_id": level_id }),
                    )
                    .unwrap(),
                )
                .await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let student = handle.await.unwrap().expect("registration failed");
        ids.push(student.student_id);
    }
    ids.sort();

    let expected: Vec<String> = (1..=20).map(|n| format!("G10{:03}", n)).collect();
    assert_eq!(ids, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn submit_racing_answers_stays_consistent() {
    let (pool, _dir) = file_pool().await;
    let level_id = create_level(&pool).await;
    let (exam_code, question_ids) = create_exam(&pool, level_id).await;

    for n in 0..10 {
        let student_code = register(&pool, level_id, &format!("Student {}", n)).await;
        let (attempt, _) = attempts::start_attempt(&pool, &student_code, &exam_code)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for (i, question_id) in question_ids.iter().copied().enumerate() {
            let pool = pool.clone();
            let choice = if i % 2 == 0 { Answer::B } else { Answer::C };
            handles.push(tokio::spawn(async move {
                answers::record_answer(&pool, attempt.id, question_id, Some(choice))
                    .await
                    .map(|_| ())
            }));
        }
        let submit_pool = pool.clone();
        handles.push(tokio::spawn(async move {
            attempts::submit_attempt(&submit_pool, attempt.id)
                .await
                .map(|_| ())
        }));

        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) | Err(AppError::InvalidStateTransition(_)) => {}
                Err(other) => panic!("unexpected failure: {:?}", other),
            }
        }

        let view = attempts::get_attempt(&pool, attempt.id).await.unwrap();
        let completed = view.attempt;
        assert_eq!(completed.status, AttemptStatus::Completed);
        assert_eq!(
            completed.correct_answers + completed.wrong_answers,
            completed.total_questions
        );
        assert_eq!(completed.total_questions + completed.unanswered, 5);

        // Nothing lands after the attempt closed.
        let stored: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM student_answers WHERE attempt_id = $1")
                .bind(attempt.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(stored, completed.total_questions);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_starts_create_a_single_attempt() {
    let (pool, _dir) = file_pool().await;
    let level_id = create_level(&pool).await;
    let (exam_code, _) = create_exam(&pool, level_id).await;
    let student_code = register(&pool, level_id, "Ada Lovelace").await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            let student_code = student_code.clone();
            let exam_code = exam_code.clone();
            tokio::spawn(async move {
                attempts::start_attempt(&pool, &student_code, &exam_code).await
            })
        })
        .collect();

    let mut created = 0;
    let mut attempt_ids = Vec::new();
    for handle in handles {
        let (attempt, was_created) = handle.await.unwrap().expect("start failed");
        if was_created {
            created += 1;
        }
        attempt_ids.push(attempt.id);
    }

    assert_eq!(created, 1);
    attempt_ids.dedup();
    assert_eq!(attempt_ids.len(), 1);
}
