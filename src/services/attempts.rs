//! Attempt engine: the in_progress -> completed/abandoned lifecycle of an exam
//! attempt and its scoring.

use chrono::{Duration, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    db::BEGIN_WRITE,
    error::{AppError, is_unique_violation},
    models::{
        exam_attempt::{
            AnswerReview, AttemptListParams, AttemptResult, AttemptRow, AttemptStatus,
            AttemptView, ExamAttempt,
        },
        student::Student,
    },
    services::catalog::{count_active_questions, find_exam_module, find_exam_module_by_code},
};

/// Lower bounds (inclusive) of each letter grade, best first.
const GRADE_BANDS: [(f64, &str); 5] = [
    (90.0, "A+"),
    (80.0, "A"),
    (70.0, "B"),
    (60.0, "C"),
    (50.0, "D"),
];

/// Maps a score percentage to its letter grade. Unscored attempts are "N/A".
pub fn grade_of(score: Option<f64>) -> &'static str {
    let Some(score) = score else {
        return "N/A";
    };
    GRADE_BANDS
        .iter()
        .find(|(lower, _)| score >= *lower)
        .map(|(_, grade)| *grade)
        .unwrap_or("F")
}

/// Aggregates computed when an attempt is submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    pub answered: i64,
    pub correct: i64,
    pub wrong: i64,
    pub unanswered: i64,
    pub score: Option<f64>,
    pub passed: bool,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Scores an attempt from its answer counts.
///
/// The score is the share of correct answers among answered questions,
/// rounded to two decimals. With no answers the score stays unset and the
/// attempt does not pass.
pub fn tally(answered: i64, correct: i64, module_total: i64, passing_score: i64) -> Tally {
    let score = (answered > 0).then(|| round2(correct as f64 * 100.0 / answered as f64));
    let passed = score.is_some_and(|s| s >= passing_score as f64);

    Tally {
        answered,
        correct,
        wrong: answered - correct,
        unanswered: (module_total - answered).max(0),
        score,
        passed,
    }
}

pub(crate) fn ensure_in_progress(attempt: &ExamAttempt) -> Result<(), AppError> {
    if attempt.status != AttemptStatus::InProgress {
        return Err(AppError::InvalidStateTransition(format!(
            "Attempt {} is already {}",
            attempt.id,
            attempt.status.as_str()
        )));
    }
    Ok(())
}

pub(crate) async fn fetch_attempt(
    conn: &mut SqliteConnection,
    attempt_id: i64,
) -> Result<ExamAttempt, AppError> {
    sqlx::query_as::<_, ExamAttempt>("SELECT * FROM exam_attempts WHERE id = $1")
        .bind(attempt_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Attempt {} not found", attempt_id)))
}

/// Starts (or resumes) a student's attempt at an exam.
///
/// An attempt still in progress for the same exam is returned unchanged.
/// Otherwise a new attempt is numbered after the existing ones, as long as
/// the exam's attempt limit allows it. The flag is `true` when a new attempt
/// was created.
pub async fn start_attempt(
    pool: &SqlitePool,
    student_code: &str,
    exam_code: &str,
) -> Result<(ExamAttempt, bool), AppError> {
    let mut tx = pool.begin_with(BEGIN_WRITE).await?;

    let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE student_id = $1")
        .bind(student_code.trim())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Student '{}' not found", student_code)))?;
    let module = find_exam_module_by_code(&mut tx, exam_code).await?;

    if !student.is_active {
        return Err(AppError::BadRequest(format!(
            "Student '{}' is not active",
            student.student_id
        )));
    }
    if !module.is_active {
        return Err(AppError::BadRequest(format!(
            "Exam '{}' is not available",
            module.code
        )));
    }
    if module.level_id != student.level_id {
        return Err(AppError::BadRequest(format!(
            "Exam '{}' is not offered for the student's level",
            module.code
        )));
    }

    let open = sqlx::query_as::<_, ExamAttempt>(
        r#"
        SELECT * FROM exam_attempts
        WHERE student_id = $1 AND exam_module_id = $2 AND status = $3
        "#,
    )
    .bind(student.id)
    .bind(module.id)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(&mut *tx)
    .await?;
    if let Some(attempt) = open {
        tracing::debug!(attempt_id = attempt.id, "Resuming attempt in progress");
        return Ok((attempt, false));
    }

    let prior: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM exam_attempts WHERE student_id = $1 AND exam_module_id = $2",
    )
    .bind(student.id)
    .bind(module.id)
    .fetch_one(&mut *tx)
    .await?;

    if prior >= module.max_attempts {
        return Err(AppError::AttemptLimitExceeded(format!(
            "Maximum attempts ({}) reached for exam '{}'",
            module.max_attempts, module.code
        )));
    }

    let total_questions = count_active_questions(&mut tx, module.id).await?;

    let attempt = sqlx::query_as::<_, ExamAttempt>(
        r#"
        INSERT INTO exam_attempts
        (student_id, exam_module_id, attempt_number, status, start_time, total_questions, unanswered)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING *
        "#,
    )
    .bind(student.id)
    .bind(module.id)
    .bind(prior + 1)
    .bind(AttemptStatus::InProgress)
    .bind(Utc::now())
    .bind(total_questions)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Another attempt was started at the same time".to_string())
        } else {
            tracing::error!("Failed to create attempt: {:?}", e);
            AppError::from(e)
        }
    })?;

    tx.commit().await?;

    tracing::info!(
        attempt_id = attempt.id,
        student = %student.student_id,
        exam = %module.code,
        attempt_number = attempt.attempt_number,
        "Attempt started"
    );
    Ok((attempt, true))
}

/// Scores an attempt and marks it completed. Only valid once, while in progress.
pub async fn submit_attempt(pool: &SqlitePool, attempt_id: i64) -> Result<AttemptResult, AppError> {
    let mut tx = pool.begin_with(BEGIN_WRITE).await?;

    let attempt = fetch_attempt(&mut tx, attempt_id).await?;
    ensure_in_progress(&attempt)?;
    let module = find_exam_module(&mut tx, attempt.exam_module_id).await?;

    let (answered, correct): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COALESCE(SUM(CASE WHEN is_correct THEN 1 ELSE 0 END), 0)
        FROM student_answers
        WHERE attempt_id = $1
        "#,
    )
    .bind(attempt_id)
    .fetch_one(&mut *tx)
    .await?;
    let module_total = count_active_questions(&mut tx, module.id).await?;

    let tally = tally(answered, correct, module_total, module.passing_score);
    let end_time = Utc::now();
    let time_taken = (end_time - attempt.start_time).num_seconds().max(0);

    // The status guard makes a concurrent second submit a no-op.
    let completed = sqlx::query_as::<_, ExamAttempt>(
        r#"
        UPDATE exam_attempts
        SET status = $1, end_time = $2, time_taken_seconds = $3, score = $4,
            total_questions = $5, correct_answers = $6, wrong_answers = $7,
            unanswered = $8, passed = $9
        WHERE id = $10 AND status = $11
        RETURNING *
        "#,
    )
    .bind(AttemptStatus::Completed)
    .bind(end_time)
    .bind(time_taken)
    .bind(tally.score)
    .bind(tally.answered)
    .bind(tally.correct)
    .bind(tally.wrong)
    .bind(tally.unanswered)
    .bind(tally.passed)
    .bind(attempt_id)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| {
        AppError::InvalidStateTransition(format!("Attempt {} was already closed", attempt_id))
    })?;

    tx.commit().await?;

    tracing::info!(
        attempt_id,
        score = ?completed.score,
        passed = completed.passed,
        "Attempt submitted"
    );
    Ok(result_of(&completed))
}

/// Abandons an attempt on request of the student or an administrator.
pub async fn abandon_attempt(pool: &SqlitePool, attempt_id: i64) -> Result<ExamAttempt, AppError> {
    let mut tx = pool.begin_with(BEGIN_WRITE).await?;

    let attempt = fetch_attempt(&mut tx, attempt_id).await?;
    ensure_in_progress(&attempt)?;

    let end_time = Utc::now();
    let time_taken = (end_time - attempt.start_time).num_seconds().max(0);

    let abandoned = sqlx::query_as::<_, ExamAttempt>(
        r#"
        UPDATE exam_attempts
        SET status = $1, end_time = $2, time_taken_seconds = $3
        WHERE id = $4 AND status = $5
        RETURNING *
        "#,
    )
    .bind(AttemptStatus::Abandoned)
    .bind(end_time)
    .bind(time_taken)
    .bind(attempt_id)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| {
        AppError::InvalidStateTransition(format!("Attempt {} was already closed", attempt_id))
    })?;

    tx.commit().await?;

    tracing::info!(attempt_id, "Attempt abandoned");
    Ok(abandoned)
}

pub fn result_of(attempt: &ExamAttempt) -> AttemptResult {
    AttemptResult {
        attempt_id: attempt.id,
        score: attempt.score,
        grade: grade_of(attempt.score),
        passed: attempt.passed,
        total_questions: attempt.total_questions,
        correct_answers: attempt.correct_answers,
        wrong_answers: attempt.wrong_answers,
        unanswered: attempt.unanswered,
        time_taken_seconds: attempt.time_taken_seconds,
    }
}

const ATTEMPT_ROW_SELECT: &str = r#"
    SELECT
        a.*,
        m.code AS exam_code,
        m.title AS exam_title,
        m.duration_minutes,
        m.show_correct_answers,
        s.student_id AS student_code,
        s.full_name AS student_name
    FROM exam_attempts a
    JOIN exam_modules m ON m.id = a.exam_module_id
    JOIN students s ON s.id = a.student_id
"#;

fn view_of(row: AttemptRow, review: Option<Vec<AnswerReview>>) -> AttemptView {
    let deadline = row.attempt.start_time + Duration::minutes(row.duration_minutes);
    AttemptView {
        grade: grade_of(row.attempt.score),
        attempt: row.attempt,
        exam_code: row.exam_code,
        exam_title: row.exam_title,
        student_code: row.student_code,
        student_name: row.student_name,
        deadline,
        review,
    }
}

/// Reads an attempt with its exam and student details.
///
/// Completed attempts of exams that show correct answers also carry a
/// per-question review, unanswered questions included.
pub async fn get_attempt(pool: &SqlitePool, attempt_id: i64) -> Result<AttemptView, AppError> {
    let row = sqlx::query_as::<_, AttemptRow>(&format!("{} WHERE a.id = $1", ATTEMPT_ROW_SELECT))
        .bind(attempt_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Attempt {} not found", attempt_id)))?;

    let review = if row.attempt.status == AttemptStatus::Completed && row.show_correct_answers {
        let items = sqlx::query_as::<_, AnswerReview>(
            r#"
            SELECT
                q.id AS question_id,
                q.question_text,
                sa.selected_answer,
                q.correct_answer,
                COALESCE(sa.is_correct, FALSE) AS is_correct,
                q.explanation
            FROM questions q
            LEFT JOIN student_answers sa ON sa.question_id = q.id AND sa.attempt_id = $1
            WHERE q.exam_module_id = $2 AND (q.is_active OR sa.id IS NOT NULL)
            ORDER BY q.position, q.id
            "#,
        )
        .bind(attempt_id)
        .bind(row.attempt.exam_module_id)
        .fetch_all(pool)
        .await?;
        Some(items)
    } else {
        None
    };

    Ok(view_of(row, review))
}

/// Lists attempts, newest first, filtered by student, exam and/or status.
pub async fn list_attempts(
    pool: &SqlitePool,
    params: &AttemptListParams,
) -> Result<Vec<AttemptView>, AppError> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(ATTEMPT_ROW_SELECT);
    builder.push(" WHERE 1 = 1");

    if let Some(student_id) = params.student_id {
        builder.push(" AND a.student_id = ");
        builder.push_bind(student_id);
    }
    if let Some(exam_module_id) = params.exam_module_id {
        builder.push(" AND a.exam_module_id = ");
        builder.push_bind(exam_module_id);
    }
    if let Some(status) = params.status {
        builder.push(" AND a.status = ");
        builder.push_bind(status);
    }
    builder.push(" ORDER BY a.start_time DESC, a.id DESC");

    let rows = builder
        .build_query_as::<AttemptRow>()
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list attempts: {:?}", e);
            AppError::from(e)
        })?;

    Ok(rows.into_iter().map(|row| view_of(row, None)).collect())
}
