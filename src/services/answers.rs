//! Answer recorder: per-question answers within an attempt in progress.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    db::BEGIN_WRITE,
    error::AppError,
    models::{exam_attempt::AttemptStatus, question::Answer, student_answer::StudentAnswer},
    services::{
        attempts::{ensure_in_progress, fetch_attempt},
        catalog::get_question,
    },
};

/// Correctness is judged once, against the key at the time of answering.
pub fn is_correct(selected: Option<Answer>, key: Answer) -> bool {
    selected == Some(key)
}

/// Records (or replaces) the answer to one question of an attempt.
///
/// Answering the same question again before submission overwrites the
/// earlier choice; the last answer wins.
pub async fn record_answer(
    pool: &SqlitePool,
    attempt_id: i64,
    question_id: i64,
    selected: Option<Answer>,
) -> Result<StudentAnswer, AppError> {
    let mut tx = pool.begin_with(BEGIN_WRITE).await?;

    let attempt = fetch_attempt(&mut tx, attempt_id).await?;
    ensure_in_progress(&attempt)?;

    let question = get_question(&mut tx, question_id).await?;
    if question.exam_module_id != attempt.exam_module_id || !question.is_active {
        return Err(AppError::BadRequest(format!(
            "Question {} is not part of this exam",
            question_id
        )));
    }

    // Guarded by the attempt status in the same statement, so nothing is
    // written once the attempt has been closed.
    let answer = sqlx::query_as::<_, StudentAnswer>(
        r#"
        INSERT INTO student_answers (attempt_id, question_id, selected_answer, is_correct, answered_at)
        SELECT $1, $2, $3, $4, $5
        WHERE EXISTS (SELECT 1 FROM exam_attempts WHERE id = $1 AND status = $6)
        ON CONFLICT (attempt_id, question_id) DO UPDATE SET
            selected_answer = excluded.selected_answer,
            is_correct = excluded.is_correct,
            answered_at = excluded.answered_at
        RETURNING *
        "#,
    )
    .bind(attempt_id)
    .bind(question_id)
    .bind(selected)
    .bind(is_correct(selected, question.correct_answer))
    .bind(Utc::now())
    .bind(AttemptStatus::InProgress)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record answer: {:?}", e);
        AppError::from(e)
    })?
    .ok_or_else(|| {
        AppError::InvalidStateTransition(format!("Attempt {} is no longer in progress", attempt_id))
    })?;

    tx.commit().await?;

    tracing::debug!(attempt_id, question_id, "Answer recorded");
    Ok(answer)
}
