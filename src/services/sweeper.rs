//! Idle-timeout policy: attempts still in progress after their exam's duration
//! has elapsed are marked abandoned.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;

use crate::{error::AppError, models::exam_attempt::AttemptStatus};

/// Abandons every in-progress attempt whose deadline lies before `now`.
/// Returns the number of attempts swept.
///
/// The end time of a swept attempt is its deadline, so its time taken equals
/// the exam duration.
pub async fn abandon_expired(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64, AppError> {
    let open: Vec<(i64, DateTime<Utc>, i64)> = sqlx::query_as(
        r#"
        SELECT a.id, a.start_time, m.duration_minutes
        FROM exam_attempts a
        JOIN exam_modules m ON m.id = a.exam_module_id
        WHERE a.status = $1
        "#,
    )
    .bind(AttemptStatus::InProgress)
    .fetch_all(pool)
    .await?;

    let mut swept = 0;
    for (id, start_time, duration_minutes) in open {
        let deadline = start_time + Duration::minutes(duration_minutes);
        if deadline >= now {
            continue;
        }

        let result = sqlx::query(
            r#"
            UPDATE exam_attempts
            SET status = $1, end_time = $2, time_taken_seconds = $3
            WHERE id = $4 AND status = $5
            "#,
        )
        .bind(AttemptStatus::Abandoned)
        .bind(deadline)
        .bind(duration_minutes * 60)
        .bind(id)
        .bind(AttemptStatus::InProgress)
        .execute(pool)
        .await?;
        swept += result.rows_affected();
    }

    if swept > 0 {
        tracing::info!(swept, "Abandoned expired attempts");
    }
    Ok(swept)
}

/// Runs [`abandon_expired`] every `interval_secs` seconds until the runtime stops.
pub fn spawn_sweeper(pool: SqlitePool, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(StdDuration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = abandon_expired(&pool, Utc::now()).await {
                tracing::error!("Abandonment sweep failed: {:?}", e);
            }
        }
    })
}
