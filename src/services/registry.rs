//! Level/Student registry: level and student records plus the derivation of
//! their human-readable identifiers.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::{
        level::{CreateLevelRequest, Level, LevelSummary, UpdateLevelRequest},
        student::{CreateStudentRequest, Student, StudentSummary, UpdateStudentRequest},
    },
    utils::html::clean_optional,
};

/// How many times a derived student ID is regenerated after colliding with a
/// manually assigned one.
const STUDENT_ID_RETRIES: usize = 3;

/// Derives a level code from its name: first three characters, upper-cased.
pub fn derive_level_code(name: &str) -> String {
    name.trim().chars().take(3).collect::<String>().to_uppercase()
}

/// Formats a student ID as the level prefix followed by a 3-digit sequence.
pub fn format_student_id(prefix: &str, sequence: i64) -> String {
    format!("{}{:03}", prefix.trim().to_uppercase(), sequence)
}

const LEVEL_SUMMARY_SELECT: &str = r#"
    SELECT
        l.*,
        (SELECT COUNT(*) FROM students s WHERE s.level_id = l.id) AS student_count,
        (SELECT COUNT(*) FROM exam_modules m WHERE m.level_id = l.id) AS exam_module_count
    FROM levels l
"#;

pub async fn list_levels(pool: &SqlitePool) -> Result<Vec<LevelSummary>, AppError> {
    let levels = sqlx::query_as::<_, LevelSummary>(&format!(
        "{} ORDER BY l.level_type, l.name",
        LEVEL_SUMMARY_SELECT
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list levels: {:?}", e);
        AppError::from(e)
    })?;

    Ok(levels)
}

pub async fn get_level(pool: &SqlitePool, id: i64) -> Result<LevelSummary, AppError> {
    sqlx::query_as::<_, LevelSummary>(&format!("{} WHERE l.id = $1", LEVEL_SUMMARY_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Level {} not found", id)))
}

async fn find_level(pool: &SqlitePool, id: i64) -> Result<Level, AppError> {
    sqlx::query_as::<_, Level>("SELECT * FROM levels WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Level {} not found", id)))
}

/// Creates a level, deriving its code from the name when none is supplied.
pub async fn create_level(pool: &SqlitePool, req: CreateLevelRequest) -> Result<Level, AppError> {
    req.validate()?;

    let name = req.name.trim().to_string();
    let code = match req.code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => code.to_uppercase(),
        None => derive_level_code(&name),
    };
    if code.is_empty() {
        return Err(AppError::BadRequest("Level code cannot be empty".to_string()));
    }
    let now = Utc::now();

    let level = sqlx::query_as::<_, Level>(
        r#"
        INSERT INTO levels (name, code, level_type, description, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(&code)
    .bind(req.level_type)
    .bind(clean_optional(req.description.as_deref()))
    .bind(req.is_active.unwrap_or(true))
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!(
                "Level name '{}' or code '{}' already exists",
                name, code
            ))
        } else {
            tracing::error!("Failed to create level: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!(level_id = level.id, code = %level.code, "Level created");
    Ok(level)
}

pub async fn update_level(
    pool: &SqlitePool,
    id: i64,
    req: UpdateLevelRequest,
) -> Result<Level, AppError> {
    req.validate()?;
    find_level(pool, id).await?;

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE levels SET ");
    let mut separated = builder.separated(", ");

    if let Some(name) = req.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name.trim().to_string());
    }
    if let Some(code) = req.code {
        separated.push("code = ");
        separated.push_bind_unseparated(code.trim().to_uppercase());
    }
    if let Some(level_type) = req.level_type {
        separated.push("level_type = ");
        separated.push_bind_unseparated(level_type);
    }
    if let Some(description) = req.description {
        separated.push("description = ");
        separated.push_bind_unseparated(clean_optional(Some(description.as_str())));
    }
    if let Some(is_active) = req.is_active {
        separated.push("is_active = ");
        separated.push_bind_unseparated(is_active);
    }
    separated.push("updated_at = ");
    separated.push_bind_unseparated(Utc::now());

    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");

    builder
        .build_query_as::<Level>()
        .fetch_one(pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Level name or code already exists".to_string())
            } else {
                tracing::error!("Failed to update level {}: {:?}", id, e);
                AppError::from(e)
            }
        })
}

/// Deletes a level. Levels that still own students or exam modules are protected.
pub async fn delete_level(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
    let summary = get_level(pool, id).await?;
    if summary.student_count > 0 || summary.exam_module_count > 0 {
        return Err(AppError::Conflict(format!(
            "Level '{}' still has {} student(s) and {} exam module(s)",
            summary.level.name, summary.student_count, summary.exam_module_count
        )));
    }

    sqlx::query("DELETE FROM levels WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    tracing::info!(level_id = id, "Level deleted");
    Ok(())
}

/// Reserves the next student ID for a level.
///
/// The counter is bumped in a single statement, so concurrent registrations in
/// the same level never observe the same sequence number. The counter never
/// falls behind the number of students already in the level.
pub async fn assign_student_id(pool: &SqlitePool, level_id: i64) -> Result<String, AppError> {
    let (code, sequence): (String, i64) = sqlx::query_as(
        r#"
        UPDATE levels
        SET student_seq = MAX(student_seq, (SELECT COUNT(*) FROM students WHERE level_id = $1)) + 1
        WHERE id = $1
        RETURNING code, student_seq
        "#,
    )
    .bind(level_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Level {} not found", level_id)))?;

    Ok(format_student_id(&code, sequence))
}

/// Shows the ID the next registration in this level would receive, without
/// reserving it.
pub async fn preview_student_id(pool: &SqlitePool, level_id: i64) -> Result<String, AppError> {
    let (code, sequence): (String, i64) = sqlx::query_as(
        r#"
        SELECT code, MAX(student_seq, (SELECT COUNT(*) FROM students WHERE level_id = $1)) + 1
        FROM levels
        WHERE id = $1
        "#,
    )
    .bind(level_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Level {} not found", level_id)))?;

    Ok(format_student_id(&code, sequence))
}

async fn insert_student(
    pool: &SqlitePool,
    full_name: &str,
    student_id: &str,
    level_id: i64,
    is_active: bool,
) -> Result<Student, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, Student>(
        r#"
        INSERT INTO students (full_name, student_id, level_id, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $5)
        RETURNING *
        "#,
    )
    .bind(full_name)
    .bind(student_id)
    .bind(level_id)
    .bind(is_active)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Registers a student, deriving the student ID from the level if absent.
pub async fn register_student(
    pool: &SqlitePool,
    req: CreateStudentRequest,
) -> Result<Student, AppError> {
    req.validate()?;

    let level = find_level(pool, req.level_id).await?;
    let full_name = req.full_name.trim().to_string();
    let is_active = req.is_active.unwrap_or(true);

    if let Some(student_id) = req.student_id.as_deref().map(str::trim) {
        let student = insert_student(pool, &full_name, student_id, level.id, is_active)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!("Student ID '{}' already exists", student_id))
                } else {
                    tracing::error!("Failed to register student: {:?}", e);
                    AppError::from(e)
                }
            })?;
        tracing::info!(student_id = %student.student_id, "Student registered");
        return Ok(student);
    }

    for _ in 0..STUDENT_ID_RETRIES {
        let student_id = assign_student_id(pool, level.id).await?;
        match insert_student(pool, &full_name, &student_id, level.id, is_active).await {
            Ok(student) => {
                tracing::info!(student_id = %student.student_id, "Student registered");
                return Ok(student);
            }
            Err(e) if is_unique_violation(&e) => {
                tracing::warn!("Derived student ID '{}' is taken, regenerating", student_id);
            }
            Err(e) => {
                tracing::error!("Failed to register student: {:?}", e);
                return Err(e.into());
            }
        }
    }

    Err(AppError::Conflict(format!(
        "Could not derive a free student ID for level '{}'",
        level.code
    )))
}

const STUDENT_SUMMARY_SELECT: &str = r#"
    SELECT
        s.*,
        (SELECT COUNT(*) FROM exam_attempts a
            WHERE a.student_id = s.id AND a.status = 'completed') AS completed_exams_count,
        (SELECT ROUND(COALESCE(AVG(a.score), 0), 2) FROM exam_attempts a
            WHERE a.student_id = s.id AND a.status = 'completed') AS average_score
    FROM students s
"#;

pub async fn list_students(
    pool: &SqlitePool,
    level_id: Option<i64>,
) -> Result<Vec<StudentSummary>, AppError> {
    let students = sqlx::query_as::<_, StudentSummary>(&format!(
        "{} WHERE ($1 IS NULL OR s.level_id = $1) ORDER BY s.level_id, s.full_name",
        STUDENT_SUMMARY_SELECT
    ))
    .bind(level_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list students: {:?}", e);
        AppError::from(e)
    })?;

    Ok(students)
}

/// A student with completed-exam count and average score.
pub async fn get_student_summary(pool: &SqlitePool, id: i64) -> Result<StudentSummary, AppError> {
    sqlx::query_as::<_, StudentSummary>(&format!("{} WHERE s.id = $1", STUDENT_SUMMARY_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Student {} not found", id)))
}

pub async fn get_student(pool: &SqlitePool, id: i64) -> Result<Student, AppError> {
    sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Student {} not found", id)))
}

/// Looks a student up by the human-readable student ID.
pub async fn find_student_by_code(pool: &SqlitePool, student_id: &str) -> Result<Student, AppError> {
    sqlx::query_as::<_, Student>("SELECT * FROM students WHERE student_id = $1")
        .bind(student_id.trim())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Student '{}' not found", student_id)))
}

pub async fn update_student(
    pool: &SqlitePool,
    id: i64,
    req: UpdateStudentRequest,
) -> Result<Student, AppError> {
    req.validate()?;
    get_student(pool, id).await?;
    if let Some(level_id) = req.level_id {
        find_level(pool, level_id).await?;
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE students SET ");
    let mut separated = builder.separated(", ");

    if let Some(full_name) = req.full_name {
        separated.push("full_name = ");
        separated.push_bind_unseparated(full_name.trim().to_string());
    }
    if let Some(student_id) = req.student_id {
        separated.push("student_id = ");
        separated.push_bind_unseparated(student_id.trim().to_string());
    }
    if let Some(level_id) = req.level_id {
        separated.push("level_id = ");
        separated.push_bind_unseparated(level_id);
    }
    if let Some(is_active) = req.is_active {
        separated.push("is_active = ");
        separated.push_bind_unseparated(is_active);
    }
    separated.push("updated_at = ");
    separated.push_bind_unseparated(Utc::now());

    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");

    builder
        .build_query_as::<Student>()
        .fetch_one(pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Student ID already exists".to_string())
            } else {
                tracing::error!("Failed to update student {}: {:?}", id, e);
                AppError::from(e)
            }
        })
}

/// Deletes a student together with their attempts and answers.
pub async fn delete_student(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM students WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Student {} not found", id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_level_code() {
        assert_eq!(derive_level_code("Grade 10"), "GRA");
        assert_eq!(derive_level_code("  year one"), "YEA");
        assert_eq!(derive_level_code("JS"), "JS");
    }

    #[test]
    fn test_format_student_id() {
        assert_eq!(format_student_id("G10", 4), "G10004");
        assert_eq!(format_student_id("ug1", 12), "UG1012");
        assert_eq!(format_student_id("G10", 1234), "G101234");
    }
}
