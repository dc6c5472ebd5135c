// src/handlers/assignments.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::assignment::{Assignment, CreateAssignmentRequest, UpdateAssignmentRequest},
    utils::session::CurrentUser,
};

const ASSIGNMENT_COLUMNS: &str = "id, course, title, description, points, \
    due_date, available_from, available_until, created_at";

/// Lists the assignments of a course.
pub async fn find_assignments_for_course(
    State(pool): State<PgPool>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let assignments = sqlx::query_as::<_, Assignment>(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE course = $1 ORDER BY created_at"
    ))
    .bind(&course_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(assignments))
}

/// Creates an assignment within a course.
/// Faculty/Admin only.
pub async fn create_assignment_for_course(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(course_id): Path<String>,
    Json(payload): Json<CreateAssignmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !current.is_faculty_or_admin() {
        return Err(AppError::Forbidden(
            "Faculty privilege required.".to_string(),
        ));
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let assignment = sqlx::query_as::<_, Assignment>(&format!(
        "INSERT INTO assignments \
            (id, course, title, description, points, due_date, available_from, available_until) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {ASSIGNMENT_COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(&course_id)
    .bind(payload.title)
    .bind(payload.description)
    .bind(payload.points.unwrap_or(100))
    .bind(payload.due_date)
    .bind(payload.available_from)
    .bind(payload.available_until)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("foreign key") {
            AppError::NotFound("Course not found".to_string())
        } else {
            tracing::error!("Failed to create assignment: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(assignment)))
}

/// Updates an assignment with field-level partial updates.
/// Faculty/Admin only.
pub async fn update_assignment(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(assignment_id): Path<String>,
    Json(payload): Json<UpdateAssignmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !current.is_faculty_or_admin() {
        return Err(AppError::Forbidden(
            "Faculty privilege required.".to_string(),
        ));
    }

    let assignment = sqlx::query_as::<_, Assignment>(&format!(
        "UPDATE assignments SET \
            title = COALESCE($1, title), \
            description = COALESCE($2, description), \
            points = COALESCE($3, points), \
            due_date = COALESCE($4, due_date), \
            available_from = COALESCE($5, available_from), \
            available_until = COALESCE($6, available_until) \
         WHERE id = $7 \
         RETURNING {ASSIGNMENT_COLUMNS}"
    ))
    .bind(payload.title)
    .bind(payload.description)
    .bind(payload.points)
    .bind(payload.due_date)
    .bind(payload.available_from)
    .bind(payload.available_until)
    .bind(&assignment_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Assignment not found".to_string()))?;

    Ok(Json(assignment))
}

/// Deletes an assignment.
/// Faculty/Admin only.
pub async fn delete_assignment(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(assignment_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !current.is_faculty_or_admin() {
        return Err(AppError::Forbidden(
            "Faculty privilege required.".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM assignments WHERE id = $1")
        .bind(&assignment_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Assignment not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
