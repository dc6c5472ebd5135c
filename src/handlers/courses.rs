// src/handlers/courses.rs

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
    models::{
        course::{Course, CreateCourseRequest, UpdateCourseRequest},
        user::User,
    },
    utils::session::CurrentUser,
};

const COURSE_COLUMNS: &str = "id, name, number, description, created_at";

fn require_faculty(user: &User) -> Result<(), AppError> {
    if user.is_faculty_or_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Faculty privilege required.".to_string(),
        ))
    }
}

/// Lists every course in the catalog.
pub async fn find_all_courses(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let courses = sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses ORDER BY created_at DESC"
    ))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list courses: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(courses))
}

/// Creates a new course.
/// Faculty/Admin only.
pub async fn create_course(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_faculty(&current)?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let course = sqlx::query_as::<_, Course>(&format!(
        "INSERT INTO courses (id, name, number, description) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {COURSE_COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(payload.name)
    .bind(payload.number)
    .bind(payload.description)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(course)))
}

/// Updates course details with field-level partial updates.
/// Faculty/Admin only.
pub async fn update_course(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(course_id): Path<String>,
    Json(payload): Json<UpdateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_faculty(&current)?;

    let course = sqlx::query_as::<_, Course>(&format!(
        "UPDATE courses SET \
            name = COALESCE($1, name), \
            number = COALESCE($2, number), \
            description = COALESCE($3, description) \
         WHERE id = $4 \
         RETURNING {COURSE_COLUMNS}"
    ))
    .bind(payload.name)
    .bind(payload.number)
    .bind(payload.description)
    .bind(&course_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Course not found".to_string()))?;

    Ok(Json(course))
}

/// Deletes a course. Modules, assignments, quizzes (and their
/// submissions) and enrollments go with it via foreign keys.
/// Faculty/Admin only.
pub async fn delete_course(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_faculty(&current)?;

    let result = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(&course_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete course: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists the courses a user is enrolled in.
pub async fn find_courses_for_user(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if current.id != user_id && !current.is_faculty_or_admin() {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }

    let courses = sqlx::query_as::<_, Course>(
        "SELECT c.id, c.name, c.number, c.description, c.created_at \
         FROM courses c \
         JOIN enrollments e ON e.course_id = c.id \
         WHERE e.user_id = $1 \
         ORDER BY c.created_at DESC",
    )
    .bind(&user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(courses))
}

/// Lists the users enrolled in a course.
pub async fn find_users_for_course(
    State(pool): State<PgPool>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT u.id, u.username, u.password, u.first_name, u.last_name, \
                u.email, u.role, u.created_at \
         FROM users u \
         JOIN enrollments e ON e.user_id = u.id \
         WHERE e.course_id = $1 \
         ORDER BY u.username",
    )
    .bind(&course_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(users))
}
