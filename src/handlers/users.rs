// src/handlers/users.rs

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
        enrollment::Enrollment,
        user::{CreateUserRequest, UpdateUserRequest, User, roles},
    },
    utils::{hash::hash_password, session::CurrentUser},
};

const USER_COLUMNS: &str =
    "id, username, password, first_name, last_name, email, role, created_at";

fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin privilege required.".to_string()))
    }
}

/// Lists all users in the system.
/// Admin only.
pub async fn find_all_users(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&current)?;

    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
    ))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

/// Fetches a single user by id.
/// Admins can fetch anyone; other users only themselves.
pub async fn find_user_by_id(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !current.is_admin() && current.id != user_id {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }

    let user =
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(&user_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Creates a new user with a specific role.
/// Admin only.
pub async fn create_user(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&current)?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;
    let role = payload.role.unwrap_or_else(|| roles::STUDENT.to_string());

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (id, username, password, first_name, last_name, email, role) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(&payload.username)
    .bind(hashed_password)
    .bind(payload.first_name)
    .bind(payload.last_name)
    .bind(payload.email)
    .bind(role)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict(format!("Username '{}' already exists", payload.username))
        } else {
            tracing::error!("Failed to create user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Updates user information with field-level partial updates.
/// Admins can update anyone; other users only themselves, and only an
/// admin may change a role.
pub async fn update_user(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !current.is_admin() && current.id != user_id {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }
    if payload.role.is_some() && !current.is_admin() {
        return Err(AppError::Forbidden("Admin privilege required.".to_string()));
    }

    let hashed_password = match payload.password {
        Some(new_password) => Some(hash_password(&new_password)?),
        None => None,
    };

    let updated = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET \
            username = COALESCE($1, username), \
            password = COALESCE($2, password), \
            first_name = COALESCE($3, first_name), \
            last_name = COALESCE($4, last_name), \
            email = COALESCE($5, email), \
            role = COALESCE($6, role) \
         WHERE id = $7 \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(payload.username)
    .bind(hashed_password)
    .bind(payload.first_name)
    .bind(payload.last_name)
    .bind(payload.email)
    .bind(payload.role)
    .bind(&user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(updated))
}

/// Deletes a user by id.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&current)?;

    if current.id == user_id {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(&user_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Enrolls a user in a course. Idempotent: re-enrolling returns the
/// existing enrollment. Users can enroll themselves; admins anyone.
pub async fn enroll_user_in_course(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path((user_id, course_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    if current.id != user_id && !current.is_admin() {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }

    let enrollment = sqlx::query_as::<_, Enrollment>(
        "INSERT INTO enrollments (id, user_id, course_id) VALUES ($1, $2, $3) \
         ON CONFLICT (user_id, course_id) DO UPDATE SET user_id = EXCLUDED.user_id \
         RETURNING id, user_id, course_id, created_at",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&user_id)
    .bind(&course_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // Foreign key violation: unknown user or course.
        if e.to_string().contains("foreign key") {
            AppError::NotFound("User or course not found".to_string())
        } else {
            tracing::error!("Failed to enroll user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok(Json(enrollment))
}

/// Removes a user's enrollment in a course.
/// Users can unenroll themselves; admins anyone.
pub async fn unenroll_user_from_course(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path((user_id, course_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    if current.id != user_id && !current.is_admin() {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }

    let result = sqlx::query("DELETE FROM enrollments WHERE user_id = $1 AND course_id = $2")
        .bind(&user_id)
        .bind(&course_id)
        .execute(&pool)
        .await?;

    Ok(Json(serde_json::json!({ "status": result.rows_affected() })))
}
