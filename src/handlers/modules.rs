// src/handlers/modules.rs

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
    models::course_module::{CourseModule, CreateModuleRequest, UpdateModuleRequest},
    utils::session::CurrentUser,
};

const MODULE_COLUMNS: &str = "id, course, name, description, created_at";

/// Lists the modules of a course.
pub async fn find_modules_for_course(
    State(pool): State<PgPool>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let modules = sqlx::query_as::<_, CourseModule>(&format!(
        "SELECT {MODULE_COLUMNS} FROM modules WHERE course = $1 ORDER BY created_at"
    ))
    .bind(&course_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(modules))
}

/// Creates a module within a course.
/// Faculty/Admin only.
pub async fn create_module_for_course(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(course_id): Path<String>,
    Json(payload): Json<CreateModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !current.is_faculty_or_admin() {
        return Err(AppError::Forbidden(
            "Faculty privilege required.".to_string(),
        ));
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let module = sqlx::query_as::<_, CourseModule>(&format!(
        "INSERT INTO modules (id, course, name, description) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {MODULE_COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(&course_id)
    .bind(payload.name)
    .bind(payload.description)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("foreign key") {
            AppError::NotFound("Course not found".to_string())
        } else {
            tracing::error!("Failed to create module: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(module)))
}

/// Updates a module with field-level partial updates.
/// Faculty/Admin only.
pub async fn update_module(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(module_id): Path<String>,
    Json(payload): Json<UpdateModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !current.is_faculty_or_admin() {
        return Err(AppError::Forbidden(
            "Faculty privilege required.".to_string(),
        ));
    }

    let module = sqlx::query_as::<_, CourseModule>(&format!(
        "UPDATE modules SET \
            name = COALESCE($1, name), \
            description = COALESCE($2, description) \
         WHERE id = $3 \
         RETURNING {MODULE_COLUMNS}"
    ))
    .bind(payload.name)
    .bind(payload.description)
    .bind(&module_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Module not found".to_string()))?;

    Ok(Json(module))
}

/// Deletes a module.
/// Faculty/Admin only.
pub async fn delete_module(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(module_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !current.is_faculty_or_admin() {
        return Err(AppError::Forbidden(
            "Faculty privilege required.".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM modules WHERE id = $1")
        .bind(&module_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Module not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
