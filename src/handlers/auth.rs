// src/handlers/auth.rs

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{SigninRequest, SignupRequest, User, roles},
    utils::{
        hash::{hash_password, verify_password},
        session::{
            self, CurrentUser, create_session, destroy_session, expired_session_cookie,
            session_cookie,
        },
    },
};

const USER_COLUMNS: &str =
    "id, username, password, first_name, last_name, email, role, created_at";

/// Registers a new user and opens a session for them.
///
/// Hashes the password using Argon2 before storing it. The role defaults
/// to STUDENT when the payload omits it.
pub async fn signup(
    State(pool): State<PgPool>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
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
        // Postgres error code for unique violation is 23505
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict("Username already in use".to_string())
        } else {
            tracing::error!("Failed to sign up user: {:?}", e);
            AppError::from(e)
        }
    })?;

    let token = create_session(&pool, &user.id).await?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_cookie(&token))],
        Json(user),
    ))
}

/// Authenticates a user and opens a session.
///
/// Verifies the username and password against the database. On success
/// the session cookie is set and the user object returned.
pub async fn signin(
    State(pool): State<PgPool>,
    Json(payload): Json<SigninRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Signin DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = user.ok_or(AppError::AuthError(
        "Unable to login. Try again later.".to_string(),
    ))?;

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        return Err(AppError::AuthError(
            "Unable to login. Try again later.".to_string(),
        ));
    }

    let token = create_session(&pool, &user.id).await?;

    Ok(([(header::SET_COOKIE, session_cookie(&token))], Json(user)))
}

/// Destroys the current session (if any) and clears the cookie.
/// Signing out without a session is not an error.
pub async fn signout(
    State(pool): State<PgPool>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = session::session_token(&headers) {
        destroy_session(&pool, &token).await?;
    }

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, expired_session_cookie())],
    ))
}

/// Returns the currently signed-in user (401 without a session, handled
/// by the auth middleware).
pub async fn profile(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(user))
}
