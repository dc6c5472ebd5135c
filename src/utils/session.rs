// src/utils/session.rs
//
// DB-backed session cookies. A signin opens a session row keyed by an
// opaque uuid token, delivered to the browser in an HttpOnly cookie;
// the auth middleware resolves the cookie back to the user on every
// protected request.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{error::AppError, models::user::User, state::AppState};

pub const SESSION_COOKIE: &str = "kambaz_sid";

/// Session lifetime: 7 days.
const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;

/// The authenticated user, injected into request extensions by
/// `auth_middleware`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);


/// Opens a new session for the user and returns the opaque token.
pub async fn create_session(pool: &PgPool, user_id: &str) -> Result<String, AppError> {
    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::seconds(SESSION_MAX_AGE_SECS);

    sqlx::query("INSERT INTO sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(&token)
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(token)
}

/// Deletes a session row. Missing rows are fine (already signed out).
pub async fn destroy_session(pool: &PgPool, token: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Resolves a session token to its user, ignoring expired sessions.
pub async fn find_session_user(pool: &PgPool, token: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT u.id, u.username, u.password, u.first_name, u.last_name, \
                u.email, u.role, u.created_at \
         FROM sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.id = $1 AND s.expires_at > NOW()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// `Set-Cookie` value establishing the session cookie.
pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, SESSION_MAX_AGE_SECS
    )
}

/// `Set-Cookie` value clearing the session cookie on signout.
pub fn expired_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Extracts the session token from the request's `Cookie` header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Axum Middleware: Authentication.
///
/// Intercepts requests, resolves the session cookie to a user row and
/// injects `CurrentUser` into the request extensions for handlers to use.
/// If there is no valid session, returns 401 Unauthorized.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = session_token(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    match find_session_user(&state.pool, &token).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(CurrentUser(user));
            Ok(next.run(req).await)
        }
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(e) => {
            tracing::error!("Session lookup failed: {:?}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_session_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; kambaz_sid=abc-123; other=1"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc-123"));
    }

    #[test]
    fn missing_cookie_yields_none() {
        let headers = HeaderMap::new();
        assert!(session_token(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert!(session_token(&headers).is_none());
    }
}
