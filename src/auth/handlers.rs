//! Authentication handlers for register, login, logout and `me`.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::middleware::AuthContext;
use super::password;
use crate::config::{MIN_PASSWORD_LEN, SESSION_DURATION_HOURS};
use crate::db::{self, LogOnError};
use crate::domain::{Role, UserInfo};
use crate::error::{AppError, AppResult};
use crate::session::{expired_session_cookie, generate_session_id, session_cookie, SESSION_COOKIE_NAME};
use crate::state::AppState;
use crate::validation::ValidationErrors;

const MSG_BAD_CREDENTIALS: &str = "نام کاربری یا رمز عبور اشتباه است";

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Validate username format (3-32 letters, digits or underscores)
fn is_valid_username(username: &str) -> bool {
    let len = username.chars().count();
    (3..=32).contains(&len) && username.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn validate_credentials(form: &Credentials) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if !is_valid_username(form.username.trim()) {
        errors.push(
            "username",
            "must be 3-32 letters, digits or underscores",
        );
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_LEN),
        );
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// POST /api/auth/register - create an account and log it in.
/// The first account ever created becomes the administrator.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(form): Json<Credentials>,
) -> AppResult<impl IntoResponse> {
    validate_credentials(&form)?;
    let username = form.username.trim().to_string();

    let password_hash = password::hash_password(&form.password).map_err(|e| {
        AppError::Internal(format!("Failed to hash password: {}", e))
    })?;

    let conn = db::try_lock(&state.db)?;
    if db::username_exists(&conn, &username)? {
        return Err(AppError::Conflict("این نام کاربری قبلاً ثبت شده است".to_string()));
    }

    let role = if db::get_user_count(&conn)? == 0 {
        Role::Admin
    } else {
        Role::Student
    };
    let user_id = db::create_user(&conn, &username, &password_hash, role)?;

    let session_id = generate_session_id();
    db::create_session(&conn, user_id, &session_id, SESSION_DURATION_HOURS)?;
    let user = db::get_user_by_id(&conn, user_id)?.ok_or(AppError::NotFound("User"))?;
    drop(conn);

    tracing::info!("Registered user {} ({}) as {}", username, user_id, role.as_str());
    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(session_id)),
        Json(user),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(form): Json<Credentials>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;

    let creds = db::get_user_credentials(&conn, form.username.trim())?
        .ok_or_else(|| AppError::BadRequest(MSG_BAD_CREDENTIALS.to_string()))?;

    if !password::verify_password(&form.password, &creds.password_hash) {
        tracing::info!("Failed login for {}", creds.username);
        return Err(AppError::BadRequest(MSG_BAD_CREDENTIALS.to_string()));
    }

    db::update_last_login(&conn, creds.id).log_warn("Failed to update last login");

    let session_id = generate_session_id();
    db::create_session(&conn, creds.id, &session_id, SESSION_DURATION_HOURS)?;
    let user = db::get_user_by_id(&conn, creds.id)?.ok_or(AppError::NotFound("User"))?;

    Ok((jar.add(session_cookie(session_id)), Json(user)))
}

/// POST /api/auth/logout - delete the session and clear the cookie
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> AppResult<impl IntoResponse> {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        let conn = db::try_lock(&state.db)?;
        db::delete_session(&conn, cookie.value()).log_warn("Failed to delete session during logout");
    }
    Ok((jar.remove(expired_session_cookie()), StatusCode::NO_CONTENT))
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> AppResult<Json<UserInfo>> {
    let conn = db::try_lock(&state.db)?;
    let user = db::get_user_by_id(&conn, auth.user_id)?.ok_or(AppError::NotFound("User"))?;
    Ok(Json(user))
}
