//! Admin-only user management.

use axum::{
  extract::{Path, Query, State},
  Json,
};
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::config::page_size;
use crate::db;
use crate::domain::{Role, UserInfo};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::validation::ValidationErrors;

use super::exams::PageQuery;

/// GET /api/admin/users
pub async fn list_users(
  auth: AuthContext,
  State(state): State<AppState>,
  Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<UserInfo>>> {
  auth.require_admin()?;
  let conn = db::try_lock(&state.db)?;
  let users = db::list_users(&conn, page_size(page.limit), page.offset.unwrap_or(0).max(0))?;
  Ok(Json(users))
}

#[derive(Debug, Deserialize)]
pub struct RoleBody {
  pub role: String,
}

/// PUT /api/admin/users/{id}/role
pub async fn set_user_role(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(user_id): Path<i64>,
  Json(body): Json<RoleBody>,
) -> AppResult<Json<UserInfo>> {
  auth.require_admin()?;
  let role = Role::from_str(&body.role)
    .ok_or_else(|| ValidationErrors::single("role", format!("unknown role '{}'", body.role)))?;
  if user_id == auth.user_id && role != Role::Admin {
    return Err(AppError::BadRequest("مدیر نمی‌تواند نقش خود را تغییر دهد".to_string()));
  }

  let conn = db::try_lock(&state.db)?;
  if !db::set_user_role(&conn, user_id, role)? {
    return Err(AppError::NotFound("User"));
  }
  tracing::info!("Admin {} set user {} role to {}", auth.username, user_id, role.as_str());
  let user = db::get_user_by_id(&conn, user_id)?.ok_or(AppError::NotFound("User"))?;
  Ok(Json(user))
}
