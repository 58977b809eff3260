//! Attempt submission and results.

use axum::{
  extract::{Path, State},
  Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::config::RECENT_ATTEMPTS_LIMIT;
use crate::db;
use crate::domain::Attempt;
use crate::error::AppResult;
use crate::services::attempts::{self, AttemptResult, SubmittedAnswer};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  #[serde(default)]
  pub answers: Vec<SubmittedAnswer>,
}

/// POST /api/attempts/{id}/submit
pub async fn submit_attempt(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
  Json(body): Json<SubmitBody>,
) -> AppResult<Json<AttemptResult>> {
  let conn = db::try_lock(&state.db)?;
  let result = attempts::submit_attempt(&conn, id, auth.user_id, &body.answers, Utc::now())?;
  Ok(Json(result))
}

/// GET /api/attempts/{id} - graded attempt with the answer key
pub async fn get_attempt(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> AppResult<Json<AttemptResult>> {
  let conn = db::try_lock(&state.db)?;
  Ok(Json(attempts::attempt_result(&conn, id, auth.user_id, auth.role)?))
}

/// GET /api/attempts - the caller's attempt history, newest first
pub async fn list_my_attempts(
  auth: AuthContext,
  State(state): State<AppState>,
) -> AppResult<Json<Vec<Attempt>>> {
  let conn = db::try_lock(&state.db)?;
  Ok(Json(db::list_user_attempts(&conn, auth.user_id, RECENT_ATTEMPTS_LIMIT * 20)?))
}
