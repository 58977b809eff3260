//! Role-specific dashboard summaries.

use axum::{extract::State, Json};
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;

use crate::auth::AuthContext;
use crate::config::RECENT_ATTEMPTS_LIMIT;
use crate::db::{self, LogOnError};
use crate::domain::{Attempt, Role};
use crate::error::AppResult;
use crate::services::access::{self, QuotaStatus};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Dashboard {
  #[serde(rename_all = "camelCase")]
  Admin {
    users: i64,
    active_questions: i64,
    exams: i64,
    attempts: i64,
    open_tickets: i64,
  },
  /// Teachers and institutes
  #[serde(rename_all = "camelCase")]
  Educator {
    exams_created: i64,
    attempts_on_my_exams: i64,
    average_score: f64,
    quota: QuotaStatus,
  },
  #[serde(rename_all = "camelCase")]
  Student {
    completed_attempts: i64,
    average_score: f64,
    recent_attempts: Vec<Attempt>,
    quota: QuotaStatus,
  },
}

fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}

pub fn build_dashboard(conn: &Connection, user_id: i64, role: Role) -> rusqlite::Result<Dashboard> {
  let dashboard = match role {
    Role::Admin => Dashboard::Admin {
      users: db::get_user_count(conn)?,
      active_questions: db::count_active_questions(conn)?,
      exams: db::count_exams(conn)?,
      attempts: db::count_attempts(conn)?,
      open_tickets: db::count_open_tickets(conn).log_warn_default("Failed to count open tickets"),
    },
    Role::Teacher | Role::Institute => {
      let (attempts, average) = db::creator_attempt_stats(conn, user_id)?;
      Dashboard::Educator {
        exams_created: db::count_exams_created_by(conn, user_id)?,
        attempts_on_my_exams: attempts,
        average_score: round2(average),
        quota: access::quota_status(conn, user_id, Utc::now())?,
      }
    }
    Role::Student => {
      let (attempts, average) = db::user_attempt_stats(conn, user_id)?;
      Dashboard::Student {
        completed_attempts: attempts,
        average_score: round2(average),
        recent_attempts: db::list_user_attempts(conn, user_id, RECENT_ATTEMPTS_LIMIT)?,
        quota: access::quota_status(conn, user_id, Utc::now())?,
      }
    }
  };
  Ok(dashboard)
}

/// GET /api/dashboard
pub async fn dashboard(auth: AuthContext, State(state): State<AppState>) -> AppResult<Json<Dashboard>> {
  let conn = db::try_lock(&state.db)?;
  Ok(Json(build_dashboard(&conn, auth.user_id, auth.role)?))
}
