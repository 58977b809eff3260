//! Subscription plans and admin grants.
//!
//! There is no payment gateway integration; an administrator grants a plan
//! once payment has been verified out of band.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::AuthContext;
use crate::db;
use crate::domain::{Feature, Plan};
use crate::error::{AppError, AppResult};
use crate::services::access::{self, QuotaStatus};
use crate::state::AppState;
use crate::validation::ValidationErrors;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanInfo {
  pub plan: Plan,
  pub monthly_exam_limit: Option<u32>,
  pub official_exams: bool,
}

/// GET /api/subscriptions/plans
pub async fn list_plans() -> Json<Vec<PlanInfo>> {
  Json(
    Plan::ALL
      .iter()
      .map(|plan| PlanInfo {
        plan: *plan,
        monthly_exam_limit: plan.monthly_exam_limit(),
        official_exams: plan.has_feature(Feature::OfficialExams),
      })
      .collect(),
  )
}

/// GET /api/subscriptions/me
pub async fn my_subscription(
  auth: AuthContext,
  State(state): State<AppState>,
) -> AppResult<Json<QuotaStatus>> {
  let conn = db::try_lock(&state.db)?;
  Ok(Json(access::quota_status(&conn, auth.user_id, Utc::now())?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantBody {
  pub user_id: i64,
  pub plan: String,
  pub days: i64,
  /// Payment reference recorded for support
  pub reference: Option<String>,
}

/// POST /api/admin/subscriptions
pub async fn grant_subscription(
  auth: AuthContext,
  State(state): State<AppState>,
  Json(body): Json<GrantBody>,
) -> AppResult<impl IntoResponse> {
  auth.require_admin()?;

  let mut errors = ValidationErrors::default();
  let plan = Plan::from_str(&body.plan);
  if plan.is_none() {
    errors.push("plan", format!("unknown plan '{}'", body.plan));
  }
  if !(1..=366).contains(&body.days) {
    errors.push("days", "must be between 1 and 366");
  }
  let Some(plan) = plan.filter(|_| errors.is_empty()) else {
    return Err(errors.into());
  };

  let conn = db::try_lock(&state.db)?;
  if db::get_user_by_id(&conn, body.user_id)?.is_none() {
    return Err(AppError::NotFound("User"));
  }
  db::create_subscription(&conn, body.user_id, plan, body.days, body.reference.as_deref())?;
  tracing::info!(
    "Admin {} granted {} for {} days to user {}",
    auth.username,
    plan.as_str(),
    body.days,
    body.user_id
  );

  let status = access::quota_status(&conn, body.user_id, Utc::now())?;
  Ok((StatusCode::CREATED, Json(status)))
}
