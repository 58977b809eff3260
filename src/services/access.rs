//! Subscription plans, monthly quotas and feature gating.

use chrono::{DateTime, Datelike, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::db;
use crate::domain::{Exam, Feature, Plan, Role};
use crate::error::{AppError, AppResult};

const MSG_QUOTA_EXCEEDED: &str = "سقف ساخت آزمون ماهانه در طرح فعلی شما تکمیل شده است";
const MSG_FEATURE_LOCKED: &str = "این امکان در طرح فعلی شما فعال نیست";

/// Current plan and this month's custom exam usage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
  pub plan: Plan,
  pub used: u32,
  /// None means unlimited
  pub limit: Option<u32>,
  pub expires_at: Option<DateTime<Utc>>,
}

impl QuotaStatus {
  pub fn remaining(&self) -> Option<u32> {
    self.limit.map(|limit| limit.saturating_sub(self.used))
  }
}

/// Midnight UTC on the first day of `now`'s month
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
  now
    .date_naive()
    .with_day(1)
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|dt| dt.and_utc())
    .unwrap_or(now)
}

/// Active plan at `now`; users without a subscription are on Free
pub fn current_plan(conn: &Connection, user_id: i64, now: DateTime<Utc>) -> rusqlite::Result<Plan> {
  Ok(
    db::get_active_subscription(conn, user_id, now)?
      .map(|s| s.plan)
      .unwrap_or(Plan::Free),
  )
}

pub fn quota_status(conn: &Connection, user_id: i64, now: DateTime<Utc>) -> rusqlite::Result<QuotaStatus> {
  let subscription = db::get_active_subscription(conn, user_id, now)?;
  let plan = subscription.as_ref().map(|s| s.plan).unwrap_or(Plan::Free);
  Ok(QuotaStatus {
    plan,
    used: db::count_custom_exams_since(conn, user_id, start_of_month(now))?,
    limit: plan.monthly_exam_limit(),
    expires_at: subscription.map(|s| s.expires_at),
  })
}

/// Fail with 403 if creating one more custom exam would exceed the plan
pub fn check_custom_exam_quota(
  conn: &Connection,
  user_id: i64,
  role: Role,
  now: DateTime<Utc>,
) -> AppResult<()> {
  if role == Role::Admin {
    return Ok(());
  }
  let status = quota_status(conn, user_id, now)?;
  if status.remaining() == Some(0) {
    tracing::debug!(
      "User {} reached {} plan quota ({} exams)",
      user_id,
      status.plan.as_str(),
      status.used
    );
    return Err(AppError::Forbidden(MSG_QUOTA_EXCEEDED.to_string()));
  }
  Ok(())
}

/// Fail with 403 if the user's plan lacks `feature`
pub fn check_feature(
  conn: &Connection,
  user_id: i64,
  role: Role,
  feature: Feature,
  now: DateTime<Utc>,
) -> AppResult<()> {
  if role == Role::Admin || current_plan(conn, user_id, now)?.has_feature(feature) {
    Ok(())
  } else {
    Err(AppError::Forbidden(MSG_FEATURE_LOCKED.to_string()))
  }
}

/// Admins see everything, creators see their own exams, others only published ones
pub fn can_view_exam(exam: &Exam, user_id: i64, role: Role) -> bool {
  role == Role::Admin || exam.created_by == user_id || exam.is_published
}

/// Only the creator or an admin may change an exam
pub fn can_manage_exam(exam: &Exam, user_id: i64, role: Role) -> bool {
  role == Role::Admin || exam.created_by == user_id
}
