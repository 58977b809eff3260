use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::QuestionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamKind {
  /// Composed from a user's exam specification
  Custom,
  /// Admin-curated, fixed per-juz quota
  Official,
}

impl ExamKind {
  pub fn from_str(s: &str) -> Self {
    match s {
      "official" => Self::Official,
      _ => Self::Custom,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Custom => "custom",
      Self::Official => "official",
    }
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
  pub id: i64,
  pub title: String,
  pub kind: ExamKind,
  pub created_by: i64,
  /// Normalized specification the custom exam was built from (JSON)
  pub spec: Option<serde_json::Value>,
  pub juz_start: Option<u8>,
  pub juz_end: Option<u8>,
  pub year: Option<i32>,
  pub duration_minutes: u32,
  pub is_published: bool,
  pub created_at: DateTime<Utc>,
}

/// One row of an exam's ordered question list.
///
/// For official exams `juz` and `kind` record which unit quota selected it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficialExamQuestion {
  pub exam_id: i64,
  pub question_id: i64,
  pub position: u32,
  pub juz: Option<u8>,
  pub kind: Option<QuestionKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
  InProgress,
  Submitted,
  Expired,
}

impl AttemptStatus {
  pub fn from_str(s: &str) -> Self {
    match s {
      "submitted" => Self::Submitted,
      "expired" => Self::Expired,
      _ => Self::InProgress,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::InProgress => "in_progress",
      Self::Submitted => "submitted",
      Self::Expired => "expired",
    }
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
  pub id: i64,
  pub exam_id: i64,
  pub user_id: i64,
  pub started_at: DateTime<Utc>,
  pub deadline_at: DateTime<Utc>,
  pub submitted_at: Option<DateTime<Utc>>,
  pub status: AttemptStatus,
  pub correct: u32,
  pub total: u32,
  pub score: f64,
}

impl Attempt {
  /// Whether a submission at `now` falls after the deadline plus grace.
  pub fn is_past_deadline(&self, now: DateTime<Utc>, grace_seconds: i64) -> bool {
    now > self.deadline_at + chrono::Duration::seconds(grace_seconds)
  }
}

/// Percentage score rounded to two decimals; an empty exam scores zero.
pub fn score_percent(correct: u32, total: u32) -> f64 {
  if total == 0 {
    return 0.0;
  }
  let raw = correct as f64 / total as f64 * 100.0;
  (raw * 100.0).round() / 100.0
}
