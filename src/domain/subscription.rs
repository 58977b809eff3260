use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
  Free,
  Basic,
  Premium,
}

/// Features gated by subscription plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
  CustomExams,
  OfficialExams,
}

impl Plan {
  pub const ALL: [Plan; 3] = [Plan::Free, Plan::Basic, Plan::Premium];

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "free" => Some(Self::Free),
      "basic" => Some(Self::Basic),
      "premium" => Some(Self::Premium),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Free => "free",
      Self::Basic => "basic",
      Self::Premium => "premium",
    }
  }

  /// Custom exams allowed per calendar month; `None` means unlimited
  pub fn monthly_exam_limit(&self) -> Option<u32> {
    match self {
      Self::Free => Some(3),
      Self::Basic => Some(30),
      Self::Premium => None,
    }
  }

  pub fn has_feature(&self, feature: Feature) -> bool {
    match feature {
      Feature::CustomExams => true,
      Feature::OfficialExams => !matches!(self, Self::Free),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
  pub id: i64,
  pub user_id: i64,
  pub plan: Plan,
  pub started_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
  pub reference: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_free_plan_limits() {
    assert_eq!(Plan::Free.monthly_exam_limit(), Some(3));
    assert!(Plan::Free.has_feature(Feature::CustomExams));
    assert!(!Plan::Free.has_feature(Feature::OfficialExams));
  }

  #[test]
  fn test_premium_is_unlimited() {
    assert_eq!(Plan::Premium.monthly_exam_limit(), None);
    assert!(Plan::Premium.has_feature(Feature::OfficialExams));
  }

  #[test]
  fn test_plan_strings() {
    for plan in Plan::ALL {
      assert_eq!(Plan::from_str(plan.as_str()), Some(plan));
    }
  }
}
