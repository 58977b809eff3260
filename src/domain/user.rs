use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Admin,
  Teacher,
  Institute,
  Student,
}

impl Role {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "admin" => Some(Self::Admin),
      "teacher" => Some(Self::Teacher),
      "institute" => Some(Self::Institute),
      "student" => Some(Self::Student),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Admin => "admin",
      Self::Teacher => "teacher",
      Self::Institute => "institute",
      Self::Student => "student",
    }
  }

  /// Teachers and institutes publish exams for their students
  pub fn can_publish(&self) -> bool {
    matches!(self, Self::Admin | Self::Teacher | Self::Institute)
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
  pub id: i64,
  pub username: String,
  pub role: Role,
  pub created_at: String,
  pub last_login_at: Option<String>,
}
