use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
  Open,
  Answered,
  Closed,
}

impl TicketStatus {
  pub fn from_str(s: &str) -> Self {
    match s {
      "answered" => Self::Answered,
      "closed" => Self::Closed,
      _ => Self::Open,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Open => "open",
      Self::Answered => "answered",
      Self::Closed => "closed",
    }
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
  pub id: i64,
  pub user_id: i64,
  pub subject: String,
  pub status: TicketStatus,
  pub created_at: String,
  pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketMessage {
  pub id: i64,
  pub ticket_id: i64,
  pub author_id: i64,
  pub is_staff: bool,
  pub body: String,
  pub created_at: String,
}
