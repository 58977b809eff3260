//! Subscription records

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, Result};

use crate::domain::{Plan, Subscription};

use super::{optional, parse_timestamp};

pub fn create_subscription(
  conn: &Connection,
  user_id: i64,
  plan: Plan,
  days: i64,
  reference: Option<&str>,
) -> Result<i64> {
  let now = Utc::now();
  conn.execute(
    "INSERT INTO subscriptions (user_id, plan, started_at, expires_at, reference) VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      user_id,
      plan.as_str(),
      now.to_rfc3339(),
      (now + Duration::days(days)).to_rfc3339(),
      reference,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

/// Latest subscription still valid at `now`
pub fn get_active_subscription(
  conn: &Connection,
  user_id: i64,
  now: DateTime<Utc>,
) -> Result<Option<Subscription>> {
  optional(conn.query_row(
    r#"
    SELECT id, user_id, plan, started_at, expires_at, reference
    FROM subscriptions
    WHERE user_id = ?1 AND expires_at > ?2
    ORDER BY expires_at DESC, id DESC
    LIMIT 1
    "#,
    params![user_id, now.to_rfc3339()],
    |row| {
      let plan: String = row.get(2)?;
      let started_at: String = row.get(3)?;
      let expires_at: String = row.get(4)?;
      Ok(Subscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        plan: Plan::from_str(&plan).unwrap_or(Plan::Free),
        started_at: parse_timestamp(&started_at),
        expires_at: parse_timestamp(&expires_at),
        reference: row.get(5)?,
      })
    },
  ))
}
