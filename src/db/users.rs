//! Users and login sessions

use chrono::{Duration, Utc};
use rusqlite::{params, Connection, Result};

use crate::domain::{Role, UserInfo};

use super::optional;

/// Row needed to verify a login
#[derive(Debug, Clone)]
pub struct UserCredentials {
  pub id: i64,
  pub username: String,
  pub password_hash: String,
  pub role: Role,
}

/// Identity resolved from a session id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
  pub user_id: i64,
  pub username: String,
  pub role: Role,
}

fn role_or_student(value: String) -> Role {
  Role::from_str(&value).unwrap_or(Role::Student)
}

pub fn create_user(conn: &Connection, username: &str, password_hash: &str, role: Role) -> Result<i64> {
  conn.execute(
    "INSERT INTO users (username, password_hash, role, created_at) VALUES (?1, ?2, ?3, ?4)",
    params![username, password_hash, role.as_str(), Utc::now().to_rfc3339()],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_user_credentials(conn: &Connection, username: &str) -> Result<Option<UserCredentials>> {
  optional(conn.query_row(
    "SELECT id, username, password_hash, role FROM users WHERE username = ?1",
    params![username],
    |row| {
      Ok(UserCredentials {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role: role_or_student(row.get(3)?),
      })
    },
  ))
}

pub fn username_exists(conn: &Connection, username: &str) -> Result<bool> {
  let count: i64 = conn.query_row(
    "SELECT COUNT(*) FROM users WHERE username = ?1",
    params![username],
    |row| row.get(0),
  )?;
  Ok(count > 0)
}

pub fn get_user_count(conn: &Connection) -> Result<i64> {
  conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
}

pub fn get_user_by_id(conn: &Connection, user_id: i64) -> Result<Option<UserInfo>> {
  optional(conn.query_row(
    "SELECT id, username, role, created_at, last_login_at FROM users WHERE id = ?1",
    params![user_id],
    |row| {
      Ok(UserInfo {
        id: row.get(0)?,
        username: row.get(1)?,
        role: role_or_student(row.get(2)?),
        created_at: row.get(3)?,
        last_login_at: row.get(4)?,
      })
    },
  ))
}

pub fn list_users(conn: &Connection, limit: i64, offset: i64) -> Result<Vec<UserInfo>> {
  let mut stmt = conn.prepare(
    "SELECT id, username, role, created_at, last_login_at FROM users ORDER BY id LIMIT ?1 OFFSET ?2",
  )?;
  stmt
    .query_map(params![limit, offset], |row| {
      Ok(UserInfo {
        id: row.get(0)?,
        username: row.get(1)?,
        role: role_or_student(row.get(2)?),
        created_at: row.get(3)?,
        last_login_at: row.get(4)?,
      })
    })?
    .collect()
}

pub fn set_user_role(conn: &Connection, user_id: i64, role: Role) -> Result<bool> {
  let changed = conn.execute(
    "UPDATE users SET role = ?1 WHERE id = ?2",
    params![role.as_str(), user_id],
  )?;
  Ok(changed > 0)
}

pub fn update_last_login(conn: &Connection, user_id: i64) -> Result<()> {
  conn.execute(
    "UPDATE users SET last_login_at = ?1 WHERE id = ?2",
    params![Utc::now().to_rfc3339(), user_id],
  )?;
  Ok(())
}

pub fn create_session(conn: &Connection, user_id: i64, session_id: &str, duration_hours: i64) -> Result<()> {
  let now = Utc::now();
  let expires = now + Duration::hours(duration_hours);
  conn.execute(
    "INSERT INTO sessions (id, user_id, created_at, expires_at, last_access_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      session_id,
      user_id,
      now.to_rfc3339(),
      expires.to_rfc3339(),
      now.to_rfc3339()
    ],
  )?;
  Ok(())
}

/// Resolve an unexpired session and touch its last access time
pub fn get_session_user(conn: &Connection, session_id: &str) -> Result<Option<SessionUser>> {
  let now = Utc::now().to_rfc3339();
  let user = optional(conn.query_row(
    r#"
    SELECT u.id, u.username, u.role
    FROM sessions s
    JOIN users u ON s.user_id = u.id
    WHERE s.id = ?1 AND s.expires_at > ?2
    "#,
    params![session_id, now],
    |row| {
      Ok(SessionUser {
        user_id: row.get(0)?,
        username: row.get(1)?,
        role: role_or_student(row.get(2)?),
      })
    },
  ))?;

  if user.is_some() {
    if let Err(e) = conn.execute(
      "UPDATE sessions SET last_access_at = ?1 WHERE id = ?2",
      params![now, session_id],
    ) {
      tracing::warn!("Failed to touch session: {}", e);
    }
  }
  Ok(user)
}

pub fn delete_session(conn: &Connection, session_id: &str) -> Result<()> {
  conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
  Ok(())
}

pub fn cleanup_expired_sessions(conn: &Connection) -> Result<usize> {
  conn.execute(
    "DELETE FROM sessions WHERE expires_at <= ?1",
    params![Utc::now().to_rfc3339()],
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::TestEnv;

  #[test]
  fn test_username_is_case_insensitive() {
    let env = TestEnv::new().unwrap();
    create_user(&env.conn, "Fatemeh", "h", Role::Student).unwrap();
    assert!(username_exists(&env.conn, "fatemeh").unwrap());
    assert!(create_user(&env.conn, "FATEMEH", "h", Role::Student).is_err());
    let creds = get_user_credentials(&env.conn, "fatemeh").unwrap().unwrap();
    assert_eq!(creds.username, "Fatemeh");
    assert_eq!(creds.role, Role::Student);
  }

  #[test]
  fn test_session_lifecycle() {
    let env = TestEnv::new().unwrap();
    let id = env.user("ali", Role::Teacher);
    create_session(&env.conn, id, "sess-1", 1).unwrap();
    let user = get_session_user(&env.conn, "sess-1").unwrap().unwrap();
    assert_eq!(user, SessionUser { user_id: id, username: "ali".into(), role: Role::Teacher });

    delete_session(&env.conn, "sess-1").unwrap();
    assert!(get_session_user(&env.conn, "sess-1").unwrap().is_none());
  }

  #[test]
  fn test_expired_session_rejected_and_cleaned() {
    let env = TestEnv::new().unwrap();
    let id = env.user("old", Role::Student);
    create_session(&env.conn, id, "stale", -1).unwrap();
    assert!(get_session_user(&env.conn, "stale").unwrap().is_none());
    assert_eq!(cleanup_expired_sessions(&env.conn).unwrap(), 1);
  }

  #[test]
  fn test_set_role() {
    let env = TestEnv::new().unwrap();
    let id = env.user("inst", Role::Student);
    assert!(set_user_role(&env.conn, id, Role::Institute).unwrap());
    assert_eq!(get_user_by_id(&env.conn, id).unwrap().unwrap().role, Role::Institute);
    assert!(!set_user_role(&env.conn, 999, Role::Admin).unwrap());
  }
}
