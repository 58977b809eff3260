pub mod attempts;
pub mod exams;
pub mod questions;
pub mod schema;
pub mod subscriptions;
pub mod tickets;
pub mod users;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// Re-export all public items from submodules
pub use attempts::*;
pub use exams::*;
pub use questions::*;
pub use schema::run_migrations;
pub use subscriptions::*;
pub use tickets::*;
pub use users::*;

pub type DbPool = Arc<Mutex<Connection>>;

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
  /// Log the error at warn level and return None
  fn log_warn(self, context: &str) -> Option<T>;
  /// Log the error at warn level and return the default
  fn log_warn_default(self, context: &str) -> T
  where
    T: Default;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
  fn log_warn(self, context: &str) -> Option<T> {
    match self {
      Ok(v) => Some(v),
      Err(e) => {
        tracing::warn!("{}: {}", context, e);
        None
      }
    }
  }

  fn log_warn_default(self, context: &str) -> T
  where
    T: Default,
  {
    match self {
      Ok(v) => v,
      Err(e) => {
        tracing::warn!("{}: {}", context, e);
        T::default()
      }
    }
  }
}

/// Error returned when database lock cannot be acquired
#[derive(Debug)]
pub struct DbLockError;

impl std::fmt::Display for DbLockError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Database unavailable")
  }
}

impl std::error::Error for DbLockError {}

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> std::result::Result<MutexGuard<'_, Connection>, DbLockError> {
  pool.lock().map_err(|_: PoisonError<_>| {
    tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
    DbLockError
  })
}

/// Open (creating if needed) and migrate the database at `path`
pub fn init_db(path: &Path) -> Result<DbPool> {
  if let Some(parent) = path.parent() {
    if let Err(e) = std::fs::create_dir_all(parent) {
      tracing::warn!("Could not create database directory {}: {}", parent.display(), e);
    }
  }

  let conn = Connection::open(path)?;
  conn.execute_batch("PRAGMA foreign_keys = ON;")?;
  run_migrations(&conn)?;
  Ok(Arc::new(Mutex::new(conn)))
}

/// Parse an RFC 3339 column value, falling back to now for legacy garbage
pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
  DateTime::parse_from_rfc3339(value)
    .map(|dt| dt.with_timezone(&Utc))
    .unwrap_or_else(|_| Utc::now())
}

/// Map a missing row to `None`
pub(crate) fn optional<T>(result: Result<T>) -> Result<Option<T>> {
  match result {
    Ok(value) => Ok(Some(value)),
    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
    Err(e) => Err(e),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_init_db_creates_parent_and_migrates() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("nested").join("exams.db");
    let pool = init_db(&path).unwrap();
    let conn = try_lock(&pool).unwrap();
    assert_eq!(schema::get_schema_version(&conn).unwrap(), schema::DB_VERSION);
  }

  #[test]
  fn test_log_warn_default() {
    let failed: std::result::Result<i64, String> = Err("nope".into());
    assert_eq!(failed.log_warn_default("count"), 0);
    let ok: std::result::Result<i64, String> = Ok(7);
    assert_eq!(ok.log_warn("count"), Some(7));
  }

  #[test]
  fn test_parse_timestamp_round_trip() {
    let now = Utc::now();
    let parsed = parse_timestamp(&now.to_rfc3339());
    assert_eq!(parsed.timestamp(), now.timestamp());
  }
}
