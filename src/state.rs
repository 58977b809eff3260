//! Application state passed to all handlers.

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::db::DbPool;

#[derive(Clone)]
pub struct AppState {
    /// Shared database (questions, exams, users, sessions)
    pub db: DbPool,
}

impl AppState {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Wrap an already-migrated connection (tests, tools)
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }
}
