//! Test utilities for database setup.
//!
//! Reuses the authoritative migrations so tests never carry their own
//! copy of the schema.

use rusqlite::Connection;
use std::path::Path;
use tempfile::TempDir;

use crate::db::NewQuestion;
use crate::domain::{Difficulty, QuestionKind, Role};

/// Migrated database in a temporary directory, removed on drop.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    /// Connection with the full schema (all migrations)
    pub conn: Connection,
}

impl TestEnv {
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let conn = Connection::open(temp.path().join("exams.db"))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        crate::db::run_migrations(&conn)?;

        Ok(Self { temp, conn })
    }

    /// Get the temporary directory path for creating test files.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Create a user with the given role, returning its id
    pub fn user(&self, username: &str, role: Role) -> i64 {
        crate::db::create_user(&self.conn, username, "not-a-real-hash", role)
            .expect("create test user")
    }
}

/// Question with distinct options so content hashes differ per text
pub fn sample_question(text: &str, juz: u8, kind: QuestionKind) -> NewQuestion {
    NewQuestion {
        text: text.to_string(),
        options: [
            format!("{text} A"),
            format!("{text} B"),
            format!("{text} C"),
            format!("{text} D"),
        ],
        correct_option: 2,
        year: Some(1404),
        juz: Some(juz),
        surah_id: None,
        topic: None,
        difficulty: Difficulty::Medium,
        kind,
    }
}

/// Seed `memorization` + `concepts` questions for one juz and year
pub fn seed_unit(conn: &Connection, juz: u8, year: i32, memorization: usize, concepts: usize) {
    let batches = [
        (QuestionKind::Memorization, memorization),
        (QuestionKind::Concepts, concepts),
    ];
    for (kind, count) in batches {
        for i in 0..count {
            let mut q = sample_question(&format!("juz{juz}-{year}-{}-{i}", kind.as_str()), juz, kind);
            q.year = Some(year);
            crate::db::insert_question(conn, &q).expect("seed question");
        }
    }
}
