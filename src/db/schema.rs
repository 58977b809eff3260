//! Version-gated schema migrations.
//!
//! Each migration checks the recorded version, runs inside a transaction,
//! and records its version in `db_version`. New databases run every step
//! once; existing databases only run the steps they are missing.

use chrono::Utc;
use rusqlite::{params, Connection, Result};

/// Current schema version.
/// Increment this when adding a new migration
pub const DB_VERSION: i32 = 5;

pub fn run_migrations(conn: &Connection) -> Result<()> {
  // Bootstrap: ensure db_version table exists (needed to check version)
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS db_version (
      version INTEGER PRIMARY KEY,
      applied_at TEXT NOT NULL,
      description TEXT
    );
    "#,
  )?;

  let current_version = get_schema_version(conn)?;
  tracing::debug!("exams.db schema version: {}", current_version);

  let migrations: [(i32, &str, &str); 5] = [
    (1, "Create users, sessions and question bank", V1_BASE),
    (2, "Add exams and exam question structure", V2_EXAMS),
    (3, "Add attempts and answers", V3_ATTEMPTS),
    (4, "Add subscriptions", V4_SUBSCRIPTIONS),
    (5, "Add support tickets", V5_TICKETS),
  ];

  for (version, description, sql) in migrations {
    if current_version < version {
      tracing::info!("Running migration v{}→v{}: {}", version - 1, version, description);
      let tx = conn.unchecked_transaction()?;
      tx.execute_batch(sql)?;
      record_version(&tx, version, description)?;
      tx.commit()?;
    }
  }

  Ok(())
}

const V1_BASE: &str = r#"
  CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'student',
    created_at TEXT NOT NULL,
    last_login_at TEXT
  );

  CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    last_access_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
  );

  CREATE TABLE IF NOT EXISTS questions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    option1 TEXT NOT NULL,
    option2 TEXT NOT NULL,
    option3 TEXT NOT NULL,
    option4 TEXT NOT NULL,
    correct_option INTEGER NOT NULL CHECK (correct_option BETWEEN 1 AND 4),
    year INTEGER,
    juz INTEGER CHECK (juz IS NULL OR juz BETWEEN 1 AND 30),
    surah_id INTEGER CHECK (surah_id IS NULL OR surah_id BETWEEN 1 AND 114),
    topic TEXT,
    difficulty TEXT NOT NULL DEFAULT 'medium',
    kind TEXT NOT NULL DEFAULT 'memorization',
    is_active INTEGER NOT NULL DEFAULT 1,
    content_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
  );

  CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
  CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
  CREATE UNIQUE INDEX IF NOT EXISTS idx_questions_content_hash ON questions(content_hash);
  CREATE INDEX IF NOT EXISTS idx_questions_juz_kind ON questions(juz, kind, year);
  CREATE INDEX IF NOT EXISTS idx_questions_surah ON questions(surah_id);
  CREATE INDEX IF NOT EXISTS idx_questions_created ON questions(created_at);
"#;

const V2_EXAMS: &str = r#"
  CREATE TABLE IF NOT EXISTS exams (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    kind TEXT NOT NULL,
    created_by INTEGER NOT NULL,
    spec TEXT,
    juz_start INTEGER,
    juz_end INTEGER,
    year INTEGER,
    duration_minutes INTEGER NOT NULL,
    is_published INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    FOREIGN KEY (created_by) REFERENCES users(id)
  );

  CREATE TABLE IF NOT EXISTS exam_questions (
    exam_id INTEGER NOT NULL,
    question_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    juz INTEGER,
    kind TEXT,
    PRIMARY KEY (exam_id, position),
    FOREIGN KEY (exam_id) REFERENCES exams(id) ON DELETE CASCADE,
    FOREIGN KEY (question_id) REFERENCES questions(id)
  );

  CREATE INDEX IF NOT EXISTS idx_exams_created_by ON exams(created_by, created_at);
  CREATE INDEX IF NOT EXISTS idx_exam_questions_question ON exam_questions(question_id);
"#;

const V3_ATTEMPTS: &str = r#"
  CREATE TABLE IF NOT EXISTS attempts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    exam_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    started_at TEXT NOT NULL,
    deadline_at TEXT NOT NULL,
    submitted_at TEXT,
    status TEXT NOT NULL DEFAULT 'in_progress',
    correct INTEGER NOT NULL DEFAULT 0,
    total INTEGER NOT NULL DEFAULT 0,
    score REAL NOT NULL DEFAULT 0,
    FOREIGN KEY (exam_id) REFERENCES exams(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
  );

  CREATE TABLE IF NOT EXISTS attempt_answers (
    attempt_id INTEGER NOT NULL,
    question_id INTEGER NOT NULL,
    selected_option INTEGER,
    is_correct INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (attempt_id, question_id),
    FOREIGN KEY (attempt_id) REFERENCES attempts(id) ON DELETE CASCADE
  );

  CREATE INDEX IF NOT EXISTS idx_attempts_user ON attempts(user_id, started_at);
  CREATE INDEX IF NOT EXISTS idx_attempts_exam ON attempts(exam_id);
"#;

const V4_SUBSCRIPTIONS: &str = r#"
  CREATE TABLE IF NOT EXISTS subscriptions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    plan TEXT NOT NULL,
    started_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    reference TEXT,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
  );

  CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id, expires_at);
"#;

const V5_TICKETS: &str = r#"
  CREATE TABLE IF NOT EXISTS tickets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    subject TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'open',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
  );

  CREATE TABLE IF NOT EXISTS ticket_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_id INTEGER NOT NULL,
    author_id INTEGER NOT NULL,
    is_staff INTEGER NOT NULL DEFAULT 0,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (ticket_id) REFERENCES tickets(id) ON DELETE CASCADE
  );

  CREATE INDEX IF NOT EXISTS idx_tickets_user ON tickets(user_id);
  CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);
  CREATE INDEX IF NOT EXISTS idx_ticket_messages_ticket ON ticket_messages(ticket_id);
"#;

fn record_version(conn: &Connection, version: i32, description: &str) -> Result<()> {
  let now = Utc::now().to_rfc3339();
  conn.execute(
    "INSERT INTO db_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
    params![version, now, description],
  )?;
  tracing::info!("Recorded schema version {} - {}", version, description);
  Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<i32> {
  conn.query_row(
    "SELECT COALESCE(MAX(version), 0) FROM db_version",
    [],
    |row| row.get(0),
  )
}
