//! Exam attempts and recorded answers

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result, Row};

use crate::domain::{Attempt, AttemptStatus};

use super::{optional, parse_timestamp};

const ATTEMPT_COLUMNS: &str =
  "id, exam_id, user_id, started_at, deadline_at, submitted_at, status, correct, total, score";

/// One graded answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
  pub question_id: i64,
  pub selected_option: Option<u8>,
  pub is_correct: bool,
}

fn row_to_attempt(row: &Row) -> Result<Attempt> {
  let started_at: String = row.get(3)?;
  let deadline_at: String = row.get(4)?;
  let submitted_at: Option<String> = row.get(5)?;
  let status: String = row.get(6)?;
  Ok(Attempt {
    id: row.get(0)?,
    exam_id: row.get(1)?,
    user_id: row.get(2)?,
    started_at: parse_timestamp(&started_at),
    deadline_at: parse_timestamp(&deadline_at),
    submitted_at: submitted_at.as_deref().map(parse_timestamp),
    status: AttemptStatus::from_str(&status),
    correct: row.get(7)?,
    total: row.get(8)?,
    score: row.get(9)?,
  })
}

pub fn create_attempt(
  conn: &Connection,
  exam_id: i64,
  user_id: i64,
  started_at: DateTime<Utc>,
  deadline_at: DateTime<Utc>,
  total: u32,
) -> Result<i64> {
  conn.execute(
    r#"
    INSERT INTO attempts (exam_id, user_id, started_at, deadline_at, status, total)
    VALUES (?1, ?2, ?3, ?4, 'in_progress', ?5)
    "#,
    params![exam_id, user_id, started_at.to_rfc3339(), deadline_at.to_rfc3339(), total],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_attempt(conn: &Connection, id: i64) -> Result<Option<Attempt>> {
  let sql = format!("SELECT {} FROM attempts WHERE id = ?1", ATTEMPT_COLUMNS);
  optional(conn.query_row(&sql, params![id], row_to_attempt))
}

/// Close an attempt and store its graded answers atomically
pub fn finalize_attempt(
  conn: &Connection,
  attempt_id: i64,
  status: AttemptStatus,
  correct: u32,
  total: u32,
  score: f64,
  answers: &[AnswerRecord],
) -> Result<()> {
  let tx = conn.unchecked_transaction()?;
  tx.execute(
    r#"
    UPDATE attempts SET status = ?1, correct = ?2, total = ?3, score = ?4, submitted_at = ?5
    WHERE id = ?6
    "#,
    params![status.as_str(), correct, total, score, Utc::now().to_rfc3339(), attempt_id],
  )?;
  {
    let mut stmt = tx.prepare(
      "INSERT OR REPLACE INTO attempt_answers (attempt_id, question_id, selected_option, is_correct) \
       VALUES (?1, ?2, ?3, ?4)",
    )?;
    for answer in answers {
      stmt.execute(params![attempt_id, answer.question_id, answer.selected_option, answer.is_correct])?;
    }
  }
  tx.commit()
}

pub fn get_attempt_answers(conn: &Connection, attempt_id: i64) -> Result<Vec<AnswerRecord>> {
  let mut stmt = conn.prepare(
    "SELECT question_id, selected_option, is_correct FROM attempt_answers WHERE attempt_id = ?1",
  )?;
  stmt
    .query_map(params![attempt_id], |row| {
      Ok(AnswerRecord {
        question_id: row.get(0)?,
        selected_option: row.get(1)?,
        is_correct: row.get(2)?,
      })
    })?
    .collect()
}

pub fn list_user_attempts(conn: &Connection, user_id: i64, limit: i64) -> Result<Vec<Attempt>> {
  let sql = format!(
    "SELECT {} FROM attempts WHERE user_id = ?1 ORDER BY started_at DESC, id DESC LIMIT ?2",
    ATTEMPT_COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  stmt.query_map(params![user_id, limit], row_to_attempt)?.collect()
}

/// Attempts taken on one exam (for its creator)
pub fn list_exam_attempts(conn: &Connection, exam_id: i64) -> Result<Vec<Attempt>> {
  let sql = format!(
    "SELECT {} FROM attempts WHERE exam_id = ?1 ORDER BY started_at DESC, id DESC",
    ATTEMPT_COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  stmt.query_map(params![exam_id], row_to_attempt)?.collect()
}

/// (attempt count, average score) over a user's submitted attempts
pub fn user_attempt_stats(conn: &Connection, user_id: i64) -> Result<(i64, f64)> {
  conn.query_row(
    "SELECT COUNT(*), COALESCE(AVG(score), 0) FROM attempts WHERE user_id = ?1 AND status = 'submitted'",
    params![user_id],
    |row| Ok((row.get(0)?, row.get(1)?)),
  )
}

/// (attempt count, average score) over submitted attempts on exams a user created
pub fn creator_attempt_stats(conn: &Connection, creator_id: i64) -> Result<(i64, f64)> {
  conn.query_row(
    r#"
    SELECT COUNT(*), COALESCE(AVG(a.score), 0)
    FROM attempts a JOIN exams e ON a.exam_id = e.id
    WHERE e.created_by = ?1 AND a.status = 'submitted'
    "#,
    params![creator_id],
    |row| Ok((row.get(0)?, row.get(1)?)),
  )
}

pub fn count_attempts(conn: &Connection) -> Result<i64> {
  conn.query_row("SELECT COUNT(*) FROM attempts", [], |row| row.get(0))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::{create_exam, NewExam};
  use crate::domain::{ExamKind, Role};
  use crate::testing::TestEnv;

  fn exam(env: &TestEnv, creator: i64) -> i64 {
    create_exam(
      &env.conn,
      &NewExam {
        title: "t".into(),
        kind: ExamKind::Custom,
        created_by: creator,
        spec: None,
        juz_start: None,
        juz_end: None,
        year: None,
        duration_minutes: 10,
      },
    )
    .unwrap()
  }

  #[test]
  fn test_attempt_lifecycle() {
    let env = TestEnv::new().unwrap();
    let teacher = env.user("teacher", Role::Teacher);
    let student = env.user("student", Role::Student);
    let exam_id = exam(&env, teacher);
    let now = Utc::now();
    let id = create_attempt(&env.conn, exam_id, student, now, now + chrono::Duration::minutes(10), 2).unwrap();

    let attempt = get_attempt(&env.conn, id).unwrap().unwrap();
    assert_eq!(attempt.status, AttemptStatus::InProgress);
    assert!(attempt.submitted_at.is_none());

    let answers = vec![
      AnswerRecord { question_id: 1, selected_option: Some(2), is_correct: true },
      AnswerRecord { question_id: 2, selected_option: None, is_correct: false },
    ];
    finalize_attempt(&env.conn, id, AttemptStatus::Submitted, 1, 2, 50.0, &answers).unwrap();

    let attempt = get_attempt(&env.conn, id).unwrap().unwrap();
    assert_eq!(attempt.status, AttemptStatus::Submitted);
    assert_eq!((attempt.correct, attempt.total), (1, 2));
    assert!(attempt.submitted_at.is_some());

    let mut stored = get_attempt_answers(&env.conn, id).unwrap();
    stored.sort_by_key(|a| a.question_id);
    assert_eq!(stored, answers);

    assert_eq!(user_attempt_stats(&env.conn, student).unwrap(), (1, 50.0));
    assert_eq!(creator_attempt_stats(&env.conn, teacher).unwrap(), (1, 50.0));
    assert_eq!(list_exam_attempts(&env.conn, exam_id).unwrap().len(), 1);
  }

  #[test]
  fn test_stats_ignore_unfinished() {
    let env = TestEnv::new().unwrap();
    let user = env.user("u", Role::Student);
    let exam_id = exam(&env, user);
    let now = Utc::now();
    create_attempt(&env.conn, exam_id, user, now, now, 5).unwrap();
    assert_eq!(user_attempt_stats(&env.conn, user).unwrap(), (0, 0.0));
    assert_eq!(list_user_attempts(&env.conn, user, 10).unwrap().len(), 1);
  }
}
