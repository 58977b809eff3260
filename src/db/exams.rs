//! Exams and their ordered question lists

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result, Row};

use crate::domain::{Exam, ExamKind, OfficialExamQuestion, QuestionKind};

use super::{optional, parse_timestamp};

const EXAM_COLUMNS: &str =
  "id, title, kind, created_by, spec, juz_start, juz_end, year, duration_minutes, is_published, created_at";

#[derive(Debug, Clone)]
pub struct NewExam {
  pub title: String,
  pub kind: ExamKind,
  pub created_by: i64,
  pub spec: Option<serde_json::Value>,
  pub juz_start: Option<u8>,
  pub juz_end: Option<u8>,
  pub year: Option<i32>,
  pub duration_minutes: u32,
}

fn row_to_exam(row: &Row) -> Result<Exam> {
  let kind: String = row.get(2)?;
  let spec: Option<String> = row.get(4)?;
  let created_at: String = row.get(10)?;
  Ok(Exam {
    id: row.get(0)?,
    title: row.get(1)?,
    kind: ExamKind::from_str(&kind),
    created_by: row.get(3)?,
    spec: spec.and_then(|s| serde_json::from_str(&s).ok()),
    juz_start: row.get(5)?,
    juz_end: row.get(6)?,
    year: row.get(7)?,
    duration_minutes: row.get(8)?,
    is_published: row.get(9)?,
    created_at: parse_timestamp(&created_at),
  })
}

pub fn create_exam(conn: &Connection, exam: &NewExam) -> Result<i64> {
  conn.execute(
    r#"
    INSERT INTO exams (title, kind, created_by, spec, juz_start, juz_end, year, duration_minutes,
                       is_published, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)
    "#,
    params![
      exam.title,
      exam.kind.as_str(),
      exam.created_by,
      exam.spec.as_ref().map(|s| s.to_string()),
      exam.juz_start,
      exam.juz_end,
      exam.year,
      exam.duration_minutes,
      Utc::now().to_rfc3339(),
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_exam(conn: &Connection, id: i64) -> Result<Option<Exam>> {
  let sql = format!("SELECT {} FROM exams WHERE id = ?1", EXAM_COLUMNS);
  optional(conn.query_row(&sql, params![id], row_to_exam))
}

/// Exams a user may see: their own plus every published exam
pub fn list_visible_exams(conn: &Connection, user_id: i64, limit: i64, offset: i64) -> Result<Vec<Exam>> {
  let sql = format!(
    "SELECT {} FROM exams WHERE created_by = ?1 OR is_published = 1 \
     ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3",
    EXAM_COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  stmt
    .query_map(params![user_id, limit, offset], row_to_exam)?
    .collect()
}

pub fn list_all_exams(conn: &Connection, limit: i64, offset: i64) -> Result<Vec<Exam>> {
  let sql = format!(
    "SELECT {} FROM exams ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
    EXAM_COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  stmt.query_map(params![limit, offset], row_to_exam)?.collect()
}

pub fn list_published_official(conn: &Connection) -> Result<Vec<Exam>> {
  let sql = format!(
    "SELECT {} FROM exams WHERE kind = 'official' AND is_published = 1 ORDER BY year DESC, id DESC",
    EXAM_COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  stmt.query_map([], row_to_exam)?.collect()
}

pub fn set_exam_published(conn: &Connection, id: i64, published: bool) -> Result<bool> {
  let changed = conn.execute(
    "UPDATE exams SET is_published = ?1 WHERE id = ?2",
    params![published, id],
  )?;
  Ok(changed > 0)
}

/// Delete an exam with its structure and attempts
pub fn delete_exam(conn: &Connection, id: i64) -> Result<bool> {
  let tx = conn.unchecked_transaction()?;
  tx.execute(
    "DELETE FROM attempt_answers WHERE attempt_id IN (SELECT id FROM attempts WHERE exam_id = ?1)",
    params![id],
  )?;
  tx.execute("DELETE FROM attempts WHERE exam_id = ?1", params![id])?;
  delete_exam_questions(&tx, id)?;
  let changed = tx.execute("DELETE FROM exams WHERE id = ?1", params![id])?;
  tx.commit()?;
  Ok(changed > 0)
}

pub fn delete_exam_questions(conn: &Connection, exam_id: i64) -> Result<usize> {
  conn.execute("DELETE FROM exam_questions WHERE exam_id = ?1", params![exam_id])
}

/// Insert structure rows as one batch
pub fn insert_exam_questions(conn: &Connection, rows: &[OfficialExamQuestion]) -> Result<()> {
  let mut stmt = conn.prepare(
    "INSERT INTO exam_questions (exam_id, question_id, position, juz, kind) VALUES (?1, ?2, ?3, ?4, ?5)",
  )?;
  for row in rows {
    stmt.execute(params![
      row.exam_id,
      row.question_id,
      row.position,
      row.juz,
      row.kind.map(|k| k.as_str()),
    ])?;
  }
  Ok(())
}

pub fn get_exam_structure(conn: &Connection, exam_id: i64) -> Result<Vec<OfficialExamQuestion>> {
  let mut stmt = conn.prepare(
    "SELECT exam_id, question_id, position, juz, kind FROM exam_questions WHERE exam_id = ?1 ORDER BY position",
  )?;
  stmt
    .query_map(params![exam_id], |row| {
      let kind: Option<String> = row.get(4)?;
      Ok(OfficialExamQuestion {
        exam_id: row.get(0)?,
        question_id: row.get(1)?,
        position: row.get(2)?,
        juz: row.get(3)?,
        kind: kind.as_deref().and_then(QuestionKind::from_str),
      })
    })?
    .collect()
}

/// Custom exams a user created since `since` (quota accounting)
pub fn count_custom_exams_since(conn: &Connection, user_id: i64, since: DateTime<Utc>) -> Result<u32> {
  conn.query_row(
    "SELECT COUNT(*) FROM exams WHERE created_by = ?1 AND kind = 'custom' AND created_at >= ?2",
    params![user_id, since.to_rfc3339()],
    |row| row.get(0),
  )
}

pub fn count_exams_created_by(conn: &Connection, user_id: i64) -> Result<i64> {
  conn.query_row(
    "SELECT COUNT(*) FROM exams WHERE created_by = ?1",
    params![user_id],
    |row| row.get(0),
  )
}

pub fn count_exams(conn: &Connection) -> Result<i64> {
  conn.query_row("SELECT COUNT(*) FROM exams", [], |row| row.get(0))
}
