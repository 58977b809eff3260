//! Question bank CRUD and queries

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, Result, Row};
use serde::Serialize;

use crate::domain::{content_hash, Difficulty, Question, QuestionKind};
use crate::selection::QuestionFilter;

use super::{optional, parse_timestamp};

/// Column list matching `row_to_question`
pub const QUESTION_COLUMNS: &str = "id, text, option1, option2, option3, option4, correct_option, \
  year, juz, surah_id, topic, difficulty, kind, is_active, created_at";

/// Validated question ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
  pub text: String,
  pub options: [String; 4],
  pub correct_option: u8,
  pub year: Option<i32>,
  pub juz: Option<u8>,
  pub surah_id: Option<u16>,
  pub topic: Option<String>,
  pub difficulty: Difficulty,
  pub kind: QuestionKind,
}

impl NewQuestion {
  pub fn content_hash(&self) -> String {
    content_hash(&self.text)
  }
}

/// Outcome of a bulk import
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
  pub inserted: usize,
  /// Rows skipped because the same question text already exists
  pub duplicates: usize,
}

pub fn row_to_question(row: &Row) -> Result<Question> {
  let difficulty: String = row.get(11)?;
  let kind: String = row.get(12)?;
  let created_at: String = row.get(14)?;
  Ok(Question {
    id: row.get(0)?,
    text: row.get(1)?,
    options: [row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?],
    correct_option: row.get(6)?,
    year: row.get(7)?,
    juz: row.get(8)?,
    surah_id: row.get(9)?,
    topic: row.get(10)?,
    difficulty: Difficulty::from_str(&difficulty).unwrap_or_default(),
    kind: QuestionKind::from_str(&kind).unwrap_or(QuestionKind::Memorization),
    is_active: row.get(13)?,
    created_at: parse_timestamp(&created_at),
  })
}

/// Insert a question. Returns `None` when a question with the same text already exists;
/// any other constraint violation is an error.
pub fn insert_question(conn: &Connection, question: &NewQuestion) -> Result<Option<i64>> {
  let changed = conn.execute(
    r#"
    INSERT INTO questions (text, option1, option2, option3, option4, correct_option,
                           year, juz, surah_id, topic, difficulty, kind, is_active,
                           content_hash, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 1, ?13, ?14)
    ON CONFLICT(content_hash) DO NOTHING
    "#,
    params![
      question.text.trim(),
      question.options[0].trim(),
      question.options[1].trim(),
      question.options[2].trim(),
      question.options[3].trim(),
      question.correct_option,
      question.year,
      question.juz,
      question.surah_id,
      question.topic,
      question.difficulty.as_str(),
      question.kind.as_str(),
      question.content_hash(),
      Utc::now().to_rfc3339(),
    ],
  )?;
  if changed == 0 {
    Ok(None)
  } else {
    Ok(Some(conn.last_insert_rowid()))
  }
}

/// Insert many questions in one transaction, skipping duplicates
pub fn insert_questions_bulk(conn: &Connection, questions: &[NewQuestion]) -> Result<ImportSummary> {
  let tx = conn.unchecked_transaction()?;
  let mut summary = ImportSummary::default();
  for question in questions {
    match insert_question(&tx, question)? {
      Some(_) => summary.inserted += 1,
      None => summary.duplicates += 1,
    }
  }
  tx.commit()?;
  tracing::info!(
    "Imported {} questions ({} duplicates skipped)",
    summary.inserted,
    summary.duplicates
  );
  Ok(summary)
}

pub fn get_question(conn: &Connection, id: i64) -> Result<Option<Question>> {
  let sql = format!("SELECT {} FROM questions WHERE id = ?1", QUESTION_COLUMNS);
  optional(conn.query_row(&sql, params![id], row_to_question))
}

/// Replace a question's content. Returns false if it does not exist.
pub fn update_question(conn: &Connection, id: i64, question: &NewQuestion) -> Result<bool> {
  let changed = conn.execute(
    r#"
    UPDATE questions
    SET text = ?1, option1 = ?2, option2 = ?3, option3 = ?4, option4 = ?5, correct_option = ?6,
        year = ?7, juz = ?8, surah_id = ?9, topic = ?10, difficulty = ?11, kind = ?12,
        content_hash = ?13
    WHERE id = ?14
    "#,
    params![
      question.text.trim(),
      question.options[0].trim(),
      question.options[1].trim(),
      question.options[2].trim(),
      question.options[3].trim(),
      question.correct_option,
      question.year,
      question.juz,
      question.surah_id,
      question.topic,
      question.difficulty.as_str(),
      question.kind.as_str(),
      question.content_hash(),
      id,
    ],
  )?;
  Ok(changed > 0)
}

/// Soft-(de)activate a question. Returns false if it does not exist.
pub fn set_question_active(conn: &Connection, id: i64, active: bool) -> Result<bool> {
  let changed = conn.execute(
    "UPDATE questions SET is_active = ?1 WHERE id = ?2",
    params![active, id],
  )?;
  Ok(changed > 0)
}

/// Page through questions matching a filter, newest first
pub fn list_questions(
  conn: &Connection,
  filter: &QuestionFilter,
  limit: i64,
  offset: i64,
) -> Result<Vec<Question>> {
  let (where_sql, mut values) = filter.to_sql();
  let sql = format!(
    "SELECT {} FROM questions WHERE {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
    QUESTION_COLUMNS, where_sql
  );
  values.push(limit.into());
  values.push(offset.into());
  let mut stmt = conn.prepare(&sql)?;
  stmt
    .query_map(params_from_iter(values), row_to_question)?
    .collect()
}

/// Load questions by id, preserving the order of `ids`
pub fn get_questions_by_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<Question>> {
  if ids.is_empty() {
    return Ok(vec![]);
  }
  let placeholders = vec!["?"; ids.len()].join(",");
  let sql = format!(
    "SELECT {} FROM questions WHERE id IN ({})",
    QUESTION_COLUMNS, placeholders
  );
  let mut stmt = conn.prepare(&sql)?;
  let mut found: Vec<Question> = stmt
    .query_map(params_from_iter(ids.iter()), row_to_question)?
    .collect::<Result<_>>()?;
  found.sort_by_key(|q| ids.iter().position(|id| *id == q.id));
  Ok(found)
}

/// Active question counts per kind for one juz (SEO pages)
pub fn count_active_by_juz(conn: &Connection, juz: u8) -> Result<(i64, i64)> {
  conn.query_row(
    r#"
    SELECT COALESCE(SUM(kind = 'memorization'), 0), COALESCE(SUM(kind = 'concepts'), 0)
    FROM questions WHERE juz = ?1 AND is_active = 1
    "#,
    params![juz],
    |row| Ok((row.get(0)?, row.get(1)?)),
  )
}

pub fn count_active_questions(conn: &Connection) -> Result<i64> {
  conn.query_row(
    "SELECT COUNT(*) FROM questions WHERE is_active = 1",
    [],
    |row| row.get(0),
  )
}

/// True if the error is a UNIQUE/CHECK constraint failure
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{sample_question, TestEnv};

  #[test]
  fn test_insert_and_get() {
    let env = TestEnv::new().unwrap();
    let id = insert_question(&env.conn, &sample_question("q1", 1, QuestionKind::Memorization))
      .unwrap()
      .unwrap();
    let q = get_question(&env.conn, id).unwrap().unwrap();
    assert_eq!(q.text, "q1");
    assert_eq!(q.juz, Some(1));
    assert_eq!(q.kind, QuestionKind::Memorization);
    assert!(q.is_active);
    assert!(get_question(&env.conn, id + 100).unwrap().is_none());
  }

  #[test]
  fn test_duplicate_insert_is_skipped() {
    let env = TestEnv::new().unwrap();
    let q = sample_question("same", 2, QuestionKind::Concepts);
    assert!(insert_question(&env.conn, &q).unwrap().is_some());
    assert!(insert_question(&env.conn, &q).unwrap().is_none());

    let summary =
      insert_questions_bulk(&env.conn, &[q.clone(), sample_question("other", 2, QuestionKind::Concepts)])
        .unwrap();
    assert_eq!(summary, ImportSummary { inserted: 1, duplicates: 1 });
  }

  #[test]
  fn test_same_text_with_other_options_is_duplicate() {
    let env = TestEnv::new().unwrap();
    let original = sample_question("Which surah opens the Quran?", 1, QuestionKind::Memorization);
    let mut reworded = original.clone();
    reworded.options[0] = "Al-Fatiha".into();
    reworded.text = format!("  {}  ", original.text);

    let summary = insert_questions_bulk(&env.conn, &[original, reworded]).unwrap();
    assert_eq!(summary, ImportSummary { inserted: 1, duplicates: 1 });
  }

  #[test]
  fn test_check_violation_is_not_counted_as_duplicate() {
    let env = TestEnv::new().unwrap();
    let mut bad = sample_question("juz out of range", 1, QuestionKind::Memorization);
    bad.juz = Some(31);
    let err = insert_question(&env.conn, &bad).unwrap_err();
    assert!(is_constraint_violation(&err));

    let ok = sample_question("fine", 1, QuestionKind::Memorization);
    assert!(insert_questions_bulk(&env.conn, &[ok, bad]).is_err());
    assert_eq!(count_active_questions(&env.conn).unwrap(), 0);
  }

  #[test]
  fn test_soft_deactivate_and_update() {
    let env = TestEnv::new().unwrap();
    let id = insert_question(&env.conn, &sample_question("old", 5, QuestionKind::Memorization))
      .unwrap()
      .unwrap();
    assert!(set_question_active(&env.conn, id, false).unwrap());
    assert!(!get_question(&env.conn, id).unwrap().unwrap().is_active);
    assert_eq!(count_active_questions(&env.conn).unwrap(), 0);

    let mut edited = sample_question("new text", 6, QuestionKind::Concepts);
    edited.correct_option = 4;
    assert!(update_question(&env.conn, id, &edited).unwrap());
    let q = get_question(&env.conn, id).unwrap().unwrap();
    assert_eq!(q.text, "new text");
    assert_eq!(q.correct_option, 4);
    assert_eq!(q.juz, Some(6));
    assert!(!update_question(&env.conn, 9999, &edited).unwrap());
  }

  #[test]
  fn test_update_into_duplicate_is_constraint_violation() {
    let env = TestEnv::new().unwrap();
    insert_question(&env.conn, &sample_question("a", 1, QuestionKind::Memorization)).unwrap();
    let b = insert_question(&env.conn, &sample_question("b", 1, QuestionKind::Memorization))
      .unwrap()
      .unwrap();
    let err = update_question(&env.conn, b, &sample_question("a", 1, QuestionKind::Memorization))
      .unwrap_err();
    assert!(is_constraint_violation(&err));
  }

  #[test]
  fn test_get_questions_by_ids_preserves_order() {
    let env = TestEnv::new().unwrap();
    let a = insert_question(&env.conn, &sample_question("a", 1, QuestionKind::Memorization))
      .unwrap()
      .unwrap();
    let b = insert_question(&env.conn, &sample_question("b", 1, QuestionKind::Memorization))
      .unwrap()
      .unwrap();
    let loaded = get_questions_by_ids(&env.conn, &[b, a]).unwrap();
    assert_eq!(loaded.iter().map(|q| q.id).collect::<Vec<_>>(), vec![b, a]);
  }

  #[test]
  fn test_count_active_by_juz() {
    let env = TestEnv::new().unwrap();
    insert_question(&env.conn, &sample_question("m", 7, QuestionKind::Memorization)).unwrap();
    insert_question(&env.conn, &sample_question("c1", 7, QuestionKind::Concepts)).unwrap();
    insert_question(&env.conn, &sample_question("c2", 7, QuestionKind::Concepts)).unwrap();
    insert_question(&env.conn, &sample_question("other", 8, QuestionKind::Concepts)).unwrap();
    assert_eq!(count_active_by_juz(&env.conn, 7).unwrap(), (1, 2));
    assert_eq!(count_active_by_juz(&env.conn, 30).unwrap(), (0, 0));
  }

  #[test]
  fn test_list_questions_pages() {
    let env = TestEnv::new().unwrap();
    for i in 0..5 {
      insert_question(&env.conn, &sample_question(&format!("q{}", i), 1, QuestionKind::Memorization))
        .unwrap();
    }
    let filter = QuestionFilter::active_only();
    let first = list_questions(&env.conn, &filter, 2, 0).unwrap();
    let rest = list_questions(&env.conn, &filter, 10, 2).unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(rest.len(), 3);
    // Newest first
    assert_eq!(first[0].text, "q4");
  }
}
