//! Official exam structure: a fixed quota of questions per juz.
//!
//! Every juz in the range contributes `MEMORIZATION_PER_UNIT` memorization
//! and `CONCEPTS_PER_UNIT` concept questions for the exam's year. The old
//! structure is deleted before selection starts and the new rows are
//! inserted in one batch only after every unit is satisfied, so a shortage
//! leaves the exam with no structure rather than a partial one.

use rusqlite::Connection;
use thiserror::Error;

use crate::config::{CONCEPTS_PER_UNIT, MEMORIZATION_PER_UNIT};
use crate::db;
use crate::domain::{OfficialExamQuestion, QuestionKind};

use super::{fetch_newest, normalize_range, QuestionFilter};

#[derive(Error, Debug)]
pub enum StructureError {
  #[error(
    "Not enough source questions for juz {juz}: need {needed} {} questions, found {found}",
    .kind.as_str()
  )]
  NotEnoughQuestions {
    juz: u8,
    kind: QuestionKind,
    needed: usize,
    found: usize,
  },

  #[error(transparent)]
  Database(#[from] rusqlite::Error),
}

/// Per-unit quota in insertion order
const UNIT_QUOTA: [(QuestionKind, usize); 2] = [
  (QuestionKind::Memorization, MEMORIZATION_PER_UNIT),
  (QuestionKind::Concepts, CONCEPTS_PER_UNIT),
];

/// Choose the questions for every juz in `[start, end]` without writing anything.
pub fn select_structure(
  conn: &Connection,
  exam_id: i64,
  juz_start: u8,
  juz_end: u8,
  year: Option<i32>,
) -> Result<Vec<OfficialExamQuestion>, StructureError> {
  let (start, end) = normalize_range(juz_start, juz_end);
  let mut rows = Vec::with_capacity(
    (end as usize - start as usize + 1) * (MEMORIZATION_PER_UNIT + CONCEPTS_PER_UNIT),
  );
  let mut position = 0u32;

  for juz in start..=end {
    for (kind, needed) in UNIT_QUOTA {
      let picked = fetch_newest(conn, &QuestionFilter::for_unit(juz, year, kind), needed as u64)?;
      if picked.len() < needed {
        return Err(StructureError::NotEnoughQuestions {
          juz,
          kind,
          needed,
          found: picked.len(),
        });
      }
      for question in picked {
        position += 1;
        rows.push(OfficialExamQuestion {
          exam_id,
          question_id: question.id,
          position,
          juz: Some(juz),
          kind: Some(kind),
        });
      }
    }
  }

  Ok(rows)
}

/// Rebuild an official exam's structure, all or nothing.
pub fn build_official_structure(
  conn: &Connection,
  exam_id: i64,
  juz_start: u8,
  juz_end: u8,
  year: Option<i32>,
) -> Result<Vec<OfficialExamQuestion>, StructureError> {
  let tx = conn.unchecked_transaction()?;
  let removed = db::delete_exam_questions(&tx, exam_id)?;
  tracing::debug!("Cleared {} structure rows for exam {}", removed, exam_id);

  match select_structure(&tx, exam_id, juz_start, juz_end, year) {
    Ok(rows) => {
      db::insert_exam_questions(&tx, &rows)?;
      tx.commit()?;
      tracing::info!("Built official exam {} with {} questions", exam_id, rows.len());
      Ok(rows)
    }
    Err(e) => {
      // The deletion stands: the exam is left without structure
      tx.commit()?;
      tracing::warn!("Official exam {} structure build failed: {}", exam_id, e);
      Err(e)
    }
  }
}
