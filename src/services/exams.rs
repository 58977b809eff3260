//! Exam composition: custom exams from a specification, official exams from
//! the per-juz structure builder.

use rand::Rng;
use rusqlite::Connection;
use serde::Serialize;

use crate::config::DEFAULT_EXAM_MINUTES;
use crate::db::{self, NewExam};
use crate::domain::{Exam, ExamKind, OfficialExamQuestion};
use crate::error::{AppError, AppResult};
use crate::selection::{
  build_filter, build_official_structure, fetch_questions, normalize_range, ExamSpecification,
  FetchMode, JuzFilter,
};

const MSG_NO_MATCH: &str = "هیچ سوالی با فیلترهای انتخاب‌شده یافت نشد";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedExam {
  pub exam: Exam,
  pub requested: u32,
  pub question_count: usize,
}

fn default_title(spec: &ExamSpecification) -> String {
  match &spec.juz {
    Some(JuzFilter::Range { start, end }) => {
      let (start, end) = normalize_range(*start, *end);
      if start == end {
        format!("آزمون جزء {}", start)
      } else {
        format!("آزمون جزء {} تا {}", start, end)
      }
    }
    _ => "آزمون سفارشی".to_string(),
  }
}

/// Build and persist a custom exam.
///
/// Fewer matches than requested is not an error; the exam simply holds
/// every match. No matches at all is rejected.
pub fn create_custom_exam<R: Rng + ?Sized>(
  conn: &Connection,
  user_id: i64,
  title: Option<&str>,
  duration_minutes: Option<u32>,
  spec: &ExamSpecification,
  rng: &mut R,
) -> AppResult<ComposedExam> {
  let filter = build_filter(spec);
  let questions = fetch_questions(
    conn,
    &filter,
    spec.question_count,
    FetchMode::from_random_flag(spec.random),
    rng,
  )?;
  if questions.is_empty() {
    return Err(AppError::BadRequest(MSG_NO_MATCH.to_string()));
  }

  let title = title
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(str::to_string)
    .unwrap_or_else(|| default_title(spec));
  let spec_json = serde_json::to_value(spec).map_err(|e| AppError::Internal(e.to_string()))?;

  let tx = conn.unchecked_transaction()?;
  let exam_id = db::create_exam(
    &tx,
    &NewExam {
      title,
      kind: ExamKind::Custom,
      created_by: user_id,
      spec: Some(spec_json),
      juz_start: None,
      juz_end: None,
      year: None,
      duration_minutes: duration_minutes.unwrap_or(DEFAULT_EXAM_MINUTES),
    },
  )?;
  let rows: Vec<OfficialExamQuestion> = questions
    .iter()
    .zip(1u32..)
    .map(|(q, position)| OfficialExamQuestion {
      exam_id,
      question_id: q.id,
      position,
      juz: q.juz,
      kind: Some(q.kind),
    })
    .collect();
  db::insert_exam_questions(&tx, &rows)?;
  tx.commit()?;

  tracing::info!(
    "User {} composed exam {} with {}/{} questions",
    user_id,
    exam_id,
    rows.len(),
    spec.question_count
  );
  let exam = db::get_exam(conn, exam_id)?.ok_or(AppError::NotFound("Exam"))?;
  Ok(ComposedExam {
    exam,
    requested: spec.question_count,
    question_count: rows.len(),
  })
}

/// Official exam definition supplied by an administrator
#[derive(Debug, Clone)]
pub struct OfficialExamInput {
  pub title: String,
  pub juz_start: u8,
  pub juz_end: u8,
  pub year: Option<i32>,
  pub duration_minutes: u32,
}

/// Create an official exam and build its structure.
///
/// A structure shortage removes the just-created exam again, so creation is
/// all or nothing. Rebuilding an existing exam goes through
/// [`rebuild_official_exam`] instead.
pub fn create_official_exam(
  conn: &Connection,
  admin_id: i64,
  input: &OfficialExamInput,
) -> AppResult<ComposedExam> {
  let (juz_start, juz_end) = normalize_range(input.juz_start, input.juz_end);
  let exam_id = db::create_exam(
    conn,
    &NewExam {
      title: input.title.trim().to_string(),
      kind: ExamKind::Official,
      created_by: admin_id,
      spec: None,
      juz_start: Some(juz_start),
      juz_end: Some(juz_end),
      year: input.year,
      duration_minutes: input.duration_minutes,
    },
  )?;

  let rows = match build_official_structure(conn, exam_id, juz_start, juz_end, input.year) {
    Ok(rows) => rows,
    Err(e) => {
      db::delete_exam(conn, exam_id)?;
      return Err(e.into());
    }
  };

  let exam = db::get_exam(conn, exam_id)?.ok_or(AppError::NotFound("Exam"))?;
  Ok(ComposedExam {
    requested: rows.len() as u32,
    question_count: rows.len(),
    exam,
  })
}

/// Re-run the structure builder for an existing official exam.
///
/// On a shortage the exam keeps no structure at all until a later rebuild
/// succeeds.
pub fn rebuild_official_exam(conn: &Connection, exam: &Exam) -> AppResult<Vec<OfficialExamQuestion>> {
  let (Some(juz_start), Some(juz_end)) = (exam.juz_start, exam.juz_end) else {
    return Err(AppError::BadRequest("only official exams have a structure to rebuild".to_string()));
  };
  if exam.kind != ExamKind::Official {
    return Err(AppError::BadRequest("only official exams have a structure to rebuild".to_string()));
  }
  Ok(build_official_structure(conn, exam.id, juz_start, juz_end, exam.year)?)
}
