//! Request validation.
//!
//! Wire shapes arrive loosely typed (numbers as i64, enums as strings) so
//! that bad input produces field-level messages instead of a bare
//! deserialization failure. Successful validation yields the strongly
//! typed values the rest of the crate works with.

use serde::{Deserialize, Serialize};

use crate::config::{JUZ_COUNT, MAX_QUESTIONS_PER_EXAM, SURAH_COUNT};
use crate::db::NewQuestion;
use crate::domain::{Difficulty, QuestionKind, OPTION_COUNT};
use crate::selection::{ExamSpecification, JuzFilter, SurahFilter, YearFilter};

// ============================================================================
// Error types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field: String,
  pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("validation failed: {}", self.summary())]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
  pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
    self.0.push(FieldError {
      field: field.into(),
      message: message.into(),
    });
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn fields(&self) -> &[FieldError] {
    &self.0
  }

  pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
    let mut errors = Self::default();
    errors.push(field, message);
    errors
  }

  fn summary(&self) -> String {
    self
      .0
      .iter()
      .map(|e| format!("{}: {}", e.field, e.message))
      .collect::<Vec<_>>()
      .join("; ")
  }

  fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
    if self.is_empty() { Ok(value) } else { Err(self) }
  }
}

// ============================================================================
// Exam specification
// ============================================================================

/// Exam composition request as sent by the client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRequest {
  pub juz_start: Option<i64>,
  pub juz_end: Option<i64>,
  pub juz_list: Option<Vec<i64>>,
  pub surah_start: Option<i64>,
  pub surah_end: Option<i64>,
  pub surah_list: Option<Vec<i64>>,
  /// Legacy: match surah names stored in the topic column
  pub surah_names: Option<Vec<String>>,
  pub year_start: Option<i64>,
  pub year_end: Option<i64>,
  pub year: Option<i64>,
  #[serde(default)]
  pub difficulty: Vec<String>,
  pub kind: Option<String>,
  pub topic: Option<String>,
  pub question_count: Option<i64>,
  pub random: Option<bool>,
}

fn in_bounds(value: i64, max: i64) -> bool {
  (1..=max).contains(&value)
}

fn validate_juz(req: &ExamRequest, errors: &mut ValidationErrors) -> Option<JuzFilter> {
  let max = JUZ_COUNT as i64;
  match (req.juz_start, req.juz_end, &req.juz_list) {
    (None, None, None) => None,
    (Some(_), _, Some(_)) | (_, Some(_), Some(_)) => {
      errors.push("juzList", "use either a juz range or a juz list, not both");
      None
    }
    (None, None, Some(list)) => {
      if list.is_empty() {
        errors.push("juzList", "must not be empty");
        return None;
      }
      if list.iter().any(|v| !in_bounds(*v, max)) {
        errors.push("juzList", format!("values must be between 1 and {}", max));
        return None;
      }
      let mut values: Vec<u8> = list.iter().map(|v| *v as u8).collect();
      values.sort_unstable();
      values.dedup();
      Some(JuzFilter::Set(values))
    }
    (Some(start), Some(end), None) => {
      let mut ok = true;
      for (field, value) in [("juzStart", start), ("juzEnd", end)] {
        if !in_bounds(value, max) {
          errors.push(field, format!("must be between 1 and {}", max));
          ok = false;
        }
      }
      ok.then(|| JuzFilter::Range { start: start as u8, end: end as u8 })
    }
    (Some(_), None, None) | (None, Some(_), None) => {
      errors.push("juzEnd", "juzStart and juzEnd must be given together");
      None
    }
  }
}

fn validate_surah(req: &ExamRequest, errors: &mut ValidationErrors) -> Option<SurahFilter> {
  let max = SURAH_COUNT as i64;
  let has_range = req.surah_start.is_some() || req.surah_end.is_some();
  let styles = [has_range, req.surah_list.is_some(), req.surah_names.is_some()]
    .iter()
    .filter(|b| **b)
    .count();
  if styles > 1 {
    errors.push("surahList", "use only one of surah range, surah list or surah names");
    return None;
  }

  if let Some(list) = &req.surah_list {
    if list.is_empty() {
      errors.push("surahList", "must not be empty");
      return None;
    }
    if list.iter().any(|v| !in_bounds(*v, max)) {
      errors.push("surahList", format!("values must be between 1 and {}", max));
      return None;
    }
    let mut values: Vec<u16> = list.iter().map(|v| *v as u16).collect();
    values.sort_unstable();
    values.dedup();
    return Some(SurahFilter::Set(values));
  }

  if let Some(names) = &req.surah_names {
    let names: Vec<String> = names
      .iter()
      .map(|n| n.trim().to_string())
      .filter(|n| !n.is_empty())
      .collect();
    if names.is_empty() {
      errors.push("surahNames", "must contain at least one name");
      return None;
    }
    return Some(SurahFilter::Names(names));
  }

  match (req.surah_start, req.surah_end) {
    (None, None) => None,
    (Some(start), Some(end)) => {
      let mut ok = true;
      for (field, value) in [("surahStart", start), ("surahEnd", end)] {
        if !in_bounds(value, max) {
          errors.push(field, format!("must be between 1 and {}", max));
          ok = false;
        }
      }
      ok.then(|| SurahFilter::Range { start: start as u16, end: end as u16 })
    }
    _ => {
      errors.push("surahEnd", "surahStart and surahEnd must be given together");
      None
    }
  }
}

fn year_value(field: &str, value: i64, errors: &mut ValidationErrors) -> Option<i32> {
  match i32::try_from(value) {
    Ok(v) if v > 0 => Some(v),
    _ => {
      errors.push(field, "must be a positive year");
      None
    }
  }
}

fn validate_year(req: &ExamRequest, errors: &mut ValidationErrors) -> Option<YearFilter> {
  match (req.year, req.year_start, req.year_end) {
    (None, None, None) => None,
    (Some(year), None, None) => year_value("year", year, errors).map(YearFilter::Exact),
    (Some(_), _, _) => {
      errors.push("year", "use either an exact year or a year range, not both");
      None
    }
    (None, Some(start), Some(end)) => {
      let start = year_value("yearStart", start, errors);
      let end = year_value("yearEnd", end, errors);
      Some(YearFilter::Range { start: start?, end: end? })
    }
    (None, _, _) => {
      errors.push("yearEnd", "yearStart and yearEnd must be given together");
      None
    }
  }
}

impl ExamRequest {
  /// Validate into an exam specification.
  ///
  /// At least one of juz or surah must be constrained.
  pub fn validate(&self) -> Result<ExamSpecification, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let juz = validate_juz(self, &mut errors);
    let surah = validate_surah(self, &mut errors);
    let year = validate_year(self, &mut errors);

    let mut difficulties = Vec::new();
    for raw in &self.difficulty {
      match Difficulty::from_str(raw) {
        Some(d) if !difficulties.contains(&d) => difficulties.push(d),
        Some(_) => {}
        None => errors.push("difficulty", format!("unknown difficulty '{}'", raw)),
      }
    }

    let kind = match self.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
      None => None,
      Some(raw) => {
        let parsed = QuestionKind::from_str(raw);
        if parsed.is_none() {
          errors.push("kind", format!("unknown question kind '{}'", raw));
        }
        parsed
      }
    };

    let question_count = match self.question_count {
      Some(n) if (1..=MAX_QUESTIONS_PER_EXAM as i64).contains(&n) => n as u32,
      Some(_) => {
        errors.push(
          "questionCount",
          format!("must be between 1 and {}", MAX_QUESTIONS_PER_EXAM),
        );
        0
      }
      None => {
        errors.push("questionCount", "is required");
        0
      }
    };

    let has_location_input = self.juz_start.is_some()
      || self.juz_end.is_some()
      || self.juz_list.is_some()
      || self.surah_start.is_some()
      || self.surah_end.is_some()
      || self.surah_list.is_some()
      || self.surah_names.is_some();
    if !has_location_input {
      errors.push("juzStart", "choose at least one juz or surah filter");
    }

    let spec = ExamSpecification {
      juz,
      surah,
      year,
      difficulties,
      kind,
      topic: self
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string),
      question_count,
      random: self.random.unwrap_or(true),
    };
    errors.into_result(spec)
  }
}

// ============================================================================
// Imported / edited questions
// ============================================================================

/// Normalized question shape produced by document parsing and sent by editors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedQuestion {
  pub text: String,
  pub options: Vec<String>,
  pub correct_option: i64,
  #[serde(default)]
  pub year: Option<i64>,
  #[serde(default)]
  pub juz: Option<i64>,
  #[serde(default)]
  pub surah_id: Option<i64>,
  #[serde(default)]
  pub topic: Option<String>,
  #[serde(default)]
  pub difficulty: Option<String>,
  #[serde(default)]
  pub kind: Option<String>,
}

impl ImportedQuestion {
  /// Validate into an insertable question; field names are prefixed with `prefix`.
  pub fn validate(&self, prefix: &str) -> Result<NewQuestion, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let field = |name: &str| {
      if prefix.is_empty() { name.to_string() } else { format!("{}.{}", prefix, name) }
    };

    let text = self.text.trim().to_string();
    if text.is_empty() {
      errors.push(field("text"), "must not be empty");
    }

    let options: Vec<String> = self.options.iter().map(|o| o.trim().to_string()).collect();
    if options.len() != OPTION_COUNT {
      errors.push(field("options"), format!("exactly {} options are required", OPTION_COUNT));
    } else if options.iter().any(String::is_empty) {
      errors.push(field("options"), "options must not be empty");
    }

    if !(1..=OPTION_COUNT as i64).contains(&self.correct_option) {
      errors.push(field("correctOption"), format!("must be between 1 and {}", OPTION_COUNT));
    }

    if let Some(juz) = self.juz {
      if !in_bounds(juz, JUZ_COUNT as i64) {
        errors.push(field("juz"), format!("must be between 1 and {}", JUZ_COUNT));
      }
    }
    if let Some(surah) = self.surah_id {
      if !in_bounds(surah, SURAH_COUNT as i64) {
        errors.push(field("surahId"), format!("must be between 1 and {}", SURAH_COUNT));
      }
    }
    let year = match self.year {
      Some(y) => year_value(&field("year"), y, &mut errors),
      None => None,
    };

    let difficulty = match self.difficulty.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
      None => Difficulty::default(),
      Some(raw) => Difficulty::from_str(raw).unwrap_or_else(|| {
        errors.push(field("difficulty"), format!("unknown difficulty '{}'", raw));
        Difficulty::default()
      }),
    };

    let kind = match self.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
      None => QuestionKind::Memorization,
      Some(raw) => QuestionKind::from_str(raw).unwrap_or_else(|| {
        errors.push(field("kind"), format!("unknown question kind '{}'", raw));
        QuestionKind::Memorization
      }),
    };

    if !errors.is_empty() {
      return Err(errors);
    }

    let options: [String; OPTION_COUNT] = match options.try_into() {
      Ok(options) => options,
      Err(_) => return Err(ValidationErrors::single(field("options"), "invalid options")),
    };

    Ok(NewQuestion {
      text,
      options,
      correct_option: self.correct_option as u8,
      year,
      juz: self.juz.map(|j| j as u8),
      surah_id: self.surah_id.map(|s| s as u16),
      topic: self
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string),
      difficulty,
      kind,
    })
  }
}

/// Validate a batch, collecting every row's errors
pub fn validate_import(rows: &[ImportedQuestion]) -> Result<Vec<NewQuestion>, ValidationErrors> {
  let mut errors = ValidationErrors::default();
  let mut valid = Vec::with_capacity(rows.len());
  for (i, row) in rows.iter().enumerate() {
    match row.validate(&format!("questions[{}]", i)) {
      Ok(q) => valid.push(q),
      Err(e) => errors.0.extend(e.0),
    }
  }
  if rows.is_empty() {
    errors.push("questions", "no questions to import");
  }
  errors.into_result(valid)
}
