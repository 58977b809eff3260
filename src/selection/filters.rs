//! Translate an exam specification into a question predicate.
//!
//! The predicate is a conjunction of independent conditions rendered to a
//! SQL `WHERE` fragment with positional parameters. Conditions that the
//! specification does not mention are left out entirely.

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::domain::{Difficulty, QuestionKind};

/// Arabic definite article, inconsistently present in legacy topic data
const DEFINITE_ARTICLE: &str = "ال";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JuzFilter {
  Range { start: u8, end: u8 },
  Set(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurahFilter {
  Range { start: u16, end: u16 },
  Set(Vec<u16>),
  /// Legacy free-text match against `topic`
  Names(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearFilter {
  Range { start: i32, end: i32 },
  Exact(i32),
}

/// Validated description of the questions an exam should draw from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamSpecification {
  pub juz: Option<JuzFilter>,
  pub surah: Option<SurahFilter>,
  pub year: Option<YearFilter>,
  #[serde(default)]
  pub difficulties: Vec<Difficulty>,
  pub kind: Option<QuestionKind>,
  pub topic: Option<String>,
  pub question_count: u32,
  /// Randomized-offset sampling instead of newest-first
  #[serde(default)]
  pub random: bool,
}

impl ExamSpecification {
  /// True if a juz or surah constraint is present
  pub fn has_location(&self) -> bool {
    self.juz.is_some() || self.surah.is_some()
  }
}

/// A single predicate over the `questions` table
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
  Active,
  IntRange { column: &'static str, start: i64, end: i64 },
  IntIn { column: &'static str, values: Vec<i64> },
  IntEq { column: &'static str, value: i64 },
  TextIn { column: &'static str, values: Vec<String> },
  TextEq { column: &'static str, value: String },
}

impl Condition {
  fn render(&self, sql: &mut String, params: &mut Vec<Value>) {
    match self {
      Self::Active => sql.push_str("is_active = 1"),
      Self::IntRange { column, start, end } => {
        sql.push_str(&format!("{} BETWEEN ? AND ?", column));
        params.push(Value::Integer(*start));
        params.push(Value::Integer(*end));
      }
      Self::IntIn { column, values } => {
        render_in(sql, column, values.len());
        params.extend(values.iter().map(|v| Value::Integer(*v)));
      }
      Self::IntEq { column, value } => {
        sql.push_str(&format!("{} = ?", column));
        params.push(Value::Integer(*value));
      }
      Self::TextIn { column, values } => {
        render_in(sql, column, values.len());
        params.extend(values.iter().cloned().map(Value::Text));
      }
      Self::TextEq { column, value } => {
        sql.push_str(&format!("{} = ?", column));
        params.push(Value::Text(value.clone()));
      }
    }
  }
}

fn render_in(sql: &mut String, column: &str, len: usize) {
  if len == 0 {
    // An explicit empty set matches nothing
    sql.push_str("1 = 0");
  } else {
    let placeholders = vec!["?"; len].join(", ");
    sql.push_str(&format!("{} IN ({})", column, placeholders));
  }
}

/// Conjunction of conditions over the question bank
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionFilter {
  conditions: Vec<Condition>,
}

impl QuestionFilter {
  /// Predicate that only excludes deactivated questions
  pub fn active_only() -> Self {
    Self {
      conditions: vec![Condition::Active],
    }
  }

  /// Predicate over the whole bank, deactivated questions included (admin listing)
  pub fn any() -> Self {
    Self { conditions: vec![] }
  }

  /// Active questions of one kind in one juz, optionally pinned to a year
  pub fn for_unit(juz: u8, year: Option<i32>, kind: QuestionKind) -> Self {
    let mut filter = Self::active_only()
      .and(Condition::IntEq { column: "juz", value: juz as i64 })
      .and(Condition::TextEq { column: "kind", value: kind.as_str().to_string() });
    if let Some(year) = year {
      filter = filter.and(Condition::IntEq { column: "year", value: year as i64 });
    }
    filter
  }

  pub fn and(mut self, condition: Condition) -> Self {
    self.conditions.push(condition);
    self
  }

  pub fn conditions(&self) -> &[Condition] {
    &self.conditions
  }

  /// Render as `WHERE` body plus positional parameters
  pub fn to_sql(&self) -> (String, Vec<Value>) {
    let mut sql = String::new();
    let mut params = Vec::new();
    if self.conditions.is_empty() {
      sql.push_str("1 = 1");
    }
    for (i, condition) in self.conditions.iter().enumerate() {
      if i > 0 {
        sql.push_str(" AND ");
      }
      condition.render(&mut sql, &mut params);
    }
    (sql, params)
  }
}

/// Order a pair so that start <= end
pub fn normalize_range<T: Ord + Copy>(a: T, b: T) -> (T, T) {
  (a.min(b), a.max(b))
}

/// A surah name plus its variant with the definite article toggled.
pub fn article_variants(name: &str) -> Vec<String> {
  let name: String = name.trim().nfc().collect();
  if name.is_empty() {
    return vec![];
  }
  let variant = match name.strip_prefix(DEFINITE_ARTICLE) {
    Some(rest) if !rest.is_empty() => rest.to_string(),
    _ => format!("{}{}", DEFINITE_ARTICLE, name),
  };
  vec![name, variant]
}

/// Build the question predicate for a validated specification.
pub fn build_filter(spec: &ExamSpecification) -> QuestionFilter {
  let mut filter = QuestionFilter::active_only();

  match &spec.juz {
    Some(JuzFilter::Range { start, end }) => {
      let (start, end) = normalize_range(*start, *end);
      filter = filter.and(Condition::IntRange { column: "juz", start: start as i64, end: end as i64 });
    }
    Some(JuzFilter::Set(values)) => {
      filter = filter.and(Condition::IntIn {
        column: "juz",
        values: values.iter().map(|v| *v as i64).collect(),
      });
    }
    None => {}
  }

  match &spec.surah {
    Some(SurahFilter::Range { start, end }) => {
      let (start, end) = normalize_range(*start, *end);
      filter = filter.and(Condition::IntRange {
        column: "surah_id",
        start: start as i64,
        end: end as i64,
      });
    }
    Some(SurahFilter::Set(values)) => {
      filter = filter.and(Condition::IntIn {
        column: "surah_id",
        values: values.iter().map(|v| *v as i64).collect(),
      });
    }
    Some(SurahFilter::Names(names)) => {
      let mut values: Vec<String> = Vec::new();
      for variant in names.iter().flat_map(|n| article_variants(n)) {
        if !values.contains(&variant) {
          values.push(variant);
        }
      }
      filter = filter.and(Condition::TextIn { column: "topic", values });
    }
    None => {}
  }

  match spec.year {
    Some(YearFilter::Range { start, end }) => {
      let (start, end) = normalize_range(start, end);
      filter = filter.and(Condition::IntRange { column: "year", start: start as i64, end: end as i64 });
    }
    Some(YearFilter::Exact(year)) => {
      filter = filter.and(Condition::IntEq { column: "year", value: year as i64 });
    }
    None => {}
  }

  if !spec.difficulties.is_empty() {
    filter = filter.and(Condition::TextIn {
      column: "difficulty",
      values: spec.difficulties.iter().map(|d| d.as_str().to_string()).collect(),
    });
  }

  if let Some(kind) = spec.kind {
    filter = filter.and(Condition::TextEq { column: "kind", value: kind.as_str().to_string() });
  }

  if let Some(topic) = spec.topic.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
    filter = filter.and(Condition::TextEq { column: "topic", value: topic.nfc().collect() });
  }

  filter
}
