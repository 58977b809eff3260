//! Question bank import.
//!
//! Uploaded documents are parsed into [`ImportedQuestion`] rows for preview.
//! Nothing here touches the database; validation and insertion happen in the
//! import endpoint.

mod docx;
mod sheet;
mod text;

pub use docx::document_paragraphs;
pub use sheet::{parse_csv, parse_spreadsheet, rows_to_questions};
pub use text::parse_blocks;

use thiserror::Error;

use crate::validation::ImportedQuestion;

#[derive(Debug, Error)]
pub enum ImportError {
  #[error("unsupported file type '{0}' (expected xlsx, xls, csv, docx or txt)")]
  UnsupportedFormat(String),

  #[error("missing required column '{0}'")]
  MissingColumn(&'static str),

  #[error("could not read spreadsheet: {0}")]
  Spreadsheet(String),

  #[error("could not read CSV: {0}")]
  Csv(#[from] csv::Error),

  #[error("could not read Word document: {0}")]
  Document(String),

  #[error("file is not valid UTF-8 text")]
  Encoding,

  #[error("line {line}: {message}")]
  Syntax { line: usize, message: String },

  #[error("no questions found in file")]
  Empty,
}

impl ImportError {
  fn syntax(line: usize, message: impl Into<String>) -> Self {
    Self::Syntax {
      line,
      message: message.into(),
    }
  }
}

/// Parse an uploaded file by its extension
pub fn parse_upload(filename: &str, bytes: &[u8]) -> Result<Vec<ImportedQuestion>, ImportError> {
  let extension = filename
    .rsplit_once('.')
    .map(|(_, ext)| ext.to_ascii_lowercase())
    .unwrap_or_default();

  let questions = match extension.as_str() {
    "xlsx" | "xls" | "xlsm" | "ods" => parse_spreadsheet(bytes)?,
    "csv" => parse_csv(bytes)?,
    "docx" => parse_blocks(&document_paragraphs(bytes)?.join("\n"))?,
    "txt" => {
      let content = std::str::from_utf8(bytes).map_err(|_| ImportError::Encoding)?;
      parse_blocks(content.trim_start_matches('\u{feff}'))?
    }
    _ => return Err(ImportError::UnsupportedFormat(extension)),
  };

  if questions.is_empty() {
    return Err(ImportError::Empty);
  }
  tracing::debug!("Parsed {} questions from {}", questions.len(), filename);
  Ok(questions)
}

// ============================================================================
// Shared field handling
// ============================================================================

/// Column or metadata key recognized in uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
  Text,
  Option(usize),
  Answer,
  Juz,
  Surah,
  Year,
  Topic,
  Difficulty,
  Kind,
}

impl Field {
  /// Match a header cell or metadata key (English or Persian)
  pub(crate) fn from_name(name: &str) -> Option<Self> {
    let key: String = name
      .trim()
      .chars()
      .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
      .flat_map(char::to_lowercase)
      .map(|c| digit_value(c).map_or(c, |d| char::from(b'0' + d as u8)))
      .collect();

    let field = match key.as_str() {
      "text" | "question" | "سوال" | "سؤال" | "متنسوال" => Self::Text,
      "answer" | "correct" | "correctoption" | "پاسخ" | "جواب" | "گزینهصحیح" => Self::Answer,
      "juz" | "جزء" | "جزو" => Self::Juz,
      "surah" | "surahid" | "سوره" => Self::Surah,
      "year" | "سال" => Self::Year,
      "topic" | "موضوع" => Self::Topic,
      "difficulty" | "سختی" | "درجه" => Self::Difficulty,
      "kind" | "type" | "نوع" => Self::Kind,
      other => {
        let n = other
          .strip_prefix("option")
          .or_else(|| other.strip_prefix("گزینه"))?;
        match n {
          "1" | "2" | "3" | "4" => Self::Option(n.as_bytes()[0] as usize - b'1' as usize),
          _ => return None,
        }
      }
    };
    Some(field)
  }
}

/// Store a metadata value on a question; `line` is used for error reporting
pub(crate) fn apply_field(
  question: &mut ImportedQuestion,
  field: Field,
  value: &str,
  line: usize,
) -> Result<(), ImportError> {
  let value = value.trim();
  if value.is_empty() {
    return Ok(());
  }
  let number = |what: &str| {
    parse_number(value).ok_or_else(|| ImportError::syntax(line, format!("invalid {} '{}'", what, value)))
  };

  match field {
    Field::Text => question.text = value.to_string(),
    Field::Option(i) => {
      if question.options.len() <= i {
        question.options.resize(i + 1, String::new());
      }
      question.options[i] = value.to_string();
    }
    Field::Answer => {
      question.correct_option = parse_answer(value)
        .ok_or_else(|| ImportError::syntax(line, format!("invalid answer '{}'", value)))?;
    }
    Field::Juz => question.juz = Some(number("juz")?),
    Field::Year => question.year = Some(number("year")?),
    // Non-numeric surah values are legacy names kept in the topic column
    Field::Surah => match parse_number(value) {
      Some(id) => question.surah_id = Some(id),
      None if question.topic.is_none() => question.topic = Some(value.to_string()),
      None => {}
    },
    Field::Topic => question.topic = Some(value.to_string()),
    Field::Difficulty => question.difficulty = Some(value.to_string()),
    Field::Kind => question.kind = Some(value.to_string()),
  }
  Ok(())
}

/// ASCII, Persian (۰-۹) and Arabic-Indic (٠-٩) digits
pub(crate) fn digit_value(c: char) -> Option<u32> {
  match c {
    '0'..='9' => Some(c as u32 - '0' as u32),
    '\u{06F0}'..='\u{06F9}' => Some(c as u32 - 0x06F0),
    '\u{0660}'..='\u{0669}' => Some(c as u32 - 0x0660),
    _ => None,
  }
}

/// Parse a whole-number cell, tolerating a trailing ".0" from spreadsheets
pub(crate) fn parse_number(value: &str) -> Option<i64> {
  let value = value.trim();
  let value = value.strip_suffix(".0").unwrap_or(value);
  if value.is_empty() {
    return None;
  }
  value.chars().try_fold(0i64, |acc, c| {
    let d = digit_value(c)?;
    acc.checked_mul(10)?.checked_add(d as i64)
  })
}

/// Letter label (a-d or الف/ب/ج/د) to option number
pub(crate) fn letter_option(label: &str) -> Option<i64> {
  match label.to_lowercase().as_str() {
    "a" | "الف" | "أ" => Some(1),
    "b" | "ب" => Some(2),
    "c" | "ج" => Some(3),
    "d" | "د" => Some(4),
    _ => None,
  }
}

/// Answer cell: option number or letter, optionally prefixed with "گزینه"/"option"
pub(crate) fn parse_answer(value: &str) -> Option<i64> {
  let value = value.trim();
  let value = value
    .strip_prefix("گزینه")
    .or_else(|| value.strip_prefix("option"))
    .or_else(|| value.strip_prefix("Option"))
    .unwrap_or(value)
    .trim()
    .trim_end_matches([')', '.', ' ']);
  parse_number(value).or_else(|| letter_option(value))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_field_names() {
    assert_eq!(Field::from_name("Question"), Some(Field::Text));
    assert_eq!(Field::from_name("option 3"), Some(Field::Option(2)));
    assert_eq!(Field::from_name("گزینه ۴"), Some(Field::Option(3)));
    assert_eq!(Field::from_name("Correct_Option"), Some(Field::Answer));
    assert_eq!(Field::from_name("جزء"), Some(Field::Juz));
    assert_eq!(Field::from_name("option5"), None);
    assert_eq!(Field::from_name("notes"), None);
  }

  #[test]
  fn test_numbers_accept_persian_digits() {
    assert_eq!(parse_number("۱۴۰۴"), Some(1404));
    assert_eq!(parse_number("٣٠"), Some(30));
    assert_eq!(parse_number("12.0"), Some(12));
    assert_eq!(parse_number("12.5"), None);
    assert_eq!(parse_number(""), None);
  }

  #[test]
  fn test_answers() {
    assert_eq!(parse_answer("3"), Some(3));
    assert_eq!(parse_answer("گزینه ۲"), Some(2));
    assert_eq!(parse_answer("C)"), Some(3));
    assert_eq!(parse_answer("الف"), Some(1));
    assert_eq!(parse_answer("maybe"), None);
  }

  #[test]
  fn test_surah_name_falls_back_to_topic() {
    let mut q = ImportedQuestion::default();
    apply_field(&mut q, Field::Surah, "البقرة", 1).unwrap();
    assert_eq!(q.surah_id, None);
    assert_eq!(q.topic.as_deref(), Some("البقرة"));
    apply_field(&mut q, Field::Surah, "۲", 1).unwrap();
    assert_eq!(q.surah_id, Some(2));
  }

  #[test]
  fn test_parse_upload_dispatch() {
    let txt = "1. Which surah is first?\n1) Al-Fatiha\n2) Al-Baqarah\n3) Yasin\n4) An-Nas\nAnswer: 1\n";
    let parsed = parse_upload("Bank.TXT", txt.as_bytes()).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].correct_option, 1);

    assert!(matches!(
      parse_upload("bank.pdf", b"%PDF"),
      Err(ImportError::UnsupportedFormat(ext)) if ext == "pdf"
    ));
    assert!(matches!(parse_upload("empty.txt", b"  \n"), Err(ImportError::Empty)));
    assert!(matches!(parse_upload("bad.txt", &[0xff, 0xfe, 0x00]), Err(ImportError::Encoding)));
  }
}
