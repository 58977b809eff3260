//! Tabular imports (Excel workbooks and CSV).
//!
//! The first non-empty row is the header. Columns are matched by name, so
//! their order and any extra columns do not matter.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

use super::{apply_field, Field, ImportError};
use crate::domain::OPTION_COUNT;
use crate::validation::ImportedQuestion;

/// Parse the first worksheet of an xlsx/xls/ods workbook
pub fn parse_spreadsheet(bytes: &[u8]) -> Result<Vec<ImportedQuestion>, ImportError> {
  let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
    .map_err(|e| ImportError::Spreadsheet(e.to_string()))?;
  let range = workbook
    .worksheet_range_at(0)
    .ok_or(ImportError::Empty)?
    .map_err(|e| ImportError::Spreadsheet(e.to_string()))?;

  let rows: Vec<Vec<String>> = range
    .rows()
    .map(|row| row.iter().map(cell_text).collect())
    .collect();
  rows_to_questions(rows)
}

fn cell_text(cell: &Data) -> String {
  match cell {
    Data::Empty => String::new(),
    Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
    other => other.to_string(),
  }
}

/// Parse a comma-separated file with a header row
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<ImportedQuestion>, ImportError> {
  let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
  let mut reader = csv::ReaderBuilder::new()
    .has_headers(false)
    .flexible(true)
    .from_reader(bytes);

  let mut rows = Vec::new();
  for record in reader.records() {
    rows.push(record?.iter().map(str::to_string).collect());
  }
  rows_to_questions(rows)
}

/// Map header-labelled rows to questions; rows without text are skipped
pub fn rows_to_questions(rows: Vec<Vec<String>>) -> Result<Vec<ImportedQuestion>, ImportError> {
  let mut rows = rows
    .into_iter()
    .enumerate()
    .filter(|(_, row)| row.iter().any(|cell| !cell.trim().is_empty()));

  let Some((_, header)) = rows.next() else {
    return Ok(Vec::new());
  };
  let columns: Vec<Option<Field>> = header.iter().map(|name| Field::from_name(name)).collect();

  let required = [
    (Field::Text, "text"),
    (Field::Option(0), "option1"),
    (Field::Option(1), "option2"),
    (Field::Option(2), "option3"),
    (Field::Option(3), "option4"),
    (Field::Answer, "answer"),
  ];
  for (field, name) in required {
    if !columns.contains(&Some(field)) {
      return Err(ImportError::MissingColumn(name));
    }
  }

  let mut questions = Vec::new();
  for (index, row) in rows {
    let line = index + 1;
    let mut question = ImportedQuestion {
      options: vec![String::new(); OPTION_COUNT],
      ..Default::default()
    };
    for (column, value) in columns.iter().zip(&row) {
      if let Some(field) = column {
        apply_field(&mut question, *field, value, line)?;
      }
    }
    if question.text.trim().is_empty() {
      continue;
    }
    questions.push(question);
  }
  Ok(questions)
}
