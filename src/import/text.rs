//! Block-format parser for Word and plain-text question banks.
//!
//! ```text
//! 12. Which surah opens the Quran?
//! 1) Al-Fatiha
//! 2) Al-Baqarah
//! 3) Al-Ikhlas
//! 4) An-Nas
//! Answer: 1
//! juz: 1 | year: 1404 | kind: memorization
//! ```
//!
//! Options may be labelled `1)`..`4)`, `a)`..`d)` or `الف)`..`د)`, and the
//! answer line may read `پاسخ: ...`. Digits may be Persian or Arabic-Indic.

use super::{apply_field, digit_value, letter_option, Field, ImportError};
use crate::domain::OPTION_COUNT;
use crate::validation::ImportedQuestion;

const OPTION_SEPARATORS: [char; 3] = [')', '.', '-'];
const NUMBER_SEPARATORS: [char; 5] = ['.', ')', '-', ':', '،'];

/// Question under construction with the line it started on
struct Pending {
  line: usize,
  question: ImportedQuestion,
  has_answer: bool,
}

impl Pending {
  fn finish(self) -> Result<ImportedQuestion, ImportError> {
    if self.question.options.len() < OPTION_COUNT {
      return Err(ImportError::syntax(
        self.line,
        format!(
          "question has {} options, expected {}",
          self.question.options.len(),
          OPTION_COUNT
        ),
      ));
    }
    if !self.has_answer {
      return Err(ImportError::syntax(self.line, "question has no answer line"));
    }
    Ok(self.question)
  }
}

/// Parse every question block in `content`
pub fn parse_blocks(content: &str) -> Result<Vec<ImportedQuestion>, ImportError> {
  let mut questions = Vec::new();
  let mut pending: Option<Pending> = None;

  for (index, raw) in content.lines().enumerate() {
    let line_no = index + 1;
    let line = raw.trim();
    if line.is_empty() {
      continue;
    }

    if let Some(current) = pending.as_mut() {
      let options = &mut current.question.options;
      if options.len() < OPTION_COUNT {
        if let Some((number, text)) = option_line(line) {
          if number != options.len() + 1 {
            return Err(ImportError::syntax(
              line_no,
              format!("expected option {}, found option {}", options.len() + 1, number),
            ));
          }
          options.push(text.to_string());
          continue;
        }
      }

      if let Some(value) = answer_line(line) {
        apply_field(&mut current.question, Field::Answer, value, line_no)?;
        current.has_answer = true;
        continue;
      }

      if current.has_answer {
        if let Some(pairs) = metadata_line(line) {
          for (field, value) in pairs {
            apply_field(&mut current.question, field, value, line_no)?;
          }
          continue;
        }
      }
    }

    if let Some(text) = numbered_line(line) {
      if let Some(done) = pending.take() {
        questions.push(done.finish()?);
      }
      pending = Some(Pending {
        line: line_no,
        question: ImportedQuestion {
          text: text.to_string(),
          ..Default::default()
        },
        has_answer: false,
      });
      continue;
    }

    // Wrapped question text
    match pending.as_mut() {
      Some(current) if current.question.options.is_empty() => {
        current.question.text.push(' ');
        current.question.text.push_str(line);
      }
      _ => return Err(ImportError::syntax(line_no, format!("unexpected line '{}'", line))),
    }
  }

  if let Some(done) = pending {
    questions.push(done.finish()?);
  }
  Ok(questions)
}

/// Split a leading run of digits, returning its value and the remainder
fn leading_number(line: &str) -> Option<(usize, &str)> {
  let mut value = 0usize;
  let mut end = 0;
  for (i, c) in line.char_indices() {
    match digit_value(c) {
      Some(d) => {
        value = value.checked_mul(10)?.checked_add(d as usize)?;
        end = i + c.len_utf8();
      }
      None => break,
    }
  }
  (end > 0).then(|| (value, &line[end..]))
}

/// `12. question text` (also `12)`, `12-`, `12:`)
fn numbered_line(line: &str) -> Option<&str> {
  let (_, rest) = leading_number(line)?;
  let rest = rest.trim_start().strip_prefix(NUMBER_SEPARATORS)?.trim();
  (!rest.is_empty()).then_some(rest)
}

/// `2) option text`, `b) option text` or `ب) option text`
fn option_line(line: &str) -> Option<(usize, &str)> {
  let (number, rest) = match leading_number(line) {
    Some((n, rest)) => (n, rest),
    None => {
      let end = line.find(OPTION_SEPARATORS)?;
      let label = line[..end].trim();
      (letter_option(label)? as usize, &line[end..])
    }
  };
  if !(1..=OPTION_COUNT).contains(&number) {
    return None;
  }
  let text = rest.trim_start().strip_prefix(OPTION_SEPARATORS)?.trim();
  (!text.is_empty()).then_some((number, text))
}

/// `Answer: 2` / `پاسخ: ب`
fn answer_line(line: &str) -> Option<&str> {
  let (key, value) = line.split_once(':')?;
  (Field::from_name(key)? == Field::Answer).then_some(value)
}

/// `juz: 3 | year: 1404`; every key must be recognized
fn metadata_line(line: &str) -> Option<Vec<(Field, &str)>> {
  line
    .split('|')
    .map(|part| {
      let (key, value) = part.split_once(':')?;
      let field = Field::from_name(key)?;
      matches!(
        field,
        Field::Juz | Field::Surah | Field::Year | Field::Topic | Field::Difficulty | Field::Kind
      )
      .then_some((field, value))
    })
    .collect()
}
