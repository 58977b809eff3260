use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

/// Number of answer options every question carries
pub const OPTION_COUNT: usize = 4;

/// Category used when composing official exams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
  Memorization,
  Concepts,
}

impl QuestionKind {
  pub fn from_str(s: &str) -> Option<Self> {
    match s.trim().to_lowercase().as_str() {
      "memorization" | "hifz" | "حفظ" => Some(Self::Memorization),
      "concepts" | "concept" | "mafahim" | "مفاهیم" => Some(Self::Concepts),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Memorization => "memorization",
      Self::Concepts => "concepts",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  pub fn from_str(s: &str) -> Option<Self> {
    match s.trim().to_lowercase().as_str() {
      "easy" | "آسان" => Some(Self::Easy),
      "medium" | "متوسط" => Some(Self::Medium),
      "hard" | "سخت" => Some(Self::Hard),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Easy => "easy",
      Self::Medium => "medium",
      Self::Hard => "hard",
    }
  }
}

impl Default for Difficulty {
  fn default() -> Self {
    Self::Medium
  }
}

/// A multiple-choice question from the bank.
///
/// Questions are never hard-deleted; `is_active` excludes them from selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: i64,
  pub text: String,
  pub options: [String; OPTION_COUNT],
  /// 1-based index into `options`
  pub correct_option: u8,
  pub year: Option<i32>,
  pub juz: Option<u8>,
  pub surah_id: Option<u16>,
  /// Free-text topic; older rows store the surah name here
  pub topic: Option<String>,
  pub difficulty: Difficulty,
  pub kind: QuestionKind,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

/// Question as shown to an exam taker (no answer key)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
  pub id: i64,
  pub position: u32,
  pub text: String,
  pub options: [String; OPTION_COUNT],
}

impl Question {
  pub fn to_public(&self, position: u32) -> PublicQuestion {
    PublicQuestion {
      id: self.id,
      position,
      text: self.text.clone(),
      options: self.options.clone(),
    }
  }

  pub fn is_correct(&self, selected: u8) -> bool {
    selected == self.correct_option
  }
}

/// Stable hash of a question's text, used to skip duplicate imports.
///
/// The text is trimmed and NFC-normalized first, so the same wording typed
/// with different Unicode compositions collapses to one question.
pub fn content_hash(text: &str) -> String {
  let normalized: String = text.trim().nfc().collect();
  hex::encode(Sha256::digest(normalized.as_bytes()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_kind_round_trip_and_aliases() {
    for kind in [QuestionKind::Memorization, QuestionKind::Concepts] {
      assert_eq!(QuestionKind::from_str(kind.as_str()), Some(kind));
    }
    assert_eq!(QuestionKind::from_str("حفظ"), Some(QuestionKind::Memorization));
    assert_eq!(QuestionKind::from_str(" Concept "), Some(QuestionKind::Concepts));
    assert_eq!(QuestionKind::from_str("tajweed"), None);
  }

  #[test]
  fn test_difficulty_parse() {
    assert_eq!(Difficulty::from_str("HARD"), Some(Difficulty::Hard));
    assert_eq!(Difficulty::from_str("متوسط"), Some(Difficulty::Medium));
    assert_eq!(Difficulty::from_str(""), None);
  }

  #[test]
  fn test_content_hash_ignores_surrounding_whitespace() {
    let a = content_hash("Which surah?");
    assert_eq!(a, content_hash(" Which surah? "));
    assert_eq!(a.len(), 64);
    assert_ne!(a, content_hash("Which juz?"));
  }

  #[test]
  fn test_content_hash_normalizes_composition() {
    // Alef with hamza above: precomposed vs alef + combining hamza
    assert_eq!(content_hash("\u{0623}ية"), content_hash("\u{0627}\u{0654}ية"));
  }
}
