//! Fetch up to N questions matching a filter.
//!
//! Random mode samples one contiguous window at a uniformly random offset
//! instead of loading every match. Rows are not individually uniform, but
//! the query stays a single `LIMIT/OFFSET` read. The count and the window
//! are separate statements; rows written in between can shift the window.

use rand::Rng;
use rusqlite::{params_from_iter, Connection, Result};

use crate::db::{row_to_question, QUESTION_COLUMNS};
use crate::domain::Question;

use super::QuestionFilter;

/// Stable creation order shared by both modes
const ORDER_BY: &str = "ORDER BY created_at DESC, id DESC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
  /// Newest `count` matches
  Deterministic,
  /// `count` contiguous matches at a random offset
  Random,
}

impl FetchMode {
  pub fn from_random_flag(random: bool) -> Self {
    if random { Self::Random } else { Self::Deterministic }
  }
}

pub fn count_matching(conn: &Connection, filter: &QuestionFilter) -> Result<u64> {
  let (where_sql, values) = filter.to_sql();
  let sql = format!("SELECT COUNT(*) FROM questions WHERE {}", where_sql);
  let total: i64 = conn.query_row(&sql, params_from_iter(values), |row| row.get(0))?;
  Ok(total.max(0) as u64)
}

/// Offset for a window of `count` rows out of `total`.
///
/// `None` when the window already covers every row. Otherwise the offset
/// lies in `[0, total - count]`.
pub fn random_offset<R: Rng + ?Sized>(total: u64, count: u64, rng: &mut R) -> Option<u64> {
  if total <= count {
    return None;
  }
  Some(rng.random_range(0..=total - count))
}

fn fetch_window(
  conn: &Connection,
  filter: &QuestionFilter,
  limit: u64,
  offset: u64,
) -> Result<Vec<Question>> {
  let (where_sql, mut values) = filter.to_sql();
  let sql = format!(
    "SELECT {} FROM questions WHERE {} {} LIMIT ? OFFSET ?",
    QUESTION_COLUMNS, where_sql, ORDER_BY
  );
  values.push((limit as i64).into());
  values.push((offset as i64).into());
  let mut stmt = conn.prepare(&sql)?;
  stmt
    .query_map(params_from_iter(values), row_to_question)?
    .collect()
}

/// Newest `count` matches by creation order
pub fn fetch_newest(conn: &Connection, filter: &QuestionFilter, count: u64) -> Result<Vec<Question>> {
  fetch_window(conn, filter, count, 0)
}

/// Return up to `count` questions matching `filter`. No match is an empty vec.
pub fn fetch_questions<R: Rng + ?Sized>(
  conn: &Connection,
  filter: &QuestionFilter,
  count: u32,
  mode: FetchMode,
  rng: &mut R,
) -> Result<Vec<Question>> {
  let count = count as u64;
  if count == 0 {
    return Ok(vec![]);
  }

  match mode {
    FetchMode::Deterministic => fetch_newest(conn, filter, count),
    FetchMode::Random => {
      let total = count_matching(conn, filter)?;
      match random_offset(total, count, rng) {
        None => fetch_window(conn, filter, total, 0),
        Some(offset) => {
          tracing::debug!("Sampling {} of {} questions at offset {}", count, total, offset);
          fetch_window(conn, filter, count, offset)
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::insert_question;
  use crate::domain::QuestionKind;
  use crate::testing::{sample_question, TestEnv};
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use std::collections::HashSet;

  fn seed(env: &TestEnv, n: usize) -> Vec<i64> {
    (0..n)
      .map(|i| {
        insert_question(&env.conn, &sample_question(&format!("q{}", i), 1, QuestionKind::Memorization))
          .unwrap()
          .unwrap()
      })
      .collect()
  }

  #[test]
  fn test_offset_within_bounds() {
    let mut rng = StdRng::seed_from_u64(7);
    for total in 1..40u64 {
      for count in 1..10u64 {
        match random_offset(total, count, &mut rng) {
          None => assert!(total <= count),
          Some(offset) => {
            assert!(total > count);
            assert!(offset <= total - count);
          }
        }
      }
    }
  }

  #[test]
  fn test_random_returns_all_when_total_not_above_count() {
    let env = TestEnv::new().unwrap();
    let ids = seed(&env, 4);
    let mut rng = StdRng::seed_from_u64(1);
    let got = fetch_questions(&env.conn, &QuestionFilter::active_only(), 4, FetchMode::Random, &mut rng)
      .unwrap();
    let got_ids: HashSet<i64> = got.iter().map(|q| q.id).collect();
    assert_eq!(got.len(), 4);
    assert_eq!(got_ids, ids.into_iter().collect());

    let more = fetch_questions(&env.conn, &QuestionFilter::active_only(), 50, FetchMode::Random, &mut rng)
      .unwrap();
    assert_eq!(more.len(), 4);
  }

  #[test]
  fn test_random_returns_exactly_count() {
    let env = TestEnv::new().unwrap();
    seed(&env, 25);
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..20 {
      let got = fetch_questions(&env.conn, &QuestionFilter::active_only(), 6, FetchMode::Random, &mut rng)
        .unwrap();
      assert_eq!(got.len(), 6);
      let unique: HashSet<i64> = got.iter().map(|q| q.id).collect();
      assert_eq!(unique.len(), 6);
    }
  }

  #[test]
  fn test_deterministic_takes_newest() {
    let env = TestEnv::new().unwrap();
    let ids = seed(&env, 5);
    let mut rng = StdRng::seed_from_u64(0);
    let got = fetch_questions(
      &env.conn,
      &QuestionFilter::active_only(),
      2,
      FetchMode::Deterministic,
      &mut rng,
    )
    .unwrap();
    assert_eq!(got.iter().map(|q| q.id).collect::<Vec<_>>(), vec![ids[4], ids[3]]);
  }

  #[test]
  fn test_no_matches_is_empty_not_error() {
    let env = TestEnv::new().unwrap();
    seed(&env, 3);
    let filter = QuestionFilter::for_unit(29, None, QuestionKind::Concepts);
    let mut rng = StdRng::seed_from_u64(3);
    for mode in [FetchMode::Deterministic, FetchMode::Random] {
      assert!(fetch_questions(&env.conn, &filter, 5, mode, &mut rng).unwrap().is_empty());
    }
    assert_eq!(count_matching(&env.conn, &filter).unwrap(), 0);
  }

  #[test]
  fn test_inactive_questions_excluded() {
    let env = TestEnv::new().unwrap();
    let ids = seed(&env, 3);
    crate::db::set_question_active(&env.conn, ids[1], false).unwrap();
    assert_eq!(count_matching(&env.conn, &QuestionFilter::active_only()).unwrap(), 2);
  }
}
