pub mod admin;
pub mod attempts;
pub mod dashboard;
pub mod exams;
pub mod questions;
pub mod subscriptions;
pub mod tickets;

use askama::Template;
use axum::{
  extract::{Path, State},
  response::Html,
};

use crate::auth::OptionalAuth;
use crate::config::JUZ_COUNT;
use crate::db::{self, LogOnError};
use crate::domain::Exam;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Published official exam as listed on the landing page
pub struct ExamCard {
  pub id: i64,
  pub title: String,
  pub scope: String,
  pub duration_minutes: u32,
}

impl ExamCard {
  fn from_exam(exam: &Exam) -> Self {
    let mut scope = match (exam.juz_start, exam.juz_end) {
      (Some(start), Some(end)) if start == end => format!("جزء {}", start),
      (Some(start), Some(end)) => format!("جزء {} تا {}", start, end),
      _ => String::new(),
    };
    if let Some(year) = exam.year {
      if !scope.is_empty() {
        scope.push_str(" - ");
      }
      scope.push_str(&format!("سال {}", year));
    }
    Self {
      id: exam.id,
      title: exam.title.clone(),
      scope,
      duration_minutes: exam.duration_minutes,
    }
  }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
  pub username: Option<String>,
  pub exams: Vec<ExamCard>,
  pub question_count: i64,
}

pub async fn index(OptionalAuth(auth): OptionalAuth, State(state): State<AppState>) -> AppResult<Html<String>> {
  let conn = db::try_lock(&state.db)?;

  let exams = db::list_published_official(&conn)
    .log_warn_default("Failed to load published official exams")
    .iter()
    .map(ExamCard::from_exam)
    .collect();
  let question_count = db::count_active_questions(&conn).log_warn_default("Failed to count questions");

  let template = IndexTemplate {
    username: auth.map(|a| a.username),
    exams,
    question_count,
  };
  Ok(Html(template.render().unwrap_or_default()))
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
  pub logged_in: bool,
}

pub async fn login_page(OptionalAuth(auth): OptionalAuth) -> Html<String> {
  let template = LoginTemplate {
    logged_in: auth.is_some(),
  };
  Html(template.render().unwrap_or_default())
}

#[derive(Template)]
#[template(path = "juz.html")]
pub struct JuzTemplate {
  pub juz: u8,
  pub memorization: i64,
  pub concepts: i64,
  pub prev: Option<u8>,
  pub next: Option<u8>,
}

/// GET /juz/{n} - public question counts for one juz
pub async fn juz_page(State(state): State<AppState>, Path(juz): Path<i64>) -> AppResult<Html<String>> {
  let juz = u8::try_from(juz)
    .ok()
    .filter(|n| (1..=JUZ_COUNT).contains(n))
    .ok_or(AppError::NotFound("Juz"))?;
  let conn = db::try_lock(&state.db)?;
  let (memorization, concepts) = db::count_active_by_juz(&conn, juz)?;

  let template = JuzTemplate {
    juz,
    memorization,
    concepts,
    prev: (juz > 1).then(|| juz - 1),
    next: (juz < JUZ_COUNT).then(|| juz + 1),
  };
  Ok(Html(template.render().unwrap_or_default()))
}
