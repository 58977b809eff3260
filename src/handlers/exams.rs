//! Exam endpoints: custom composition, official exams, publishing and attempts.

use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::AuthContext;
use crate::config::{page_size, JUZ_COUNT};
use crate::db;
use crate::domain::{Attempt, Exam, Feature, OfficialExamQuestion};
use crate::error::{AppError, AppResult};
use crate::services::access::{self, can_manage_exam, can_view_exam};
use crate::services::attempts::{self, StartedAttempt};
use crate::services::exams::{self, ComposedExam, OfficialExamInput};
use crate::state::AppState;
use crate::validation::{ExamRequest, ValidationErrors};

const MAX_DURATION_MINUTES: i64 = 300;

fn check_duration(value: Option<i64>, errors: &mut ValidationErrors) -> Option<u32> {
  match value {
    None => None,
    Some(m) if (1..=MAX_DURATION_MINUTES).contains(&m) => Some(m as u32),
    Some(_) => {
      errors.push(
        "durationMinutes",
        format!("must be between 1 and {}", MAX_DURATION_MINUTES),
      );
      None
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamBody {
  pub title: Option<String>,
  pub duration_minutes: Option<i64>,
  #[serde(flatten)]
  pub request: ExamRequest,
}

/// POST /api/exams - compose a custom exam from filters
pub async fn create_exam(
  auth: AuthContext,
  State(state): State<AppState>,
  Json(body): Json<CreateExamBody>,
) -> AppResult<impl IntoResponse> {
  let mut errors = ValidationErrors::default();
  let duration = check_duration(body.duration_minutes, &mut errors);
  let spec = match body.request.validate() {
    Ok(spec) if errors.is_empty() => spec,
    Ok(_) => return Err(errors.into()),
    Err(mut spec_errors) => {
      for e in errors.fields() {
        spec_errors.push(e.field.clone(), e.message.clone());
      }
      return Err(spec_errors.into());
    }
  };

  let conn = db::try_lock(&state.db)?;
  let now = Utc::now();
  access::check_feature(&conn, auth.user_id, auth.role, Feature::CustomExams, now)?;
  access::check_custom_exam_quota(&conn, auth.user_id, auth.role, now)?;

  let mut rng = rand::rng();
  let composed = exams::create_custom_exam(
    &conn,
    auth.user_id,
    body.title.as_deref(),
    duration,
    &spec,
    &mut rng,
  )?;
  Ok((StatusCode::CREATED, Json(composed)))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
  pub limit: Option<i64>,
  pub offset: Option<i64>,
}

/// GET /api/exams - own and published exams (admins see all)
pub async fn list_exams(
  auth: AuthContext,
  State(state): State<AppState>,
  Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<Exam>>> {
  let conn = db::try_lock(&state.db)?;
  let (limit, offset) = (page_size(page.limit), page.offset.unwrap_or(0).max(0));
  let exams = if auth.is_admin() {
    db::list_all_exams(&conn, limit, offset)?
  } else {
    db::list_visible_exams(&conn, auth.user_id, limit, offset)?
  };
  Ok(Json(exams))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamDetail {
  #[serde(flatten)]
  pub exam: Exam,
  pub question_count: usize,
}

fn load_exam(conn: &rusqlite::Connection, id: i64) -> AppResult<Exam> {
  db::get_exam(conn, id)?.ok_or(AppError::NotFound("Exam"))
}

/// GET /api/exams/{id}
pub async fn get_exam(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> AppResult<Json<ExamDetail>> {
  let conn = db::try_lock(&state.db)?;
  let exam = load_exam(&conn, id)?;
  if !can_view_exam(&exam, auth.user_id, auth.role) {
    return Err(AppError::NotFound("Exam"));
  }
  let question_count = db::get_exam_structure(&conn, id)?.len();
  Ok(Json(ExamDetail { exam, question_count }))
}

/// DELETE /api/exams/{id}
pub async fn delete_exam(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> AppResult<StatusCode> {
  let conn = db::try_lock(&state.db)?;
  let exam = load_exam(&conn, id)?;
  if !can_manage_exam(&exam, auth.user_id, auth.role) {
    return Err(AppError::forbidden());
  }
  db::delete_exam(&conn, id)?;
  tracing::info!("User {} deleted exam {}", auth.username, id);
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PublishBody {
  pub published: bool,
}

/// POST /api/exams/{id}/publish - teachers, institutes and admins share exams
pub async fn publish_exam(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
  Json(body): Json<PublishBody>,
) -> AppResult<Json<Exam>> {
  if !auth.role.can_publish() {
    return Err(AppError::forbidden());
  }
  let conn = db::try_lock(&state.db)?;
  let exam = load_exam(&conn, id)?;
  if !can_manage_exam(&exam, auth.user_id, auth.role) {
    return Err(AppError::forbidden());
  }
  if body.published && db::get_exam_structure(&conn, id)?.is_empty() {
    return Err(AppError::BadRequest("آزمون بدون سوال قابل انتشار نیست".to_string()));
  }
  db::set_exam_published(&conn, id, body.published)?;
  Ok(Json(load_exam(&conn, id)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficialExamBody {
  pub title: String,
  pub juz_start: i64,
  pub juz_end: i64,
  pub year: Option<i32>,
  pub duration_minutes: Option<i64>,
}

impl OfficialExamBody {
  fn validate(&self) -> Result<OfficialExamInput, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if self.title.trim().is_empty() {
      errors.push("title", "must not be empty");
    }
    for (field, value) in [("juzStart", self.juz_start), ("juzEnd", self.juz_end)] {
      if !(1..=JUZ_COUNT as i64).contains(&value) {
        errors.push(field, format!("must be between 1 and {}", JUZ_COUNT));
      }
    }
    let duration = check_duration(self.duration_minutes, &mut errors);
    if !errors.is_empty() {
      return Err(errors);
    }
    Ok(OfficialExamInput {
      title: self.title.clone(),
      juz_start: self.juz_start as u8,
      juz_end: self.juz_end as u8,
      year: self.year,
      duration_minutes: duration.unwrap_or(crate::config::DEFAULT_EXAM_MINUTES),
    })
  }
}

/// POST /api/exams/official (admin)
pub async fn create_official_exam(
  auth: AuthContext,
  State(state): State<AppState>,
  Json(body): Json<OfficialExamBody>,
) -> AppResult<impl IntoResponse> {
  auth.require_admin()?;
  let input = body.validate()?;
  let conn = db::try_lock(&state.db)?;
  let composed: ComposedExam = exams::create_official_exam(&conn, auth.user_id, &input)?;
  Ok((StatusCode::CREATED, Json(composed)))
}

/// GET /api/exams/{id}/structure (creator or admin)
pub async fn get_structure(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> AppResult<Json<Vec<OfficialExamQuestion>>> {
  let conn = db::try_lock(&state.db)?;
  let exam = load_exam(&conn, id)?;
  if !can_manage_exam(&exam, auth.user_id, auth.role) {
    return Err(AppError::forbidden());
  }
  Ok(Json(db::get_exam_structure(&conn, id)?))
}

/// POST /api/exams/{id}/structure (admin) - rebuild an official exam
pub async fn rebuild_structure(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> AppResult<Json<Vec<OfficialExamQuestion>>> {
  auth.require_admin()?;
  let conn = db::try_lock(&state.db)?;
  let exam = load_exam(&conn, id)?;
  Ok(Json(exams::rebuild_official_exam(&conn, &exam)?))
}

/// POST /api/exams/{id}/attempts - start taking an exam
pub async fn start_attempt(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
  let conn = db::try_lock(&state.db)?;
  let exam = load_exam(&conn, id)?;
  let started: StartedAttempt = attempts::start_attempt(&conn, &exam, auth.user_id, auth.role, Utc::now())?;
  Ok((StatusCode::CREATED, Json(started)))
}

/// GET /api/exams/{id}/attempts - results on an exam, for its creator
pub async fn list_exam_attempts(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> AppResult<Json<Vec<Attempt>>> {
  let conn = db::try_lock(&state.db)?;
  let exam = load_exam(&conn, id)?;
  if !can_manage_exam(&exam, auth.user_id, auth.role) {
    return Err(AppError::forbidden());
  }
  Ok(Json(db::list_exam_attempts(&conn, id)?))
}
