//! Question bank administration: CRUD, soft deactivation and bulk import.

use axum::{
  extract::{Multipart, Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthContext;
use crate::config::page_size;
use crate::db::{self, ImportSummary};
use crate::domain::{Difficulty, Question, QuestionKind};
use crate::error::{AppError, AppResult};
use crate::import;
use crate::selection::{Condition, QuestionFilter};
use crate::state::AppState;
use crate::validation::{validate_import, ImportedQuestion, ValidationErrors};

const MSG_DUPLICATE: &str = "سوالی با همین متن قبلاً ثبت شده است";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionQuery {
  pub juz: Option<u8>,
  pub surah: Option<u16>,
  pub year: Option<i32>,
  pub kind: Option<String>,
  pub difficulty: Option<String>,
  pub topic: Option<String>,
  #[serde(default)]
  pub include_inactive: bool,
  pub limit: Option<i64>,
  pub offset: Option<i64>,
}

impl QuestionQuery {
  fn to_filter(&self) -> Result<QuestionFilter, ValidationErrors> {
    let mut filter = if self.include_inactive {
      QuestionFilter::any()
    } else {
      QuestionFilter::active_only()
    };
    if let Some(juz) = self.juz {
      filter = filter.and(Condition::IntEq { column: "juz", value: juz as i64 });
    }
    if let Some(surah) = self.surah {
      filter = filter.and(Condition::IntEq { column: "surah_id", value: surah as i64 });
    }
    if let Some(year) = self.year {
      filter = filter.and(Condition::IntEq { column: "year", value: year as i64 });
    }
    if let Some(raw) = self.kind.as_deref() {
      let kind = QuestionKind::from_str(raw)
        .ok_or_else(|| ValidationErrors::single("kind", format!("unknown question kind '{}'", raw)))?;
      filter = filter.and(Condition::TextEq { column: "kind", value: kind.as_str().to_string() });
    }
    if let Some(raw) = self.difficulty.as_deref() {
      let difficulty = Difficulty::from_str(raw)
        .ok_or_else(|| ValidationErrors::single("difficulty", format!("unknown difficulty '{}'", raw)))?;
      filter = filter.and(Condition::TextEq {
        column: "difficulty",
        value: difficulty.as_str().to_string(),
      });
    }
    if let Some(topic) = self.topic.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
      filter = filter.and(Condition::TextEq { column: "topic", value: topic.to_string() });
    }
    Ok(filter)
  }
}

/// GET /api/questions
pub async fn list_questions(
  auth: AuthContext,
  State(state): State<AppState>,
  Query(query): Query<QuestionQuery>,
) -> AppResult<Json<Vec<Question>>> {
  auth.require_admin()?;
  let filter = query.to_filter()?;
  let conn = db::try_lock(&state.db)?;
  let questions = db::list_questions(
    &conn,
    &filter,
    page_size(query.limit),
    query.offset.unwrap_or(0).max(0),
  )?;
  Ok(Json(questions))
}

/// GET /api/questions/{id}
pub async fn get_question(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> AppResult<Json<Question>> {
  auth.require_admin()?;
  let conn = db::try_lock(&state.db)?;
  let question = db::get_question(&conn, id)?.ok_or(AppError::NotFound("Question"))?;
  Ok(Json(question))
}

/// POST /api/questions
pub async fn create_question(
  auth: AuthContext,
  State(state): State<AppState>,
  Json(body): Json<ImportedQuestion>,
) -> AppResult<impl IntoResponse> {
  auth.require_admin()?;
  let question = body.validate("")?;
  let conn = db::try_lock(&state.db)?;
  let id = db::insert_question(&conn, &question)?
    .ok_or_else(|| AppError::Conflict(MSG_DUPLICATE.to_string()))?;
  let created = db::get_question(&conn, id)?.ok_or(AppError::NotFound("Question"))?;
  Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/questions/{id}
pub async fn update_question(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
  Json(body): Json<ImportedQuestion>,
) -> AppResult<Json<Question>> {
  auth.require_admin()?;
  let question = body.validate("")?;
  let conn = db::try_lock(&state.db)?;
  let updated = db::update_question(&conn, id, &question).map_err(|e| {
    if db::is_constraint_violation(&e) {
      AppError::Conflict(MSG_DUPLICATE.to_string())
    } else {
      e.into()
    }
  })?;
  if !updated {
    return Err(AppError::NotFound("Question"));
  }
  let question = db::get_question(&conn, id)?.ok_or(AppError::NotFound("Question"))?;
  Ok(Json(question))
}

/// DELETE /api/questions/{id} - deactivate; questions are never hard-deleted
pub async fn deactivate_question(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> AppResult<StatusCode> {
  auth.require_admin()?;
  let conn = db::try_lock(&state.db)?;
  if !db::set_question_active(&conn, id, false)? {
    return Err(AppError::NotFound("Question"));
  }
  tracing::info!("Admin {} deactivated question {}", auth.username, id);
  Ok(StatusCode::NO_CONTENT)
}

/// POST /api/questions/{id}/activate
pub async fn activate_question(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> AppResult<StatusCode> {
  auth.require_admin()?;
  let conn = db::try_lock(&state.db)?;
  if !db::set_question_active(&conn, id, true)? {
    return Err(AppError::NotFound("Question"));
  }
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ImportBody {
  pub questions: Vec<ImportedQuestion>,
}

/// POST /api/questions/import - insert previewed rows, skipping duplicates
pub async fn import_questions(
  auth: AuthContext,
  State(state): State<AppState>,
  Json(body): Json<ImportBody>,
) -> AppResult<Json<ImportSummary>> {
  auth.require_admin()?;
  let questions = validate_import(&body.questions)?;
  let conn = db::try_lock(&state.db)?;
  let summary = db::insert_questions_bulk(&conn, &questions)?;
  tracing::info!(
    "Admin {} imported {} questions ({} duplicates skipped)",
    auth.username,
    summary.inserted,
    summary.duplicates
  );
  Ok(Json(summary))
}

#[derive(Debug, Serialize)]
pub struct ParsePreview {
  pub filename: String,
  pub count: usize,
  pub questions: Vec<ImportedQuestion>,
  /// Row-level problems the editor must fix before importing
  pub errors: Vec<crate::validation::FieldError>,
}

/// POST /api/questions/parse - parse an uploaded document for preview
pub async fn parse_questions(auth: AuthContext, mut multipart: Multipart) -> AppResult<Json<ParsePreview>> {
  auth.require_admin()?;
  let (filename, bytes) = extract_uploaded_file(&mut multipart).await?;
  let questions = import::parse_upload(&filename, &bytes)?;
  let errors = match validate_import(&questions) {
    Ok(_) => vec![],
    Err(e) => e.fields().to_vec(),
  };
  Ok(Json(ParsePreview {
    filename,
    count: questions.len(),
    questions,
    errors,
  }))
}

/// Extract the `file` field from a multipart upload
async fn extract_uploaded_file(multipart: &mut Multipart) -> AppResult<(String, Vec<u8>)> {
  while let Ok(Some(field)) = multipart.next_field().await {
    if field.name() != Some("file") {
      continue;
    }
    let filename = field.file_name().unwrap_or("upload.txt").to_string();
    let bytes = field
      .bytes()
      .await
      .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
    return Ok((filename, bytes.to_vec()));
  }
  Err(AppError::BadRequest("No file uploaded".to_string()))
}
