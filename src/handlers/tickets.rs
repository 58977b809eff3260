//! Support tickets.

use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::auth::AuthContext;
use crate::db;
use crate::domain::{Ticket, TicketMessage, TicketStatus};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::validation::ValidationErrors;

const MAX_SUBJECT_CHARS: usize = 200;
const MAX_BODY_CHARS: usize = 5000;

#[derive(Debug, Deserialize)]
pub struct NewTicketBody {
  pub subject: String,
  pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplyBody {
  pub body: String,
}

#[derive(Debug, Serialize)]
pub struct TicketThread {
  pub ticket: Ticket,
  pub messages: Vec<TicketMessage>,
}

fn check_text(field: &str, value: &str, max: usize, errors: &mut ValidationErrors) {
  let len = value.trim().chars().count();
  if len == 0 {
    errors.push(field, "must not be empty");
  } else if len > max {
    errors.push(field, format!("must be at most {} characters", max));
  }
}

/// Load a ticket the caller may see (owner or admin)
fn visible_ticket(conn: &Connection, auth: &AuthContext, id: i64) -> AppResult<Ticket> {
  db::get_ticket(conn, id)?
    .filter(|t| auth.is_admin() || t.user_id == auth.user_id)
    .ok_or(AppError::NotFound("Ticket"))
}

/// POST /api/tickets
pub async fn create_ticket(
  auth: AuthContext,
  State(state): State<AppState>,
  Json(body): Json<NewTicketBody>,
) -> AppResult<impl IntoResponse> {
  let mut errors = ValidationErrors::default();
  check_text("subject", &body.subject, MAX_SUBJECT_CHARS, &mut errors);
  check_text("body", &body.body, MAX_BODY_CHARS, &mut errors);
  if !errors.is_empty() {
    return Err(errors.into());
  }

  let conn = db::try_lock(&state.db)?;
  let id = db::create_ticket(&conn, auth.user_id, body.subject.trim(), body.body.trim())?;
  let thread = TicketThread {
    ticket: visible_ticket(&conn, &auth, id)?,
    messages: db::get_ticket_messages(&conn, id)?,
  };
  Ok((StatusCode::CREATED, Json(thread)))
}

/// GET /api/tickets - own tickets; admins see every ticket
pub async fn list_tickets(
  auth: AuthContext,
  State(state): State<AppState>,
) -> AppResult<Json<Vec<Ticket>>> {
  let conn = db::try_lock(&state.db)?;
  let scope = if auth.is_admin() { None } else { Some(auth.user_id) };
  Ok(Json(db::list_tickets(&conn, scope)?))
}

/// GET /api/tickets/{id}
pub async fn get_ticket(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> AppResult<Json<TicketThread>> {
  let conn = db::try_lock(&state.db)?;
  let ticket = visible_ticket(&conn, &auth, id)?;
  let messages = db::get_ticket_messages(&conn, id)?;
  Ok(Json(TicketThread { ticket, messages }))
}

/// POST /api/tickets/{id}/messages
pub async fn reply_ticket(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
  Json(body): Json<ReplyBody>,
) -> AppResult<Json<TicketThread>> {
  let mut errors = ValidationErrors::default();
  check_text("body", &body.body, MAX_BODY_CHARS, &mut errors);
  if !errors.is_empty() {
    return Err(errors.into());
  }

  let conn = db::try_lock(&state.db)?;
  let ticket = visible_ticket(&conn, &auth, id)?;
  if ticket.status == TicketStatus::Closed {
    return Err(AppError::Conflict("این تیکت بسته شده است".to_string()));
  }
  // Staff replies only count as such on someone else's ticket
  let is_staff = auth.is_admin() && ticket.user_id != auth.user_id;
  db::add_ticket_message(&conn, id, auth.user_id, is_staff, body.body.trim())?;

  Ok(Json(TicketThread {
    ticket: visible_ticket(&conn, &auth, id)?,
    messages: db::get_ticket_messages(&conn, id)?,
  }))
}

/// POST /api/tickets/{id}/close
pub async fn close_ticket(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> AppResult<Json<Ticket>> {
  let conn = db::try_lock(&state.db)?;
  visible_ticket(&conn, &auth, id)?;
  db::set_ticket_status(&conn, id, TicketStatus::Closed)?;
  Ok(Json(visible_ticket(&conn, &auth, id)?))
}
