//! Support tickets and their message threads

use chrono::Utc;
use rusqlite::{params, Connection, Result, Row};

use crate::domain::{Ticket, TicketMessage, TicketStatus};

use super::optional;

fn row_to_ticket(row: &Row) -> Result<Ticket> {
  let status: String = row.get(3)?;
  Ok(Ticket {
    id: row.get(0)?,
    user_id: row.get(1)?,
    subject: row.get(2)?,
    status: TicketStatus::from_str(&status),
    created_at: row.get(4)?,
    updated_at: row.get(5)?,
  })
}

/// Open a ticket with its first message
pub fn create_ticket(conn: &Connection, user_id: i64, subject: &str, body: &str) -> Result<i64> {
  let now = Utc::now().to_rfc3339();
  let tx = conn.unchecked_transaction()?;
  tx.execute(
    "INSERT INTO tickets (user_id, subject, status, created_at, updated_at) VALUES (?1, ?2, 'open', ?3, ?3)",
    params![user_id, subject, now],
  )?;
  let ticket_id = tx.last_insert_rowid();
  tx.execute(
    "INSERT INTO ticket_messages (ticket_id, author_id, is_staff, body, created_at) VALUES (?1, ?2, 0, ?3, ?4)",
    params![ticket_id, user_id, body, now],
  )?;
  tx.commit()?;
  Ok(ticket_id)
}

pub fn get_ticket(conn: &Connection, id: i64) -> Result<Option<Ticket>> {
  optional(conn.query_row(
    "SELECT id, user_id, subject, status, created_at, updated_at FROM tickets WHERE id = ?1",
    params![id],
    row_to_ticket,
  ))
}

/// Tickets for one user, or every ticket when `user_id` is None
pub fn list_tickets(conn: &Connection, user_id: Option<i64>) -> Result<Vec<Ticket>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT id, user_id, subject, status, created_at, updated_at FROM tickets
    WHERE ?1 IS NULL OR user_id = ?1
    ORDER BY updated_at DESC, id DESC
    "#,
  )?;
  stmt.query_map(params![user_id], row_to_ticket)?.collect()
}

pub fn get_ticket_messages(conn: &Connection, ticket_id: i64) -> Result<Vec<TicketMessage>> {
  let mut stmt = conn.prepare(
    "SELECT id, ticket_id, author_id, is_staff, body, created_at FROM ticket_messages \
     WHERE ticket_id = ?1 ORDER BY id",
  )?;
  stmt
    .query_map(params![ticket_id], |row| {
      Ok(TicketMessage {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        author_id: row.get(2)?,
        is_staff: row.get(3)?,
        body: row.get(4)?,
        created_at: row.get(5)?,
      })
    })?
    .collect()
}

/// Append a reply; staff replies mark the ticket answered, owner replies reopen it
pub fn add_ticket_message(
  conn: &Connection,
  ticket_id: i64,
  author_id: i64,
  is_staff: bool,
  body: &str,
) -> Result<i64> {
  let now = Utc::now().to_rfc3339();
  let status = if is_staff { TicketStatus::Answered } else { TicketStatus::Open };
  let tx = conn.unchecked_transaction()?;
  tx.execute(
    "INSERT INTO ticket_messages (ticket_id, author_id, is_staff, body, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    params![ticket_id, author_id, is_staff, body, now],
  )?;
  let message_id = tx.last_insert_rowid();
  tx.execute(
    "UPDATE tickets SET status = ?1, updated_at = ?2 WHERE id = ?3",
    params![status.as_str(), now, ticket_id],
  )?;
  tx.commit()?;
  Ok(message_id)
}

pub fn set_ticket_status(conn: &Connection, ticket_id: i64, status: TicketStatus) -> Result<bool> {
  let changed = conn.execute(
    "UPDATE tickets SET status = ?1, updated_at = ?2 WHERE id = ?3",
    params![status.as_str(), Utc::now().to_rfc3339(), ticket_id],
  )?;
  Ok(changed > 0)
}

pub fn count_open_tickets(conn: &Connection) -> Result<i64> {
  conn.query_row(
    "SELECT COUNT(*) FROM tickets WHERE status = 'open'",
    [],
    |row| row.get(0),
  )
}
