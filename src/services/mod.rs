//! Application services.
//!
//! Logic shared by several handlers lives here so handlers stay thin:
//! they extract, lock the database, call a service and serialize.

pub mod access;
pub mod attempts;
pub mod exams;
