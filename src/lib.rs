pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod import;
pub mod paths;
pub mod selection;
pub mod services;
pub mod session;
pub mod state;
pub mod validation;

#[cfg(test)]
pub mod testing;

use axum::{
  extract::DefaultBodyLimit,
  routing::{get, post, put},
  Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use state::AppState;

fn api_routes() -> Router<AppState> {
  Router::new()
    // Auth
    .route("/auth/register", post(auth::register))
    .route("/auth/login", post(auth::login))
    .route("/auth/logout", post(auth::logout))
    .route("/auth/me", get(auth::me))
    .route("/dashboard", get(handlers::dashboard::dashboard))
    // Question bank
    .route(
      "/questions",
      get(handlers::questions::list_questions).post(handlers::questions::create_question),
    )
    .route("/questions/import", post(handlers::questions::import_questions))
    .route("/questions/parse", post(handlers::questions::parse_questions))
    .route(
      "/questions/{id}",
      get(handlers::questions::get_question)
        .put(handlers::questions::update_question)
        .delete(handlers::questions::deactivate_question),
    )
    .route("/questions/{id}/activate", post(handlers::questions::activate_question))
    // Exams
    .route(
      "/exams",
      get(handlers::exams::list_exams).post(handlers::exams::create_exam),
    )
    .route("/exams/official", post(handlers::exams::create_official_exam))
    .route(
      "/exams/{id}",
      get(handlers::exams::get_exam).delete(handlers::exams::delete_exam),
    )
    .route("/exams/{id}/publish", post(handlers::exams::publish_exam))
    .route(
      "/exams/{id}/structure",
      get(handlers::exams::get_structure).post(handlers::exams::rebuild_structure),
    )
    .route(
      "/exams/{id}/attempts",
      get(handlers::exams::list_exam_attempts).post(handlers::exams::start_attempt),
    )
    // Attempts
    .route("/attempts", get(handlers::attempts::list_my_attempts))
    .route("/attempts/{id}", get(handlers::attempts::get_attempt))
    .route("/attempts/{id}/submit", post(handlers::attempts::submit_attempt))
    // Subscriptions
    .route("/subscriptions/plans", get(handlers::subscriptions::list_plans))
    .route("/subscriptions/me", get(handlers::subscriptions::my_subscription))
    // Support tickets
    .route(
      "/tickets",
      get(handlers::tickets::list_tickets).post(handlers::tickets::create_ticket),
    )
    .route("/tickets/{id}", get(handlers::tickets::get_ticket))
    .route("/tickets/{id}/messages", post(handlers::tickets::reply_ticket))
    .route("/tickets/{id}/close", post(handlers::tickets::close_ticket))
    // Admin
    .route("/admin/users", get(handlers::admin::list_users))
    .route("/admin/users/{id}/role", put(handlers::admin::set_user_role))
    .route("/admin/subscriptions", post(handlers::subscriptions::grant_subscription))
}

/// Full application router: JSON API, server-rendered pages and static assets
pub fn build_router(state: AppState) -> Router {
  Router::new()
    .route("/", get(handlers::index))
    .route("/login", get(handlers::login_page))
    .route("/juz/{n}", get(handlers::juz_page))
    .nest("/api", api_routes())
    .nest_service("/static", ServeDir::new(paths::STATIC_DIR))
    .layer(DefaultBodyLimit::max(config::MAX_UPLOAD_BYTES))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
