use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hifz_exam::{build_router, config, db, state::AppState};
use hifz_exam::db::LogOnError;

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hifz_exam=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let settings = config::load_settings();
  let pool = db::init_db(&settings.database_path).expect("Failed to initialize database");

  {
    let conn = pool.lock().expect("Database lock failed during startup");
    if let Some(removed) = db::cleanup_expired_sessions(&conn).log_warn("Failed to clean up expired sessions") {
      tracing::debug!("Removed {} expired sessions", removed);
    }
  }

  let app = build_router(AppState::new(pool));

  let bind_addr = settings.bind_addr();
  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://localhost:{}", settings.server_port);

  axum::serve(listener, app)
    .await
    .expect("Server failed to start");
}
