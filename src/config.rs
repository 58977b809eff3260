//! Application configuration.
//!
//! Runtime values load with priority config.toml > environment (.env) > default.
//! Business constants for exam composition live here as well.

use serde::Deserialize;
use std::path::PathBuf;

// ==================== Runtime Configuration ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct AppConfig {
    database: Option<DatabaseConfig>,
    server: Option<ServerConfig>,
}

#[derive(Debug, Deserialize)]
struct DatabaseConfig {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerConfig {
    addr: Option<String>,
    port: Option<u16>,
}

/// Resolved settings used by `main`
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: PathBuf,
    pub server_addr: String,
    pub server_port: u16,
}

impl Settings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_addr, self.server_port)
    }
}

fn read_config_file(path: &str) -> AppConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring malformed {}: {}", path, e);
                AppConfig::default()
            }
        },
        Err(_) => AppConfig::default(),
    }
}

/// Load settings with priority: config.toml > env (DATABASE_PATH, SERVER_ADDR, PORT) > default
pub fn load_settings() -> Settings {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let file = read_config_file("config.toml");
    let (file_db, file_server) = (file.database, file.server);

    let database_path = file_db
        .and_then(|db| db.path)
        .map(|path| {
            tracing::info!("Using database from config.toml: {}", path);
            PathBuf::from(path)
        })
        .or_else(|| {
            std::env::var("DATABASE_PATH").ok().map(|path| {
                tracing::info!("Using database from DATABASE_PATH env: {}", path);
                PathBuf::from(path)
            })
        })
        .unwrap_or_else(|| {
            let default = PathBuf::from(crate::paths::db_path());
            tracing::info!("Using default database path: {}", default.display());
            default
        });

    let server_addr = file_server
        .as_ref()
        .and_then(|s| s.addr.clone())
        .or_else(|| std::env::var("SERVER_ADDR").ok())
        .unwrap_or_else(|| SERVER_ADDR.to_string());

    let server_port = file_server
        .and_then(|s| s.port)
        .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
        .unwrap_or(SERVER_PORT);

    Settings {
        database_path,
        server_addr,
        server_port,
    }
}

// ==================== Server Configuration ====================

/// Default server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Default server port
pub const SERVER_PORT: u16 = 3000;

/// Largest accepted request body (question document uploads)
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

// ==================== Session Configuration ====================

/// Login session duration in hours (1 week)
pub const SESSION_DURATION_HOURS: i64 = 24 * 7;

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LEN: usize = 8;

// ==================== Exam Composition ====================

/// Memorization questions taken from each juz of an official exam
pub const MEMORIZATION_PER_UNIT: usize = 2;

/// Concept questions taken from each juz of an official exam
pub const CONCEPTS_PER_UNIT: usize = 3;

/// Upper bound on questions in a custom exam
pub const MAX_QUESTIONS_PER_EXAM: u32 = 100;

/// Default attempt duration when the exam does not set one
pub const DEFAULT_EXAM_MINUTES: u32 = 30;

/// Seconds accepted after the deadline to absorb network latency
pub const SUBMIT_GRACE_SECONDS: i64 = 30;

// ==================== Quran Bounds ====================

pub const JUZ_COUNT: u8 = 30;
pub const SURAH_COUNT: u16 = 114;

// ==================== Query Limits ====================

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: i64 = 200;

/// Recent attempts shown on the student dashboard
pub const RECENT_ATTEMPTS_LIMIT: i64 = 5;

/// Clamp a client-supplied page size
pub fn page_size(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE)
}
