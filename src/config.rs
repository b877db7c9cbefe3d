// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Marks awarded for a correct answer when the question does not configure any.
pub const DEFAULT_QUESTION_MARKS: i32 = 1;

/// Below this many remaining seconds the practice timer reports an urgent state.
pub const URGENT_THRESHOLD_SECONDS: u32 = 300;

/// How many times attempt creation is retried after losing an attempt-number race.
pub const ATTEMPT_INSERT_RETRIES: u32 = 3;

/// Prefix of the local storage key a practice paper persists its timer snapshot under.
pub const PRACTICE_STORAGE_PREFIX: &str = "practice_";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub server_port: u16,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        Self {
            database_url,
            jwt_secret,
            rust_log,
            server_port,
            log_dir,
        }
    }
}
