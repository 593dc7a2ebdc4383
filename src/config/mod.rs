//! Configuration module for the YelpCamp backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Longest accepted session lifetime: ten years.
pub const MAX_SESSION_TTL_HOURS: i64 = 8760 * 10;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Lifetime of a login session in hours
    pub session_ttl_hours: i64,
    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let db_path = env::var("YELPCAMP_DB_PATH")
            .unwrap_or_else(|_| "./data/yelpcamp.sqlite".to_string())
            .into();

        let bind_addr = env::var("YELPCAMP_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|e| format!("Invalid YELPCAMP_BIND_ADDR format: {}", e))?;

        let log_level = env::var("YELPCAMP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let session_ttl_hours = match env::var("YELPCAMP_SESSION_TTL_HOURS") {
            Ok(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|hours| (1..=MAX_SESSION_TTL_HOURS).contains(hours))
                .ok_or_else(|| format!("Invalid YELPCAMP_SESSION_TTL_HOURS: {}", raw))?,
            Err(_) => 168,
        };

        let secure_cookies = env::var("YELPCAMP_SECURE_COOKIES")
            .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            session_ttl_hours,
            secure_cookies,
        })
    }
}
