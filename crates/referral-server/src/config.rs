//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use referral_shared::constants::{
    DEFAULT_HTTP_PORT, DEFAULT_SESSION_TTL_SECS, MAX_UPLOAD_SIZE, PBKDF2_ITERATIONS,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`, or `PORT` to bind `0.0.0.0:<PORT>`
    /// Default: `0.0.0.0:5003`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: none (platform data directory).
    pub database_path: Option<PathBuf>,

    /// Root directory for message attachments and avatars.
    /// Env: `UPLOAD_PATH`
    /// Default: `./static/uploads`
    pub upload_path: PathBuf,

    /// Maximum size of a single uploaded file in bytes.
    /// Env: `MAX_UPLOAD_SIZE`
    /// Default: 16 MiB
    pub max_upload_size: usize,

    /// Session lifetime in seconds.
    /// Env: `SESSION_TTL_SECS`
    /// Default: 30 days
    pub session_ttl_secs: i64,

    /// PBKDF2 rounds for newly hashed passwords.
    /// Env: `PASSWORD_ITERATIONS`
    /// Default: `600000`
    pub password_iterations: u32,

    /// Insert the four demo doctors (NPI001..NPI004) at startup if missing.
    /// Env: `SEED_DEMO_DOCTORS` (true/false)
    /// Default: `false`
    pub seed_demo_doctors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            upload_path: PathBuf::from("./static/uploads"),
            max_upload_size: MAX_UPLOAD_SIZE,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            password_iterations: PBKDF2_ITERATIONS,
            seed_demo_doctors: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            match port.parse::<u16>() {
                Ok(port) => config.http_addr = ([0, 0, 0, 0], port).into(),
                Err(_) => tracing::warn!(value = %port, "Invalid PORT, using default"),
            }
        }

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(path) = lookup("UPLOAD_PATH") {
            config.upload_path = PathBuf::from(path);
        }

        if let Some(val) = lookup("MAX_UPLOAD_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_upload_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_UPLOAD_SIZE, using default"),
            }
        }

        if let Some(val) = lookup("SESSION_TTL_SECS") {
            match val.parse::<i64>() {
                Ok(n) if n > 0 => config.session_ttl_secs = n,
                _ => tracing::warn!(value = %val, "Invalid SESSION_TTL_SECS, using default"),
            }
        }

        if let Some(val) = lookup("PASSWORD_ITERATIONS") {
            match val.parse::<u32>() {
                Ok(n) if n > 0 => config.password_iterations = n,
                _ => tracing::warn!(value = %val, "Invalid PASSWORD_ITERATIONS, using default"),
            }
        }

        if let Some(val) = lookup("SEED_DEMO_DOCTORS") {
            config.seed_demo_doctors = val == "true" || val == "1";
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> ServerConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 5003).into());
        assert_eq!(config.max_upload_size, 16 * 1024 * 1024);
        assert!(config.database_path.is_none());
        assert!(!config.seed_demo_doctors);
    }

    #[test]
    fn test_port_and_http_addr() {
        let config = from_pairs(&[("PORT", "8000")]);
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8000).into());

        let config = from_pairs(&[("PORT", "8000"), ("HTTP_ADDR", "127.0.0.1:9000")]);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = from_pairs(&[
            ("HTTP_ADDR", "not-an-addr"),
            ("PASSWORD_ITERATIONS", "0"),
            ("SESSION_TTL_SECS", "soon"),
        ]);
        let default = ServerConfig::default();
        assert_eq!(config.http_addr, default.http_addr);
        assert_eq!(config.password_iterations, default.password_iterations);
        assert_eq!(config.session_ttl_secs, default.session_ttl_secs);
    }

    #[test]
    fn test_seed_and_paths() {
        let config = from_pairs(&[
            ("SEED_DEMO_DOCTORS", "true"),
            ("DATABASE_PATH", "/tmp/referral.db"),
            ("UPLOAD_PATH", "/tmp/uploads"),
        ]);
        assert!(config.seed_demo_doctors);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/referral.db")));
        assert_eq!(config.upload_path, PathBuf::from("/tmp/uploads"));
    }
}
