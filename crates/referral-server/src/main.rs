//! # referral-server
//!
//! HTTP backend for the doctor referral network.
//!
//! This binary provides:
//! - **Accounts**: registration and NPI id / password login with cookie
//!   sessions
//! - **Connections** between doctors, requested by one and answered by the
//!   other
//! - **Referral appointments** with priorities; accepting one connects the
//!   two doctors
//! - **Messaging** with file attachments between connected doctors
//! - **Avatar uploads** and a static file route for stored uploads

mod api;
mod config;
mod error;
mod services;
mod session;
mod upload_store;

use std::sync::{Arc, Mutex};

use tracing::info;
use tracing_subscriber::EnvFilter;

use referral_shared::crypto::PasswordHasher;
use referral_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::session::SessionStore;
use crate::upload_store::UploadStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,referral_server=debug")),
        )
        .init();

    info!("Starting referral server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    info!(path = ?db.path(), "Database ready");

    let hasher = PasswordHasher::new(config.password_iterations);

    if config.seed_demo_doctors {
        let created = services::identity::seed_demo_doctors(&db, &hasher)?;
        info!(created, "Demo doctors seeded");
    }

    let uploads =
        Arc::new(UploadStore::new(config.upload_path.clone(), config.max_upload_size).await?);

    let sessions = SessionStore::new(config.session_ttl_secs);

    let http_addr = config.http_addr;
    let app_state = AppState {
        db: Arc::new(Mutex::new(db)),
        sessions: sessions.clone(),
        uploads,
        hasher,
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic session cleanup (every 10 minutes)
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            interval.tick().await;
            let purged = sessions.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "Expired sessions removed");
            }
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
