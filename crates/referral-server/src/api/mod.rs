//! HTTP surface.
//!
//! Handlers resolve the caller from the session, hand an explicit
//! [`DoctorId`] to the service layer and render the result as JSON.  Database
//! work and password hashing run on the blocking pool.

mod consultations;
mod identity;
mod messaging;
mod network;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use referral_shared::crypto::PasswordHasher;
use referral_shared::DoctorId;
use referral_store::Database;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::services;
use crate::session::SessionStore;
use crate::upload_store::{UploadStore, UPLOADS_URL_PREFIX};

/// Room for multipart framing and text fields on top of the file itself.
const FORM_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub sessions: SessionStore,
    pub uploads: Arc<UploadStore>,
    pub hasher: PasswordHasher,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Resolve the session in `headers` to a doctor.
    pub async fn caller(&self, headers: &HeaderMap) -> Result<DoctorId, ServerError> {
        self.sessions.caller(headers).await
    }

    /// Run a synchronous service call against the database on the blocking
    /// pool.
    pub async fn with_db<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, ServerError> + Send + 'static,
    {
        services::with_db(&self.db, f).await
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_size + FORM_OVERHEAD;
    let uploads = ServeDir::new(state.uploads.base_path());

    Router::new()
        .route("/health", get(health_check))
        .route("/register", post(identity::register))
        .route("/login", post(identity::login))
        .route("/logout", post(identity::logout))
        .route("/profile", get(identity::profile))
        .route("/upload_avatar", post(identity::upload_avatar))
        .route("/doctors", get(network::doctors))
        .route("/requests", get(network::requests))
        .route("/send_request/:doctor_id", post(network::send_request))
        .route("/handle_request/:id/:action", post(network::handle_request))
        .route("/consultation", get(consultations::consultation))
        .route("/book_appointment", post(consultations::book_appointment))
        .route("/cancel_appointment/:id", post(consultations::cancel_appointment))
        .route(
            "/handle_appointment/:id/:action",
            post(consultations::handle_appointment),
        )
        .route("/messages", get(messaging::messages))
        .route("/get_messages/:doctor_id", get(messaging::get_messages))
        .route("/send_message", post(messaging::send_message))
        .nest_service(UPLOADS_URL_PREFIX, uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// A file part of a multipart form.
#[derive(Debug)]
struct FilePart {
    file_name: String,
    data: Vec<u8>,
}

/// Text fields plus file parts of a multipart form.
#[derive(Debug, Default)]
struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, FilePart>,
}

impl MultipartForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServerError::Validation(format!("Multipart error: {e}")))?
        {
            let name = field.name().unwrap_or("").to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let data = field.bytes().await.map_err(|e| {
                        ServerError::Validation(format!("Failed to read field: {e}"))
                    })?;
                    // Browsers send an empty, unnamed part when no file was picked.
                    if file_name.is_empty() && data.is_empty() {
                        continue;
                    }
                    form.files.insert(
                        name,
                        FilePart {
                            file_name,
                            data: data.to_vec(),
                        },
                    );
                }
                None => {
                    let text = field.text().await.map_err(|e| {
                        ServerError::Validation(format!("Failed to read field: {e}"))
                    })?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    fn take_file(&mut self, name: &str) -> Option<FilePart> {
        self.files.remove(name)
    }
}

/// Parse a doctor id submitted as a form field.
fn parse_doctor_id(raw: &str) -> Result<DoctorId, ServerError> {
    raw.trim()
        .parse::<i64>()
        .map(DoctorId)
        .map_err(|_| ServerError::Validation(format!("Invalid doctor id: {raw}")))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}


#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::testing::*;

    #[tokio::test]
    async fn health_is_public() {
        let app = TestApp::new().await;
        let (status, json) = app.send(get("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn protected_routes_need_a_session() {
        let app = TestApp::new().await;
        for uri in ["/profile", "/doctors", "/requests", "/consultation", "/messages"] {
            let (status, json) = app.send(get(uri, None)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert!(json["error"].is_string());
        }
        let (status, _) = app.send(get("/profile", Some("bogus"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn uploaded_files_are_served() {
        let app = TestApp::new().await;
        let (a, b) = app.connected_pair().await;

        let doctor_id = b.0.to_string();
        let (status, json) = app
            .send(multipart(
                "/send_message",
                Some(&a.1),
                &[("doctor_id", doctor_id.as_str()), ("content", "see attached")],
                &[("file", "scan.txt", &b"scan-bytes"[..])],
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "{json}");

        let url = json["file_path"].as_str().unwrap().to_string();
        assert!(url.starts_with("/uploads/attachments/"));

        let response = tower::ServiceExt::oneshot(app.router.clone(), get(&url, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
