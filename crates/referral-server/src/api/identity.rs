use axum::{
    extract::{multipart::MultipartRejection, rejection::FormRejection},
    extract::{Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use referral_shared::crypto::PasswordHasher;
use referral_store::Doctor;

use super::{AppState, MultipartForm};
use crate::error::ServerError;
use crate::services::{self, avatar, identity};
use crate::session::token_from_headers;
use crate::upload_store::UploadStore;

#[derive(Deserialize)]
pub(super) struct LoginForm {
    #[serde(default)]
    npi_id: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    doctor: Doctor,
}

#[derive(Serialize)]
pub(super) struct AvatarResponse {
    success: bool,
    avatar_url: String,
}

pub(super) async fn register(
    State(state): State<AppState>,
    form: Result<Form<identity::Registration>, FormRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let Form(form) = form?;
    identity::check_registration(&form)?;

    let password_hash = hash_password(state.hasher, form.password.clone()).await?;
    let doctor = state
        .with_db(move |db| identity::insert_registration(db, &form, password_hash))
        .await?;
    Ok((StatusCode::CREATED, Json(doctor)))
}

pub(super) async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let Form(form) = form?;
    identity::check_login_fields(&form.npi_id, &form.password)?;

    let npi_id = form.npi_id.trim().to_string();
    let found = state
        .with_db(move |db| Ok(db.find_doctor_by_npi(&npi_id)?))
        .await?;
    let doctor = check_password(state.hasher, found, form.password).await?;

    let token = state.sessions.create(doctor.id).await;
    let cookie = state.sessions.cookie(&token);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse { token, doctor }),
    ))
}

/// Key derivation runs on the blocking pool without the database lock.
async fn hash_password(hasher: PasswordHasher, password: String) -> Result<String, ServerError> {
    services::off_thread(move || Ok(hasher.hash(&password)?)).await
}

async fn check_password(
    hasher: PasswordHasher,
    found: Option<Doctor>,
    password: String,
) -> Result<Doctor, ServerError> {
    services::off_thread(move || identity::verify_login(&hasher, found, &password)).await
}

pub(super) async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = token_from_headers(&headers) {
        if state.sessions.revoke(&token).await {
            info!("session ended");
        }
    }
    (
        [(header::SET_COOKIE, state.sessions.clearing_cookie())],
        Json(serde_json::json!({ "logged_out": true })),
    )
}

pub(super) async fn profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<identity::Profile>, ServerError> {
    let caller = state.caller(&headers).await?;
    let profile = state
        .with_db(move |db| identity::profile(db, caller))
        .await?;
    Ok(Json(profile))
}

pub(super) async fn upload_avatar(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AvatarResponse>, ServerError> {
    let caller = state.caller(&headers).await?;
    let mut form = MultipartForm::read(multipart?).await?;
    let file = form
        .take_file("avatar")
        .ok_or_else(|| ServerError::Validation("No file provided".to_string()))?;

    let doctor =
        avatar::upload_avatar(&state.db, &state.uploads, caller, &file.file_name, &file.data)
            .await?;

    Ok(Json(AvatarResponse {
        success: true,
        avatar_url: doctor
            .avatar_path
            .as_deref()
            .map(UploadStore::url_for)
            .unwrap_or_default(),
    }))
}
