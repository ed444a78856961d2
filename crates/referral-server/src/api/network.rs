use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use referral_shared::{ConnectionId, DoctorId, ResponseAction};
use referral_store::{Connection, Doctor};

use super::AppState;
use crate::error::ServerError;
use crate::services::connections::{self, PendingRequest};

#[derive(Serialize)]
pub(super) struct RequestsPage {
    connections: Vec<Doctor>,
    pending: Vec<PendingRequest>,
    doctors: Vec<Doctor>,
}

pub(super) async fn doctors(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Doctor>>, ServerError> {
    let caller = state.caller(&headers).await?;
    let doctors = state
        .with_db(move |db| connections::directory(db, caller))
        .await?;
    Ok(Json(doctors))
}

pub(super) async fn requests(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RequestsPage>, ServerError> {
    let caller = state.caller(&headers).await?;
    let page = state
        .with_db(move |db| {
            Ok(RequestsPage {
                connections: connections::accepted_connections(db, caller)?,
                pending: connections::pending_requests(db, caller)?,
                doctors: connections::directory(db, caller)?,
            })
        })
        .await?;
    Ok(Json(page))
}

pub(super) async fn send_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    target: Result<Path<DoctorId>, PathRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let caller = state.caller(&headers).await?;
    let Path(target) = target?;
    let connection = state
        .with_db(move |db| connections::request_connection(db, caller, target))
        .await?;
    Ok((StatusCode::CREATED, Json(connection)))
}

pub(super) async fn handle_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<(ConnectionId, String)>, PathRejection>,
) -> Result<Json<Connection>, ServerError> {
    let caller = state.caller(&headers).await?;
    let Path((id, action)) = path?;
    let action: ResponseAction = action.parse()?;
    let connection = state
        .with_db(move |db| connections::respond_to_connection(db, caller, id, action))
        .await?;
    Ok(Json(connection))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::testing::*;

    #[tokio::test]
    async fn request_then_reverse_request_conflicts() {
        let app = TestApp::new().await;
        let (a, ta) = app.signed_up("NPI001").await;
        let (b, tb) = app.signed_up("NPI002").await;

        let (status, json) = app.send(post(&format!("/send_request/{b}"), Some(&ta))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["status"], "pending");

        let (status, json) = app.send(post(&format!("/send_request/{a}"), Some(&tb))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "Request already exists");
    }

    #[tokio::test]
    async fn only_the_receiver_handles_a_request() {
        let app = TestApp::new().await;
        let (_, ta) = app.signed_up("NPI001").await;
        let (b, tb) = app.signed_up("NPI002").await;

        let (_, json) = app.send(post(&format!("/send_request/{b}"), Some(&ta))).await;
        let id = json["id"].as_i64().unwrap();

        let (status, json) = app
            .send(post(&format!("/handle_request/{id}/accept"), Some(&ta)))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"], "Unauthorized");

        let (status, _) = app
            .send(post(&format!("/handle_request/{id}/maybe"), Some(&tb)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = app
            .send(post(&format!("/handle_request/{id}/reject"), Some(&tb)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "rejected");

        let (status, _) = app
            .send(post(&format!("/handle_request/404/accept"), Some(&tb)))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn requests_page_shows_both_sides() {
        let app = TestApp::new().await;
        let ((a, ta), (b, tb)) = app.connected_pair().await;
        let (c, tc) = app.signed_up("NPI003").await;
        app.send(post(&format!("/send_request/{a}"), Some(&tc))).await;

        let (status, json) = app.send(get("/requests", Some(&ta))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["connections"][0]["id"], b);
        assert_eq!(json["pending"][0]["doctor"]["id"], c);
        assert_eq!(json["pending"][0]["incoming"], true);
        assert_eq!(json["doctors"].as_array().unwrap().len(), 2);

        let (_, json) = app.send(get("/doctors", Some(&tb))).await;
        assert_eq!(json.as_array().unwrap().len(), 2);
    }
}
