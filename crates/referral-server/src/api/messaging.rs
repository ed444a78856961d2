use axum::{
    extract::{multipart::MultipartRejection, rejection::PathRejection, Multipart, Path, State},
    http::HeaderMap,
    Json,
};

use referral_shared::DoctorId;
use referral_store::Doctor;

use super::{parse_doctor_id, AppState, MultipartForm};
use crate::error::ServerError;
use crate::services::messaging::{self, Attachment, MessageView};

pub(super) async fn messages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Doctor>>, ServerError> {
    let caller = state.caller(&headers).await?;
    let threads = state
        .with_db(move |db| messaging::list_threads(db, caller))
        .await?;
    Ok(Json(threads))
}

/// Polled by the chat view.
pub(super) async fn get_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    other: Result<Path<DoctorId>, PathRejection>,
) -> Result<Json<Vec<MessageView>>, ServerError> {
    let caller = state.caller(&headers).await?;
    let Path(other) = other?;
    let history = state
        .with_db(move |db| messaging::history(db, caller, other))
        .await?;
    Ok(Json(
        history
            .into_iter()
            .map(|m| MessageView::new(m, caller))
            .collect(),
    ))
}

pub(super) async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageView>, ServerError> {
    let caller = state.caller(&headers).await?;
    let mut form = MultipartForm::read(multipart?).await?;
    let target = parse_doctor_id(form.text("doctor_id"))?;
    let attachment = form.take_file("file").map(|f| Attachment {
        file_name: f.file_name,
        data: f.data,
    });

    let message = messaging::send(
        &state.db,
        &state.uploads,
        caller,
        target,
        form.text("content"),
        attachment,
    )
    .await?;
    Ok(Json(MessageView::new(message, caller)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::testing::*;

    #[tokio::test]
    async fn messaging_requires_a_connection() {
        let app = TestApp::new().await;
        let (_, ta) = app.signed_up("NPI001").await;
        let (b, _) = app.signed_up("NPI002").await;

        let target = b.to_string();
        let (status, json) = app
            .send(multipart(
                "/send_message",
                Some(&ta),
                &[("doctor_id", target.as_str()), ("content", "hello")],
                &[],
            ))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn thread_mirrors_for_both_doctors() {
        let app = TestApp::new().await;
        let ((a, ta), (b, tb)) = app.connected_pair().await;

        for (token, to, text) in [(&ta, b, "hi"), (&tb, a, "hello back")] {
            let target = to.to_string();
            let (status, json) = app
                .send(multipart(
                    "/send_message",
                    Some(token),
                    &[("doctor_id", target.as_str()), ("content", text)],
                    &[],
                ))
                .await;
            assert_eq!(status, StatusCode::OK, "{json}");
            assert_eq!(json["is_sent"], true);
            assert!(json["file_path"].is_null());
        }

        let (_, from_a) = app.send(get(&format!("/get_messages/{b}"), Some(&ta))).await;
        let (_, from_b) = app.send(get(&format!("/get_messages/{a}"), Some(&tb))).await;

        let from_a = from_a.as_array().unwrap();
        let from_b = from_b.as_array().unwrap();
        assert_eq!(from_a.len(), 2);
        assert_eq!(from_a[0]["content"], "hi");
        assert_eq!(from_a[0]["is_sent"], true);
        assert_eq!(from_b[0]["content"], "hi");
        assert_eq!(from_b[0]["is_sent"], false);
        assert_eq!(from_a[1]["id"], from_b[1]["id"]);

        let stored = app.state.db.lock().unwrap().get_history(
            referral_shared::DoctorId(a),
            referral_shared::DoctorId(b),
        );
        assert_eq!(stored.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let app = TestApp::new().await;
        let ((_, ta), (b, _)) = app.connected_pair().await;
        let target = b.to_string();

        let (status, _) = app
            .send(multipart(
                "/send_message",
                Some(&ta),
                &[("doctor_id", target.as_str()), ("content", " ")],
                &[],
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_attachment_is_rejected() {
        let app = TestApp::new().await;
        let ((_, ta), (b, _)) = app.connected_pair().await;
        let target = b.to_string();
        let big = vec![7u8; 5000];

        let (status, _) = app
            .send(multipart(
                "/send_message",
                Some(&ta),
                &[("doctor_id", target.as_str())],
                &[("file", "big.bin", big.as_slice())],
            ))
            .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn bad_path_id_is_a_json_error() {
        let app = TestApp::new().await;
        let (_, ta) = app.signed_up("NPI001").await;

        let (status, json) = app.send(get("/get_messages/abc", Some(&ta))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string(), "{json}");

        let (status, _) = app.send(get("/get_messages/abc", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
