use axum::{
    extract::{rejection::{FormRejection, PathRejection}, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Form, Json,
};
use serde::Deserialize;

use referral_shared::{AppointmentId, Priority, ResponseAction};
use referral_store::Appointment;

use super::{parse_doctor_id, AppState};
use crate::error::ServerError;
use crate::services::appointments::{self, AppointmentAnswer, Consultation};

#[derive(Deserialize)]
pub(super) struct BookingForm {
    #[serde(default)]
    doctor_id: String,
    #[serde(default)]
    appointment_datetime: String,
    #[serde(default)]
    priority: String,
}

pub(super) async fn consultation(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Consultation>, ServerError> {
    let caller = state.caller(&headers).await?;
    let page = state
        .with_db(move |db| appointments::consultation(db, caller))
        .await?;
    Ok(Json(page))
}

pub(super) async fn book_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<BookingForm>, FormRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let caller = state.caller(&headers).await?;
    let Form(form) = form?;
    let target = parse_doctor_id(&form.doctor_id)?;
    let when = appointments::parse_appointment_time(&form.appointment_datetime)?;
    let priority = match form.priority.trim() {
        "" => Priority::default(),
        raw => raw.parse::<Priority>()?,
    };

    let appointment = state
        .with_db(move |db| appointments::book(db, caller, target, when, priority))
        .await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub(super) async fn cancel_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<AppointmentId>, PathRejection>,
) -> Result<Json<Appointment>, ServerError> {
    let caller = state.caller(&headers).await?;
    let Path(id) = id?;
    let appointment = state
        .with_db(move |db| appointments::cancel(db, caller, id))
        .await?;
    Ok(Json(appointment))
}

pub(super) async fn handle_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<(AppointmentId, String)>, PathRejection>,
) -> Result<Json<AppointmentAnswer>, ServerError> {
    let caller = state.caller(&headers).await?;
    let Path((id, action)) = path?;
    let action: ResponseAction = action.parse()?;
    let answer = state
        .with_db(move |db| appointments::respond_to_appointment(db, caller, id, action))
        .await?;
    Ok(Json(answer))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::testing::*;

    fn booking(doctor: i64, priority: &str) -> String {
        format!("doctor_id={doctor}&appointment_datetime=2025-06-01T14%3A30&priority={priority}")
    }

    #[tokio::test]
    async fn book_answer_and_auto_connect() {
        let app = TestApp::new().await;
        let (a, ta) = app.signed_up("NPI001").await;
        let (b, tb) = app.signed_up("NPI002").await;

        let (status, json) = app
            .send(form("/book_appointment", Some(&ta), &booking(b, "urgent")))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["priority"], "urgent");
        assert_eq!(json["date_time"], "2025-06-01T14:30:00");
        let id = json["id"].as_i64().unwrap();

        let (status, _) = app
            .send(post(&format!("/handle_appointment/{id}/accept"), Some(&ta)))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = app
            .send(post(&format!("/handle_appointment/{id}/accept"), Some(&tb)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["appointment"]["status"], "accepted");
        assert_eq!(json["created_connection"]["status"], "accepted");
        assert_eq!(json["created_connection"]["doctor1_id"], a);

        let (_, json) = app.send(get("/messages", Some(&ta))).await;
        assert_eq!(json[0]["id"], b);
    }

    #[tokio::test]
    async fn only_the_sender_cancels() {
        let app = TestApp::new().await;
        let (_, ta) = app.signed_up("NPI001").await;
        let (b, tb) = app.signed_up("NPI002").await;

        let (_, json) = app
            .send(form("/book_appointment", Some(&ta), &booking(b, "")))
            .await;
        assert_eq!(json["priority"], "normal");
        let id = json["id"].as_i64().unwrap();

        let (status, _) = app
            .send(post(&format!("/cancel_appointment/{id}"), Some(&tb)))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = app
            .send(post(&format!("/cancel_appointment/{id}"), Some(&ta)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "cancelled");

        let (_, json) = app.send(get("/consultation", Some(&tb))).await;
        assert_eq!(json["incoming"][0]["status"], "cancelled");
        assert_eq!(json["incoming"][0]["counterpart"]["npi_id"], "NPI001");
    }

    #[tokio::test]
    async fn booking_input_errors() {
        let app = TestApp::new().await;
        let (a, ta) = app.signed_up("NPI001").await;

        let (status, _) = app
            .send(form("/book_appointment", Some(&ta), &booking(404, "normal")))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send(form("/book_appointment", Some(&ta), &booking(a, "normal")))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(form("/book_appointment", Some(&ta), &booking(a + 1, "whenever")))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(form(
                "/book_appointment",
                Some(&ta),
                "doctor_id=1&appointment_datetime=soon",
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wrong_body_type_is_a_json_error() {
        let app = TestApp::new().await;
        let (_, ta) = app.signed_up("NPI001").await;

        let (status, json) = app
            .send(typed(
                "/book_appointment",
                Some(&ta),
                "application/json",
                r#"{"doctor_id": 2}"#,
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string(), "{json}");

        let (status, json) = app
            .send(typed("/book_appointment", None, "text/plain", "x"))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(json["error"].is_string());
    }
}
