//! Referral appointments.
//!
//! The sender may cancel; the receiver may accept or reject.  Accepting also
//! connects the two doctors when they have no connection row yet, skipping
//! the pending stage.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

use referral_shared::constants::APPOINTMENT_INPUT_FORMATS;
use referral_shared::{
    AppointmentId, AppointmentStatus, ConnectionStatus, DoctorId, Priority, ResponseAction,
};
use referral_store::{Appointment, Connection, Database, Doctor};

use crate::error::ServerError;
use crate::services::OrNotFound;

/// Result of answering an appointment.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentAnswer {
    pub appointment: Appointment,
    /// Set when accepting created a new, already-accepted connection.
    pub created_connection: Option<Connection>,
}

/// An appointment together with the doctor on the other end.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub counterpart: Doctor,
}

#[derive(Debug, Clone, Serialize)]
pub struct Consultation {
    pub incoming: Vec<AppointmentView>,
    pub outgoing: Vec<AppointmentView>,
}

/// Parse the `datetime-local` form value.
pub fn parse_appointment_time(raw: &str) -> Result<NaiveDateTime, ServerError> {
    let raw = raw.trim();
    APPOINTMENT_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| ServerError::Validation(format!("Invalid appointment date-time: {raw}")))
}

pub fn book(
    db: &Database,
    caller: DoctorId,
    target: DoctorId,
    when: NaiveDateTime,
    priority: Priority,
) -> Result<Appointment, ServerError> {
    if caller == target {
        return Err(ServerError::Validation(
            "You cannot book an appointment with yourself".to_string(),
        ));
    }

    db.with_transaction(|db| {
        if !db.doctor_exists(target)? {
            return Err(ServerError::NotFound("Doctor"));
        }

        let appointment = db.insert_appointment(caller, target, when, priority)?;
        info!(
            appointment = %appointment.id,
            from = %caller,
            to = %target,
            priority = priority.as_str(),
            "appointment booked"
        );
        Ok(appointment)
    })
}

/// Cancel an appointment the caller sent.  Cancelling twice is harmless.
pub fn cancel(
    db: &Database,
    caller: DoctorId,
    id: AppointmentId,
) -> Result<Appointment, ServerError> {
    db.with_transaction(|db| {
        let mut appointment = db.get_appointment(id).or_not_found("Appointment")?;

        if appointment.sender_id != caller {
            return Err(ServerError::Forbidden);
        }

        appointment.status = AppointmentStatus::Cancelled;
        db.set_appointment_status(id, appointment.status)?;

        info!(appointment = %id, by = %caller, "appointment cancelled");
        Ok(appointment)
    })
}

/// Accept or reject an appointment the caller received.
///
/// Rejecting marks it cancelled.  Accepting marks it accepted and, when no
/// connection exists between the two doctors in either ordering, inserts one
/// that is already accepted.
pub fn respond_to_appointment(
    db: &Database,
    caller: DoctorId,
    id: AppointmentId,
    action: ResponseAction,
) -> Result<AppointmentAnswer, ServerError> {
    db.with_transaction(|db| {
        let mut appointment = db.get_appointment(id).or_not_found("Appointment")?;

        if appointment.receiver_id != caller {
            return Err(ServerError::Forbidden);
        }

        let mut created_connection = None;
        match action {
            ResponseAction::Accept => {
                appointment.status = AppointmentStatus::Accepted;
                db.set_appointment_status(id, appointment.status)?;

                let (sender, receiver) = (appointment.sender_id, appointment.receiver_id);
                if db.find_connection_between(sender, receiver)?.is_none() {
                    let connection =
                        db.insert_connection(sender, receiver, ConnectionStatus::Accepted)?;
                    info!(
                        connection = %connection.id,
                        appointment = %id,
                        "connection established by accepted appointment"
                    );
                    created_connection = Some(connection);
                }
            }
            ResponseAction::Reject => {
                appointment.status = AppointmentStatus::Cancelled;
                db.set_appointment_status(id, appointment.status)?;
            }
        }

        info!(appointment = %id, by = %caller, %action, "appointment answered");
        Ok(AppointmentAnswer {
            appointment,
            created_connection,
        })
    })
}

/// Appointments the caller received, every status included.
pub fn incoming(db: &Database, caller: DoctorId) -> Result<Vec<AppointmentView>, ServerError> {
    db.list_incoming_appointments(caller)?
        .into_iter()
        .map(|p| with_counterpart(db, p.sender_id, p))
        .collect()
}

/// Appointments the caller sent, every status included.
pub fn outgoing(db: &Database, caller: DoctorId) -> Result<Vec<AppointmentView>, ServerError> {
    db.list_outgoing_appointments(caller)?
        .into_iter()
        .map(|p| with_counterpart(db, p.receiver_id, p))
        .collect()
}

pub fn consultation(db: &Database, caller: DoctorId) -> Result<Consultation, ServerError> {
    Ok(Consultation {
        incoming: incoming(db, caller)?,
        outgoing: outgoing(db, caller)?,
    })
}

fn with_counterpart(
    db: &Database,
    other: DoctorId,
    appointment: Appointment,
) -> Result<AppointmentView, ServerError> {
    let counterpart = db.get_doctor(other).or_not_found("Doctor")?;
    Ok(AppointmentView {
        appointment,
        counterpart,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::connections::request_connection;
    use crate::services::testing::doctor;

    fn when() -> NaiveDateTime {
        parse_appointment_time("2025-06-01T14:30").unwrap()
    }

    fn connection_rows(db: &Database) -> i64 {
        db.conn()
            .query_row("SELECT COUNT(*) FROM connections", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn parse_accepts_form_formats() {
        assert_eq!(
            parse_appointment_time("2025-06-01T14:30:15").unwrap(),
            NaiveDateTime::parse_from_str("2025-06-01 14:30:15", "%Y-%m-%d %H:%M:%S").unwrap()
        );
        assert!(parse_appointment_time("tomorrow").is_err());
    }

    #[test]
    fn booking_requires_an_existing_other_doctor() {
        let db = Database::open_in_memory().unwrap();
        let a = doctor(&db, "NPI001");
        let b = doctor(&db, "NPI002");

        let p = book(&db, a, b, when(), Priority::default()).unwrap();
        assert_eq!(p.status, AppointmentStatus::Pending);
        assert_eq!(p.priority, Priority::Normal);

        assert!(matches!(
            book(&db, a, DoctorId(404), when(), Priority::Urgent),
            Err(ServerError::NotFound("Doctor"))
        ));
        assert!(matches!(
            book(&db, a, a, when(), Priority::Urgent),
            Err(ServerError::Validation(_))
        ));
    }

    #[test]
    fn only_sender_cancels() {
        let db = Database::open_in_memory().unwrap();
        let a = doctor(&db, "NPI001");
        let b = doctor(&db, "NPI002");
        let p = book(&db, a, b, when(), Priority::Emergency).unwrap();

        assert!(matches!(cancel(&db, b, p.id), Err(ServerError::Forbidden)));
        assert_eq!(cancel(&db, a, p.id).unwrap().status, AppointmentStatus::Cancelled);
        assert_eq!(cancel(&db, a, p.id).unwrap().status, AppointmentStatus::Cancelled);
        assert!(matches!(
            cancel(&db, a, AppointmentId(404)),
            Err(ServerError::NotFound("Appointment"))
        ));
    }

    #[test]
    fn only_receiver_answers() {
        let db = Database::open_in_memory().unwrap();
        let a = doctor(&db, "NPI001");
        let b = doctor(&db, "NPI002");
        let p = book(&db, a, b, when(), Priority::Normal).unwrap();

        assert!(matches!(
            respond_to_appointment(&db, a, p.id, ResponseAction::Accept),
            Err(ServerError::Forbidden)
        ));
        assert_eq!(connection_rows(&db), 0);

        let answer = respond_to_appointment(&db, b, p.id, ResponseAction::Reject).unwrap();
        assert_eq!(answer.appointment.status, AppointmentStatus::Cancelled);
        assert!(answer.created_connection.is_none());
        assert_eq!(connection_rows(&db), 0);
    }

    #[test]
    fn accepting_creates_exactly_one_accepted_connection() {
        let db = Database::open_in_memory().unwrap();
        let a = doctor(&db, "NPI001");
        let b = doctor(&db, "NPI002");
        let first = book(&db, a, b, when(), Priority::Normal).unwrap();
        let second = book(&db, a, b, when(), Priority::Urgent).unwrap();

        let answer = respond_to_appointment(&db, b, first.id, ResponseAction::Accept).unwrap();
        assert_eq!(answer.appointment.status, AppointmentStatus::Accepted);
        let created = answer.created_connection.unwrap();
        assert_eq!(created.status, ConnectionStatus::Accepted);
        assert_eq!((created.doctor1_id, created.doctor2_id), (a, b));
        assert_eq!(connection_rows(&db), 1);

        let again = respond_to_appointment(&db, b, second.id, ResponseAction::Accept).unwrap();
        assert!(again.created_connection.is_none());
        assert_eq!(connection_rows(&db), 1);
    }

    #[test]
    fn accepting_leaves_an_existing_connection_untouched() {
        let db = Database::open_in_memory().unwrap();
        let a = doctor(&db, "NPI001");
        let b = doctor(&db, "NPI002");
        // Reverse ordering: b asked a, still pending.
        let pending = request_connection(&db, b, a).unwrap();
        let p = book(&db, a, b, when(), Priority::Normal).unwrap();

        let answer = respond_to_appointment(&db, b, p.id, ResponseAction::Accept).unwrap();
        assert!(answer.created_connection.is_none());
        assert_eq!(connection_rows(&db), 1);
        assert_eq!(
            db.get_connection(pending.id).unwrap().status,
            ConnectionStatus::Pending
        );
    }

    #[test]
    fn consultation_lists_every_status() {
        let db = Database::open_in_memory().unwrap();
        let a = doctor(&db, "NPI001");
        let b = doctor(&db, "NPI002");
        let p1 = book(&db, a, b, when(), Priority::Normal).unwrap();
        book(&db, b, a, when(), Priority::Urgent).unwrap();
        cancel(&db, a, p1.id).unwrap();

        let view = consultation(&db, a).unwrap();
        assert_eq!(view.outgoing.len(), 1);
        assert_eq!(view.outgoing[0].appointment.status, AppointmentStatus::Cancelled);
        assert_eq!(view.outgoing[0].counterpart.id, b);
        assert_eq!(view.incoming.len(), 1);
        assert_eq!(view.incoming[0].counterpart.id, b);
    }
}
