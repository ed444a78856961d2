//! Connection requests between doctors.
//!
//! A pair of doctors has at most one connection row, whichever of them asked
//! first.  Only the asked party (`doctor2`) may answer, and answering simply
//! overwrites the status: there is no transition guard, so a rejected request
//! can later be accepted and vice versa.  Once a row exists the pair can never
//! request again, even after a rejection.

use serde::Serialize;
use tracing::info;

use referral_shared::{ConnectionId, ConnectionStatus, DoctorId, ResponseAction};
use referral_store::{Connection, Database, Doctor};

use crate::error::ServerError;
use crate::services::OrNotFound;

/// A pending request seen from one participant.
#[derive(Debug, Clone, Serialize)]
pub struct PendingRequest {
    #[serde(flatten)]
    pub connection: Connection,
    /// The other participant.
    pub doctor: Doctor,
    /// `true` when the caller is the one who must answer.
    pub incoming: bool,
}

pub fn request_connection(
    db: &Database,
    caller: DoctorId,
    target: DoctorId,
) -> Result<Connection, ServerError> {
    if caller == target {
        return Err(ServerError::Validation(
            "You cannot connect with yourself".to_string(),
        ));
    }

    db.with_transaction(|db| {
        if !db.doctor_exists(target)? {
            return Err(ServerError::NotFound("Doctor"));
        }
        if db.find_connection_between(caller, target)?.is_some() {
            return Err(ServerError::Conflict("Request already exists".to_string()));
        }

        let connection = db.insert_connection(caller, target, ConnectionStatus::Pending)?;
        info!(
            connection = %connection.id,
            from = %caller,
            to = %target,
            "connection requested"
        );
        Ok(connection)
    })
}

pub fn respond_to_connection(
    db: &Database,
    caller: DoctorId,
    id: ConnectionId,
    action: ResponseAction,
) -> Result<Connection, ServerError> {
    db.with_transaction(|db| {
        let mut connection = db.get_connection(id).or_not_found("Connection")?;

        if connection.doctor2_id != caller {
            return Err(ServerError::Forbidden);
        }

        connection.status = match action {
            ResponseAction::Accept => ConnectionStatus::Accepted,
            ResponseAction::Reject => ConnectionStatus::Rejected,
        };
        db.set_connection_status(id, connection.status)?;

        info!(connection = %id, by = %caller, %action, "connection answered");
        Ok(connection)
    })
}

/// Doctors the caller has an accepted connection with.
pub fn accepted_connections(db: &Database, caller: DoctorId) -> Result<Vec<Doctor>, ServerError> {
    Ok(db.list_connected_doctors(caller)?)
}

/// Pending requests the caller sent or received.
pub fn pending_requests(
    db: &Database,
    caller: DoctorId,
) -> Result<Vec<PendingRequest>, ServerError> {
    let mut pending = Vec::new();
    for connection in db.list_connections_for(caller, ConnectionStatus::Pending)? {
        let Some(other) = connection.other_party(caller) else {
            continue;
        };
        let doctor = db.get_doctor(other).or_not_found("Doctor")?;
        pending.push(PendingRequest {
            incoming: connection.doctor2_id == caller,
            connection,
            doctor,
        });
    }
    Ok(pending)
}

/// Everyone except the caller.
pub fn directory(db: &Database, caller: DoctorId) -> Result<Vec<Doctor>, ServerError> {
    Ok(db.list_doctors_except(caller)?)
}
