//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` so it can be handed directly to the HTTP
//! layer.  Relationships are plain foreign keys.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use referral_shared::{
    AppointmentId, AppointmentStatus, ConnectionId, ConnectionStatus, DoctorId, MessageId,
    Priority,
};

// ---------------------------------------------------------------------------
// Doctor
// ---------------------------------------------------------------------------

/// A registered doctor.  The NPI id doubles as the login identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Doctor {
    pub id: DoctorId,
    pub full_name: String,
    pub email: String,
    pub specialization: String,
    pub phone: String,
    pub npi_id: String,
    pub state: String,
    pub address: String,
    /// Encoded PBKDF2 hash; never sent to clients.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Avatar file name relative to the upload root.
    pub avatar_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile fields supplied at registration.
#[derive(Debug, Clone)]
pub struct NewDoctor {
    pub full_name: String,
    pub email: String,
    pub specialization: String,
    pub phone: String,
    pub npi_id: String,
    pub state: String,
    pub address: String,
    pub password_hash: String,
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// A relationship request between two doctors.
///
/// Stored as an ordered pair but logically symmetric: `doctor1` asked,
/// `doctor2` answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub doctor1_id: DoctorId,
    pub doctor2_id: DoctorId,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
}

impl Connection {
    /// The participant that is not `me`, if `me` is part of this row.
    pub fn other_party(&self, me: DoctorId) -> Option<DoctorId> {
        if self.doctor1_id == me {
            Some(self.doctor2_id)
        } else if self.doctor2_id == me {
            Some(self.doctor1_id)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Appointment
// ---------------------------------------------------------------------------

/// A referral appointment sent from one doctor to another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Appointment {
    pub id: AppointmentId,
    pub sender_id: DoctorId,
    pub receiver_id: DoctorId,
    /// Scheduled time as entered; no time zone is attached.
    pub date_time: NaiveDateTime,
    pub status: AppointmentStatus,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A direct message.  Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: DoctorId,
    pub receiver_id: DoctorId,
    pub content: String,
    /// Attachment path relative to the upload root.
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
}
