//! CRUD operations for [`Appointment`] records.

use chrono::NaiveDateTime;
use rusqlite::params;

use referral_shared::{AppointmentId, AppointmentStatus, DoctorId, Priority};

use crate::database::Database;
use crate::error::{not_found, Result};
use crate::models::Appointment;
use crate::rows::{
    format_naive, format_timestamp, now, parse_naive, parse_text, parse_timestamp,
};

const APPOINTMENT_COLUMNS: &str =
    "id, sender_id, receiver_id, date_time, status, priority, created_at";

impl Database {
    /// Insert a new pending appointment.
    pub fn insert_appointment(
        &self,
        sender: DoctorId,
        receiver: DoctorId,
        date_time: NaiveDateTime,
        priority: Priority,
    ) -> Result<Appointment> {
        let now = now();
        let status = AppointmentStatus::Pending;

        self.conn().execute(
            "INSERT INTO appointments (sender_id, receiver_id, date_time, status, priority, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                sender.0,
                receiver.0,
                format_naive(&date_time),
                status.as_str(),
                priority.as_str(),
                format_timestamp(&now),
            ],
        )?;

        Ok(Appointment {
            id: AppointmentId(self.conn().last_insert_rowid()),
            sender_id: sender,
            receiver_id: receiver,
            date_time,
            status,
            priority,
            created_at: now,
        })
    }

    pub fn get_appointment(&self, id: AppointmentId) -> Result<Appointment> {
        self.conn()
            .query_row(
                &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
                params![id.0],
                row_to_appointment,
            )
            .map_err(not_found)
    }

    /// Appointments addressed to `doctor`, any status.
    pub fn list_incoming_appointments(&self, doctor: DoctorId) -> Result<Vec<Appointment>> {
        self.list_appointments_where("receiver_id", doctor)
    }

    /// Appointments sent by `doctor`, any status.
    pub fn list_outgoing_appointments(&self, doctor: DoctorId) -> Result<Vec<Appointment>> {
        self.list_appointments_where("sender_id", doctor)
    }

    /// Overwrite the status.  Returns `true` if the row exists.
    pub fn set_appointment_status(
        &self,
        id: AppointmentId,
        status: AppointmentStatus,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE appointments SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id.0],
        )?;
        Ok(affected > 0)
    }

    // `column` is always one of the two literals above, never user input.
    fn list_appointments_where(&self, column: &str, doctor: DoctorId) -> Result<Vec<Appointment>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments
             WHERE {column} = ?1
             ORDER BY date_time ASC, id ASC"
        ))?;

        let rows = stmt.query_map(params![doctor.0], row_to_appointment)?;

        let mut appointments = Vec::new();
        for row in rows {
            appointments.push(row?);
        }
        Ok(appointments)
    }
}

fn row_to_appointment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Appointment> {
    let date_str: String = row.get(3)?;
    let status_str: String = row.get(4)?;
    let priority_str: String = row.get(5)?;
    let created_str: String = row.get(6)?;

    Ok(Appointment {
        id: AppointmentId(row.get(0)?),
        sender_id: DoctorId(row.get(1)?),
        receiver_id: DoctorId(row.get(2)?),
        date_time: parse_naive(3, &date_str)?,
        status: parse_text(4, &status_str)?,
        priority: parse_text(5, &priority_str)?,
        created_at: parse_timestamp(6, &created_str)?,
    })
}
