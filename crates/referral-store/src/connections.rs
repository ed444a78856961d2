//! CRUD operations for [`Connection`] records.

use rusqlite::{params, OptionalExtension};

use referral_shared::{ConnectionId, ConnectionStatus, DoctorId};

use crate::database::Database;
use crate::error::{not_found, Result};
use crate::models::{Connection, Doctor};
use crate::rows::{format_timestamp, now, parse_text, parse_timestamp};

const CONNECTION_COLUMNS: &str = "id, doctor1_id, doctor2_id, status, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    pub fn insert_connection(
        &self,
        doctor1: DoctorId,
        doctor2: DoctorId,
        status: ConnectionStatus,
    ) -> Result<Connection> {
        let now = now();

        self.conn().execute(
            "INSERT INTO connections (doctor1_id, doctor2_id, status, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![doctor1.0, doctor2.0, status.as_str(), format_timestamp(&now)],
        )?;

        Ok(Connection {
            id: ConnectionId(self.conn().last_insert_rowid()),
            doctor1_id: doctor1,
            doctor2_id: doctor2,
            status,
            created_at: now,
        })
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_connection(&self, id: ConnectionId) -> Result<Connection> {
        self.conn()
            .query_row(
                &format!("SELECT {CONNECTION_COLUMNS} FROM connections WHERE id = ?1"),
                params![id.0],
                row_to_connection,
            )
            .map_err(not_found)
    }

    /// Find the row linking `a` and `b`, whichever side requested it.
    pub fn find_connection_between(&self, a: DoctorId, b: DoctorId) -> Result<Option<Connection>> {
        let connection = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {CONNECTION_COLUMNS} FROM connections
                     WHERE (doctor1_id = ?1 AND doctor2_id = ?2)
                        OR (doctor1_id = ?2 AND doctor2_id = ?1)
                     ORDER BY id ASC
                     LIMIT 1"
                ),
                params![a.0, b.0],
                row_to_connection,
            )
            .optional()?;
        Ok(connection)
    }

    /// Connections `doctor` takes part in (either side) with the given status.
    pub fn list_connections_for(
        &self,
        doctor: DoctorId,
        status: ConnectionStatus,
    ) -> Result<Vec<Connection>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections
             WHERE (doctor1_id = ?1 OR doctor2_id = ?1) AND status = ?2
             ORDER BY created_at ASC, id ASC"
        ))?;

        let rows = stmt.query_map(params![doctor.0, status.as_str()], row_to_connection)?;

        let mut connections = Vec::new();
        for row in rows {
            connections.push(row?);
        }
        Ok(connections)
    }

    /// The doctors on the other side of every accepted connection of `doctor`.
    pub fn list_connected_doctors(&self, doctor: DoctorId) -> Result<Vec<Doctor>> {
        let mut doctors = Vec::new();
        for connection in self.list_connections_for(doctor, ConnectionStatus::Accepted)? {
            if let Some(other) = connection.other_party(doctor) {
                doctors.push(self.get_doctor(other)?);
            }
        }
        Ok(doctors)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Overwrite the status.  Returns `true` if the row exists.
    pub fn set_connection_status(&self, id: ConnectionId, status: ConnectionStatus) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE connections SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id.0],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_connection(row: &rusqlite::Row<'_>) -> rusqlite::Result<Connection> {
    let status_str: String = row.get(3)?;
    let created_str: String = row.get(4)?;

    Ok(Connection {
        id: ConnectionId(row.get(0)?),
        doctor1_id: DoctorId(row.get(1)?),
        doctor2_id: DoctorId(row.get(2)?),
        status: parse_text(3, &status_str)?,
        created_at: parse_timestamp(4, &created_str)?,
    })
}
