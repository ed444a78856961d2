//! CRUD operations for [`Doctor`] records.

use rusqlite::{params, OptionalExtension};

use referral_shared::DoctorId;

use crate::database::Database;
use crate::error::{not_found, Result};
use crate::models::{Doctor, NewDoctor};
use crate::rows::{format_timestamp, now, parse_timestamp};

const DOCTOR_COLUMNS: &str = "id, full_name, email, specialization, phone, npi_id, state, \
                              address, password_hash, avatar_path, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new doctor and return the stored row.
    ///
    /// Uniqueness of email and NPI id is enforced by the schema as well, but
    /// callers are expected to check first so they can report which field
    /// collided.
    pub fn insert_doctor(&self, new: &NewDoctor) -> Result<Doctor> {
        let now = now();

        self.conn().execute(
            "INSERT INTO doctors (full_name, email, specialization, phone, npi_id, state,
                                  address, password_hash, avatar_path, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9)",
            params![
                new.full_name,
                new.email,
                new.specialization,
                new.phone,
                new.npi_id,
                new.state,
                new.address,
                new.password_hash,
                format_timestamp(&now),
            ],
        )?;

        Ok(Doctor {
            id: DoctorId(self.conn().last_insert_rowid()),
            full_name: new.full_name.clone(),
            email: new.email.clone(),
            specialization: new.specialization.clone(),
            phone: new.phone.clone(),
            npi_id: new.npi_id.clone(),
            state: new.state.clone(),
            address: new.address.clone(),
            password_hash: new.password_hash.clone(),
            avatar_path: None,
            created_at: now,
        })
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_doctor(&self, id: DoctorId) -> Result<Doctor> {
        self.conn()
            .query_row(
                &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?1"),
                params![id.0],
                row_to_doctor,
            )
            .map_err(not_found)
    }

    pub fn doctor_exists(&self, id: DoctorId) -> Result<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row("SELECT 1 FROM doctors WHERE id = ?1", params![id.0], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    pub fn find_doctor_by_npi(&self, npi_id: &str) -> Result<Option<Doctor>> {
        let doctor = self
            .conn()
            .query_row(
                &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE npi_id = ?1"),
                params![npi_id],
                row_to_doctor,
            )
            .optional()?;
        Ok(doctor)
    }

    pub fn find_doctor_by_email(&self, email: &str) -> Result<Option<Doctor>> {
        let doctor = self
            .conn()
            .query_row(
                &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE email = ?1"),
                params![email],
                row_to_doctor,
            )
            .optional()?;
        Ok(doctor)
    }

    /// List all doctors, ordered by id.
    pub fn list_doctors(&self) -> Result<Vec<Doctor>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {DOCTOR_COLUMNS} FROM doctors ORDER BY id ASC"))?;

        let rows = stmt.query_map([], row_to_doctor)?;

        let mut doctors = Vec::new();
        for row in rows {
            doctors.push(row?);
        }
        Ok(doctors)
    }

    /// List every doctor except `id`, ordered by name.
    pub fn list_doctors_except(&self, id: DoctorId) -> Result<Vec<Doctor>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id != ?1 ORDER BY full_name ASC, id ASC"
        ))?;

        let rows = stmt.query_map(params![id.0], row_to_doctor)?;

        let mut doctors = Vec::new();
        for row in rows {
            doctors.push(row?);
        }
        Ok(doctors)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Record a new avatar path.  Returns `true` if the doctor exists.
    pub fn set_avatar_path(&self, id: DoctorId, avatar_path: Option<&str>) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE doctors SET avatar_path = ?1 WHERE id = ?2",
            params![avatar_path, id.0],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_doctor(row: &rusqlite::Row<'_>) -> rusqlite::Result<Doctor> {
    let created_str: String = row.get(10)?;

    Ok(Doctor {
        id: DoctorId(row.get(0)?),
        full_name: row.get(1)?,
        email: row.get(2)?,
        specialization: row.get(3)?,
        phone: row.get(4)?,
        npi_id: row.get(5)?,
        state: row.get(6)?,
        address: row.get(7)?,
        password_hash: row.get(8)?,
        avatar_path: row.get(9)?,
        created_at: parse_timestamp(10, &created_str)?,
    })
}
