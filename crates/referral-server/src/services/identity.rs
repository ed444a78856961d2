//! Registration, credential checks and the caller's profile.

use serde::{Deserialize, Serialize};
use tracing::info;

use referral_shared::crypto::PasswordHasher;
use referral_shared::{ConnectionStatus, DoctorId};
use referral_store::{Database, Doctor, NewDoctor};

use crate::error::ServerError;
use crate::services::OrNotFound;

const INVALID_CREDENTIALS: &str = "Invalid NPI ID or password";

/// Registration form fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub specialization: String,
    pub phone: String,
    pub npi_id: String,
    pub state: String,
    pub address: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileStats {
    pub incoming_appointments: usize,
    pub outgoing_appointments: usize,
    pub connections: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub doctor: Doctor,
    pub stats: ProfileStats,
}

/// Reject a registration form with any blank field.
pub fn check_registration(form: &Registration) -> Result<(), ServerError> {
    let required = [
        &form.full_name,
        &form.email,
        &form.specialization,
        &form.phone,
        &form.npi_id,
        &form.state,
        &form.address,
    ];
    if required.iter().any(|v| v.trim().is_empty()) || form.password.is_empty() {
        return Err(ServerError::Validation(
            "Please fill in all required fields".to_string(),
        ));
    }
    Ok(())
}

/// Create a doctor account.
///
/// Rejects, in order: missing fields, a taken NPI id, a taken email, and a
/// password confirmation that does not match.
pub fn register(
    db: &Database,
    hasher: &PasswordHasher,
    form: &Registration,
) -> Result<Doctor, ServerError> {
    check_registration(form)?;
    let password_hash = hasher.hash(&form.password)?;
    insert_registration(db, form, password_hash)
}

/// The database half of [`register`], for callers that hashed the password
/// without holding the database.
pub fn insert_registration(
    db: &Database,
    form: &Registration,
    password_hash: String,
) -> Result<Doctor, ServerError> {
    check_registration(form)?;
    let npi_id = form.npi_id.trim();
    let email = form.email.trim();

    db.with_transaction(|db| {
        if db.find_doctor_by_npi(npi_id)?.is_some() {
            return Err(ServerError::Conflict("NPI ID already registered".to_string()));
        }
        if db.find_doctor_by_email(email)?.is_some() {
            return Err(ServerError::Conflict("Email already registered".to_string()));
        }
        if form.password != form.confirm_password {
            return Err(ServerError::Validation("Passwords do not match".to_string()));
        }

        let new = NewDoctor {
            full_name: form.full_name.trim().to_string(),
            email: email.to_string(),
            specialization: form.specialization.trim().to_string(),
            phone: form.phone.trim().to_string(),
            npi_id: npi_id.to_string(),
            state: form.state.trim().to_string(),
            address: form.address.trim().to_string(),
            password_hash,
        };
        let doctor = db.insert_doctor(&new)?;

        info!(doctor = %doctor.id, npi_id = %doctor.npi_id, "doctor registered");
        Ok(doctor)
    })
}

pub fn check_login_fields(npi_id: &str, password: &str) -> Result<(), ServerError> {
    if npi_id.trim().is_empty() || password.is_empty() {
        return Err(ServerError::Validation(
            "Please provide both NPI ID and password".to_string(),
        ));
    }
    Ok(())
}

/// Check an NPI id / password pair.
///
/// Unknown ids and wrong passwords produce the same error, and an unknown id
/// still pays for one key derivation.
pub fn authenticate(
    db: &Database,
    hasher: &PasswordHasher,
    npi_id: &str,
    password: &str,
) -> Result<Doctor, ServerError> {
    check_login_fields(npi_id, password)?;
    let found = db.find_doctor_by_npi(npi_id.trim())?;
    verify_login(hasher, found, password)
}

/// The key-derivation half of [`authenticate`]; needs no database.
pub fn verify_login(
    hasher: &PasswordHasher,
    found: Option<Doctor>,
    password: &str,
) -> Result<Doctor, ServerError> {
    match found {
        Some(doctor) if hasher.verify(password, &doctor.password_hash) => {
            info!(doctor = %doctor.id, "login succeeded");
            Ok(doctor)
        }
        Some(doctor) => {
            info!(doctor = %doctor.id, "login rejected");
            Err(ServerError::Unauthenticated(INVALID_CREDENTIALS))
        }
        None => {
            let _ = hasher.hash(password);
            info!("login rejected");
            Err(ServerError::Unauthenticated(INVALID_CREDENTIALS))
        }
    }
}

pub fn profile(db: &Database, caller: DoctorId) -> Result<Profile, ServerError> {
    let doctor = db.get_doctor(caller).or_not_found("Doctor")?;
    let stats = ProfileStats {
        incoming_appointments: db.list_incoming_appointments(caller)?.len(),
        outgoing_appointments: db.list_outgoing_appointments(caller)?.len(),
        connections: db
            .list_connections_for(caller, ConnectionStatus::Accepted)?
            .len(),
    };
    Ok(Profile { doctor, stats })
}

/// Demo accounts, all with password `doctor123`.
const DEMO_DOCTORS: &[(&str, &str, &str, &str, &str, &str, &str)] = &[
    (
        "Dr. John Smith",
        "john.smith@example.com",
        "Cardiology",
        "1234567890",
        "NPI001",
        "CA",
        "123 Medical Center Dr",
    ),
    (
        "Dr. Sarah Johnson",
        "sarah.johnson@example.com",
        "Neurology",
        "2345678901",
        "NPI002",
        "NY",
        "456 Hospital Ave",
    ),
    (
        "Dr. Michael Chen",
        "michael.chen@example.com",
        "Pediatrics",
        "3456789012",
        "NPI003",
        "TX",
        "789 Children's Way",
    ),
    (
        "Dr. Emily Brown",
        "emily.brown@example.com",
        "Dermatology",
        "4567890123",
        "NPI004",
        "FL",
        "321 Skin Care Blvd",
    ),
];

/// Insert the demo doctors whose NPI id is not taken yet.  Returns how many
/// were created.
pub fn seed_demo_doctors(db: &Database, hasher: &PasswordHasher) -> Result<usize, ServerError> {
    let mut created = 0;
    for &(full_name, email, specialization, phone, npi_id, state, address) in DEMO_DOCTORS {
        if db.find_doctor_by_npi(npi_id)?.is_some() || db.find_doctor_by_email(email)?.is_some() {
            continue;
        }
        let form = Registration {
            full_name: full_name.to_string(),
            email: email.to_string(),
            specialization: specialization.to_string(),
            phone: phone.to_string(),
            npi_id: npi_id.to_string(),
            state: state.to_string(),
            address: address.to_string(),
            password: "doctor123".to_string(),
            confirm_password: "doctor123".to_string(),
        };
        register(db, hasher, &form)?;
        created += 1;
    }
    Ok(created)
}
