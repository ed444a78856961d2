use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use referral_shared::constants::AVATAR_EXTENSIONS;
use referral_shared::DoctorId;
use referral_store::{Database, Doctor};

use crate::error::ServerError;
use crate::services::{with_db, OrNotFound};
use crate::upload_store::{file_extension, sanitize_file_name, UploadStore};

fn check_upload(uploads: &UploadStore, file_name: &str, data: &[u8]) -> Result<(), ServerError> {
    if sanitize_file_name(file_name).is_empty() {
        return Err(ServerError::Validation("No file selected".to_string()));
    }
    let allowed = file_extension(file_name)
        .map(|ext| AVATAR_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);
    if !allowed {
        return Err(ServerError::Validation("Invalid file type".to_string()));
    }
    uploads.check_size(data)
}

/// Replace the caller's avatar.
///
/// Nothing is touched until the upload passes validation.  The new file is
/// written and recorded first; only then is the previous file deleted, and a
/// failed delete is logged and otherwise ignored.
pub async fn upload_avatar(
    db: &Arc<Mutex<Database>>,
    uploads: &UploadStore,
    caller: DoctorId,
    file_name: &str,
    data: &[u8],
) -> Result<Doctor, ServerError> {
    check_upload(uploads, file_name, data)?;

    let previous = with_db(db, move |db| {
        Ok(db.get_doctor(caller).or_not_found("Doctor")?.avatar_path)
    })
    .await?;

    let path = uploads.store_avatar(caller, file_name, data).await?;

    let recorded = {
        let path = path.clone();
        with_db(db, move |db| {
            db.set_avatar_path(caller, Some(&path))?;
            db.get_doctor(caller).or_not_found("Doctor")
        })
        .await
    };

    let doctor = match recorded {
        Ok(doctor) => doctor,
        Err(e) => {
            if previous.as_deref() != Some(path.as_str()) {
                if let Err(cleanup) = uploads.remove(&path).await {
                    warn!(doctor = %caller, path = %path, error = %cleanup, "failed to remove unrecorded avatar");
                }
            }
            return Err(e);
        }
    };

    if let Some(old) = previous.filter(|old| *old != path) {
        if let Err(e) = uploads.remove(&old).await {
            warn!(doctor = %caller, path = %old, error = %e, "failed to remove old avatar");
        }
    }

    info!(doctor = %caller, path = %path, "avatar updated");
    Ok(doctor)
}
