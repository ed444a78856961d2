//! Direct messages between connected doctors.
//!
//! There is no push delivery; clients poll [`history`].

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{info, warn};

use referral_shared::constants::HISTORY_TIME_FORMAT;
use referral_shared::{ConnectionStatus, DoctorId, MessageId};
use referral_store::{Database, Doctor, Message};

use crate::error::ServerError;
use crate::services::with_db;
use crate::upload_store::{StoredFile, UploadStore};

/// An uploaded file travelling with a message.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// A message as shown in one participant's thread.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MessageView {
    pub id: MessageId,
    pub content: String,
    /// Public URL of the attachment.
    pub file_path: Option<String>,
    pub created_at: String,
    /// `true` when the viewer wrote the message.
    pub is_sent: bool,
}

impl MessageView {
    pub fn new(message: Message, viewer: DoctorId) -> Self {
        Self {
            id: message.id,
            is_sent: message.sender_id == viewer,
            file_path: message.file_path.as_deref().map(UploadStore::url_for),
            created_at: message.created_at.format(HISTORY_TIME_FORMAT).to_string(),
            content: message.content,
        }
    }
}

/// Doctors the caller can message.
pub fn list_threads(db: &Database, caller: DoctorId) -> Result<Vec<Doctor>, ServerError> {
    Ok(db.list_connected_doctors(caller)?)
}

/// The full thread between `caller` and `other`, oldest first.
pub fn history(
    db: &Database,
    caller: DoctorId,
    other: DoctorId,
) -> Result<Vec<Message>, ServerError> {
    Ok(db.get_history(caller, other)?)
}

/// Fail with [`ServerError::Forbidden`] unless the two doctors share an
/// accepted connection.
pub fn ensure_connected(db: &Database, a: DoctorId, b: DoctorId) -> Result<(), ServerError> {
    match db.find_connection_between(a, b)? {
        Some(c) if c.status == ConnectionStatus::Accepted => Ok(()),
        _ => Err(ServerError::Forbidden),
    }
}

/// Send a message, storing the attachment first.
///
/// The connection is checked before the file is written and again inside
/// the insert transaction.
pub async fn send(
    db: &Arc<Mutex<Database>>,
    uploads: &UploadStore,
    caller: DoctorId,
    target: DoctorId,
    content: &str,
    attachment: Option<Attachment>,
) -> Result<Message, ServerError> {
    let content = content.trim().to_string();
    if content.is_empty() && attachment.is_none() {
        return Err(ServerError::Validation(
            "Message must have content or an attachment".to_string(),
        ));
    }

    with_db(db, move |db| ensure_connected(db, caller, target)).await?;

    let stored = match &attachment {
        Some(file) => Some(uploads.store_attachment(&file.file_name, &file.data).await?),
        None => None,
    };

    record_message(db, uploads, caller, target, content, stored).await
}

/// Insert the message row for an already stored attachment.
///
/// If the insert fails, the attachment is removed only when this send
/// created it; a reused file still backs earlier messages.
pub async fn record_message(
    db: &Arc<Mutex<Database>>,
    uploads: &UploadStore,
    caller: DoctorId,
    target: DoctorId,
    content: String,
    stored: Option<StoredFile>,
) -> Result<Message, ServerError> {
    let file_path = stored.as_ref().map(|f| f.path.clone());
    let inserted = with_db(db, move |db| {
        db.with_transaction(|db| {
            ensure_connected(db, caller, target)?;
            Ok::<_, ServerError>(db.insert_message(caller, target, &content, file_path.as_deref())?)
        })
    })
    .await;

    match inserted {
        Ok(message) => {
            info!(
                message = %message.id,
                from = %caller,
                to = %target,
                attachment = message.file_path.is_some(),
                "message sent"
            );
            Ok(message)
        }
        Err(e) => {
            if let Some(file) = stored.filter(|f| f.created) {
                if let Err(cleanup) = uploads.remove(&file.path).await {
                    warn!(path = %file.path, error = %cleanup, "failed to remove orphaned attachment");
                }
            }
            Err(e)
        }
    }
}
