use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use referral_shared::DoctorId;

use crate::error::ServerError;

const ATTACHMENT_DIR: &str = "attachments";
const AVATAR_DIR: &str = "avatars";

/// Public URL prefix the upload root is served under.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Verify that a relative path stays within the upload root.
/// Prevents path traversal attacks.
fn ensure_within(base: &Path, relative: &Path) -> Result<PathBuf, ServerError> {
    let mut resolved = base.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(c) => resolved.push(c),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ServerError::Validation("Invalid file path".to_string()));
            }
        }
    }
    Ok(resolved)
}

/// Reduce an uploaded file name to a safe, flat ASCII name.
///
/// Keeps letters, digits, `.`, `-` and `_`; whitespace becomes `_`; path
/// separators split the name and only the last segment survives; leading
/// dots are stripped so the result is never hidden or relative.
pub fn sanitize_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = last
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// Lowercase extension of a file name, if any.
pub fn file_extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Result of [`UploadStore::store_attachment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Reference relative to the upload root.
    pub path: String,
    /// `false` when the same bytes were already stored under this name.
    pub created: bool,
}

/// Filesystem area for message attachments and avatars.
///
/// Stored references are paths relative to the root, e.g.
/// `attachments/<hash>_report.pdf` or `avatars/3_me.png`.
#[derive(Debug, Clone)]
pub struct UploadStore {
    base_path: PathBuf,
    max_size: usize,
}

impl UploadStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self, ServerError> {
        for sub in [ATTACHMENT_DIR, AVATAR_DIR] {
            let dir = base_path.join(sub);
            fs::create_dir_all(&dir).await.map_err(|e| {
                ServerError::UploadStorage(format!(
                    "Failed to create upload directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        info!(path = %base_path.display(), "Upload store initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Store a message attachment under a content-addressed name.
    ///
    /// The name is prefixed with a BLAKE3 digest of the bytes, so two
    /// different files never share a path.  An identical upload reuses the
    /// existing file, which may already back another message; only a file
    /// this call created is reported as `created`.
    pub async fn store_attachment(
        &self,
        original_name: &str,
        data: &[u8],
    ) -> Result<StoredFile, ServerError> {
        self.check_size(data)?;

        let digest = blake3::hash(data).to_hex();
        let prefix = &digest.as_str()[..32];
        let clean = sanitize_file_name(original_name);
        let file_name = if clean.is_empty() {
            prefix.to_string()
        } else {
            format!("{prefix}_{clean}")
        };

        let relative = format!("{ATTACHMENT_DIR}/{file_name}");
        let path = self.resolve(&relative)?;
        let exists = fs::try_exists(&path).await.map_err(|e| {
            ServerError::UploadStorage(format!("Failed to stat {}: {}", relative, e))
        })?;
        if exists {
            debug!(path = %relative, "Attachment already stored");
        } else {
            self.write(&relative, data).await?;
        }

        Ok(StoredFile {
            path: relative,
            created: !exists,
        })
    }

    /// Store an avatar under a name derived from the doctor's id.
    pub async fn store_avatar(
        &self,
        doctor: DoctorId,
        original_name: &str,
        data: &[u8],
    ) -> Result<String, ServerError> {
        self.check_size(data)?;

        let clean = sanitize_file_name(original_name);
        if clean.is_empty() {
            return Err(ServerError::Validation("No file selected".to_string()));
        }

        let relative = format!("{AVATAR_DIR}/{doctor}_{clean}");
        self.write(&relative, data).await?;
        Ok(relative)
    }

    /// Delete a stored file.  Returns `false` if it did not exist.
    pub async fn remove(&self, relative: &str) -> Result<bool, ServerError> {
        let path = self.resolve(relative)?;

        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path).await.map_err(|e| {
            ServerError::UploadStorage(format!("Failed to delete {}: {}", relative, e))
        })?;

        debug!(path = %relative, "Deleted upload");
        Ok(true)
    }

    pub async fn read(&self, relative: &str) -> Result<Vec<u8>, ServerError> {
        let path = self.resolve(relative)?;

        if !path.exists() {
            return Err(ServerError::NotFound("File"));
        }

        fs::read(&path)
            .await
            .map_err(|e| ServerError::UploadStorage(format!("Failed to read {}: {}", relative, e)))
    }

    /// Absolute path of a stored reference, rejecting traversal.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, ServerError> {
        ensure_within(&self.base_path, Path::new(relative))
    }

    /// Public URL for a stored reference.
    pub fn url_for(relative: &str) -> String {
        format!("{UPLOADS_URL_PREFIX}/{relative}")
    }

    /// Reject empty uploads and uploads over the configured limit.
    pub fn check_size(&self, data: &[u8]) -> Result<(), ServerError> {
        if data.is_empty() {
            return Err(ServerError::Validation("Empty file".to_string()));
        }
        if data.len() > self.max_size {
            return Err(ServerError::PayloadTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }
        Ok(())
    }

    async fn write(&self, relative: &str, data: &[u8]) -> Result<(), ServerError> {
        let path = self.resolve(relative)?;
        fs::write(&path, data)
            .await
            .map_err(|e| ServerError::UploadStorage(format!("Failed to write {}: {}", relative, e)))?;

        debug!(path = %relative, size = data.len(), "Stored upload");
        Ok(())
    }
}
