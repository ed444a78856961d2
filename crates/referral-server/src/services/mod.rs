//! Domain operations behind the HTTP handlers.
//!
//! Every function receives the caller's [`DoctorId`] explicitly; nothing
//! here looks at sessions or requests.  Each mutation runs as one
//! transaction: load, check ownership, write, commit.  Password hashing and
//! file I/O never run while the database lock is held.
//!
//! [`DoctorId`]: referral_shared::DoctorId

pub mod appointments;
pub mod avatar;
pub mod connections;
pub mod identity;
pub mod messaging;

use std::sync::{Arc, Mutex, MutexGuard};

use referral_store::{Database, StoreError};

use crate::error::ServerError;

/// Lock the shared database handle.
pub fn lock(db: &Mutex<Database>) -> Result<MutexGuard<'_, Database>, ServerError> {
    db.lock()
        .map_err(|e| ServerError::Internal(format!("Database lock poisoned: {e}")))
}

/// Run CPU-bound or blocking work on the blocking pool.
pub async fn off_thread<T, F>(f: F) -> Result<T, ServerError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ServerError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Internal(format!("Blocking task failed: {e}")))?
}

/// Lock the database on the blocking pool and run `f` against it.
///
/// The lock is held only for `f`; nothing else runs under it.
pub async fn with_db<T, F>(db: &Arc<Mutex<Database>>, f: F) -> Result<T, ServerError>
where
    T: Send + 'static,
    F: FnOnce(&Database) -> Result<T, ServerError> + Send + 'static,
{
    let db = Arc::clone(db);
    off_thread(move || {
        let db = lock(&db)?;
        f(&db)
    })
    .await
}

/// Turn a store-level "no rows" into a 404 naming the entity.
pub(crate) trait OrNotFound<T> {
    fn or_not_found(self, what: &'static str) -> Result<T, ServerError>;
}

impl<T> OrNotFound<T> for Result<T, StoreError> {
    fn or_not_found(self, what: &'static str) -> Result<T, ServerError> {
        self.map_err(|e| match e {
            StoreError::NotFound => ServerError::NotFound(what),
            other => ServerError::Storage(other),
        })
    }
}
