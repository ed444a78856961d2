use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("No data directory available for the referral database")]
    NoDataDir,

    /// Creating the database directory failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A lookup by id matched no row.
    #[error("Record not found")]
    NotFound,

    #[error("Migration error: {0}")]
    Migration(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Turn `QueryReturnedNoRows` into [`StoreError::NotFound`] for single-row
/// lookups.
pub(crate) fn not_found(e: rusqlite::Error) -> StoreError {
    if matches!(e, rusqlite::Error::QueryReturnedNoRows) {
        StoreError::NotFound
    } else {
        StoreError::Sqlite(e)
    }
}
