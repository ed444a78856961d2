//! # referral-shared
//!
//! Types shared by the referral store and server: typed identifiers, the
//! status / priority enums persisted as lowercase text, the password KDF and
//! application-wide constants.

pub mod constants;
pub mod crypto;
pub mod error;
pub mod types;

pub use error::SharedError;
pub use types::*;
