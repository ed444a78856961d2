/// Application name
pub const APP_NAME: &str = "Doctor Referral";

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 5003;

/// Maximum accepted upload size in bytes (16 MiB)
pub const MAX_UPLOAD_SIZE: usize = 16 * 1024 * 1024;

/// File extensions accepted for avatar images
pub const AVATAR_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

/// Default session lifetime in seconds (30 days)
pub const DEFAULT_SESSION_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// PBKDF2-HMAC-SHA256 rounds for new password hashes
pub const PBKDF2_ITERATIONS: u32 = 600_000;

/// Salt length for password hashes in bytes
pub const SALT_LENGTH: usize = 16;

/// Derived key length for password hashes in bytes
pub const HASH_LENGTH: usize = 32;

/// Timestamp format used in message history responses
pub const HISTORY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats accepted for the appointment date-time form field
pub const APPOINTMENT_INPUT_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];
