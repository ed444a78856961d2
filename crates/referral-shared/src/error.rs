use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SharedError {
    #[error("Invalid {kind}: {value}")]
    InvalidEnum { kind: &'static str, value: String },

    #[error("Password cannot be empty")]
    EmptyPassword,
}
