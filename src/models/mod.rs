pub mod application;
pub mod interview;
pub mod job;
pub mod user;

/// Raised when a stored or submitted enum value is not one we know.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl From<ParseEnumError> for crate::error::Error {
    fn from(err: ParseEnumError) -> Self {
        crate::error::Error::InvalidInput(err.to_string())
    }
}
