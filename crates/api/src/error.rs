use thiserror::Error;

/// Raised when binary input does not decode into a class descriptor.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Malformed class file: {0}")]
    Malformed(String),
    #[error("Invalid type signature `{signature}`: {reason}")]
    Signature { signature: String, reason: String },
    #[error("Class entry not found: {0}")]
    MissingEntry(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type FormatResult<T> = std::result::Result<T, FormatError>;
