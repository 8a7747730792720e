//! Error Types

use thiserror::Error;

/// Result type alias for pet-image operations
pub type Result<T> = std::result::Result<T, FurbleError>;

const UNSUPPORTED_IMAGE_MESSAGE: &str = "Uploaded file is not a valid image. \
     Only jpeg, jpg, png, gif, bmp, webp formats are supported.";

/// Broad classification used by the HTTP layer to pick a status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    InvalidReference,
    ExternalService,
    Unavailable,
    Internal,
}

/// Pet-image lifecycle errors
#[derive(Error, Debug)]
pub enum FurbleError {
    /// Declared or sniffed type is not an accepted image format
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Upload exceeds the size ceiling
    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Request shape is wrong (missing field, unknown prompt subject, ...)
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Record or referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Access gated on an unmet precondition
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// External reference does not resolve
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Identifier codec rejected its input
    #[error("Codec error: {0}")]
    Codec(String),

    /// Image transformer call failed
    #[error("Transformer error: {0}")]
    Transformer(String),

    /// Payment processor call failed
    #[error("Payment processor error: {0}")]
    Payment(String),

    /// An optional collaborator was not configured at startup
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Record store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Image decode/encode failure after validation
    #[error("Image processing error: {0}")]
    Image(String),

    /// Archive packaging failure
    #[error("Archive error: {0}")]
    Archive(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Blob storage or other filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FurbleError {
    /// Shorthand for the generic "no such record" outcome.
    pub fn record_not_found() -> Self {
        FurbleError::NotFound("Image not found".into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FurbleError::UnsupportedMediaType(_)
            | FurbleError::PayloadTooLarge { .. }
            | FurbleError::Validation(_) => ErrorKind::Validation,
            FurbleError::NotFound(_) => ErrorKind::NotFound,
            FurbleError::Forbidden(_) => ErrorKind::Forbidden,
            FurbleError::InvalidReference(_) => ErrorKind::InvalidReference,
            FurbleError::Transformer(_) | FurbleError::Payment(_) => ErrorKind::ExternalService,
            FurbleError::Unavailable(_) => ErrorKind::Unavailable,
            FurbleError::Codec(_)
            | FurbleError::Storage(_)
            | FurbleError::Image(_)
            | FurbleError::Archive(_)
            | FurbleError::Config(_)
            | FurbleError::Io(_) => ErrorKind::Internal,
        }
    }

    /// Message that is safe to hand back to a caller.
    ///
    /// Internal failures never leak their detail.
    pub fn user_message(&self) -> String {
        match self {
            FurbleError::UnsupportedMediaType(_) => UNSUPPORTED_IMAGE_MESSAGE.into(),
            FurbleError::PayloadTooLarge { max, .. } => format!(
                "Image size exceeds the maximum allowed size of {} MB",
                max / (1024 * 1024)
            ),
            FurbleError::Validation(msg)
            | FurbleError::NotFound(msg)
            | FurbleError::Forbidden(msg)
            | FurbleError::InvalidReference(msg) => msg.clone(),
            FurbleError::Transformer(_) => {
                "The image service is currently unavailable. Please try again.".into()
            }
            FurbleError::Payment(_) => "Payment processing failed. Please try again.".into(),
            FurbleError::Unavailable(what) => format!("{what} is not configured"),
            _ => "An unexpected error occurred. Please try again later.".into(),
        }
    }
}
