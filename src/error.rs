//! Error types for clonevoice.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloneVoiceError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Unknown configuration key: {key}")]
    ConfigUnknownKey { key: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    // Session errors
    #[error("Microphone permission denied: {message}")]
    PermissionDenied { message: String },

    // Backend errors
    #[error("Backend unavailable: {message}")]
    BackendUnavailable { message: String },

    #[error("Backend returned status {status} for {path}")]
    BackendStatus { status: u16, path: String },

    #[error("Malformed backend response from {path}: {message}")]
    MalformedResponse { path: String, message: String },

    #[error("Backend reply was empty")]
    EmptyReply,

    // Clone creation errors
    #[error("Clone setup incomplete: {message}")]
    CloneIncomplete { message: String },

    #[error("Invalid image frame: {message}")]
    InvalidFrame { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl CloneVoiceError {
    /// Whether the error came from talking to the backend.
    ///
    /// Backend errors are absorbed by the turn loop and replaced with a
    /// canned reply; everything else is a programming or setup error.
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            CloneVoiceError::BackendUnavailable { .. }
                | CloneVoiceError::BackendStatus { .. }
                | CloneVoiceError::MalformedResponse { .. }
                | CloneVoiceError::EmptyReply
        )
    }
}

impl From<reqwest::Error> for CloneVoiceError {
    fn from(err: reqwest::Error) -> Self {
        CloneVoiceError::BackendUnavailable {
            message: err.to_string(),
        }
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, CloneVoiceError>;
