//! Error types for meetscribe.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeetscribeError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio capture errors — always fatal to the session: a gap in the
    // frame stream cannot be detected after the fact.
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    Capture { message: String },

    // Transcription errors
    #[error("Transcription failed (transient): {message}")]
    TranscriptionTransient { message: String },

    #[error("Transcription failed (permanent): {message}")]
    TranscriptionPermanent { message: String },

    // Summarization errors — never affect transcript integrity
    #[error("Summarization failed: {message}")]
    Summarization { message: String },

    // Session lifecycle
    #[error("Invalid session state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Session already started")]
    AlreadyStarted,

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl MeetscribeError {
    /// Shorthand for a transient transcription failure (retried by the dispatcher).
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TranscriptionTransient {
            message: message.into(),
        }
    }

    /// Shorthand for a permanent transcription failure (recorded, never retried).
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::TranscriptionPermanent {
            message: message.into(),
        }
    }

    /// Returns true if the dispatcher should retry the failed call.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TranscriptionTransient { .. })
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, MeetscribeError>;
