//! Transcription service seam: trait, mock, and the HTTP client.

#[cfg(feature = "remote")]
pub mod remote;
pub mod service;

pub use service::{MockTranscriptionService, Transcription, TranscriptionService};

#[cfg(feature = "remote")]
pub use remote::{HttpSttConfig, HttpTranscriptionService};
