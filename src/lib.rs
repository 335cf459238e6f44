//! meetscribe - live meeting transcription engine
//!
//! Captures a live audio stream, segments it into speech utterances by
//! silence detection, dispatches each utterance to a transcription service,
//! attributes text to speakers, and assembles an ordered, append-only
//! transcript for presentation and summarization.

// Enforce error handling discipline in non-test code
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod audio;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod segment;
pub mod session;
pub mod speaker;
pub mod stt;
pub mod summary;
pub mod transcript;

#[cfg(feature = "cli")]
pub mod app;
#[cfg(feature = "cli")]
pub mod cli;

// Core seams (source → segment → dispatch → store)
pub use audio::source::{FramePhase, FrameSource, ScriptedFrameSource};
pub use segment::{SegmenterConfig, SilenceSegmenter};
pub use stt::service::{MockTranscriptionService, Transcription, TranscriptionService};
pub use summary::{MockSummarizer, SummarizationService};

// Session surface
pub use session::{
    CollectingReporter, LogReporter, SessionConfig, SessionController, SessionOptions,
    SessionReporter, SessionState,
};

// Transcript surface
pub use speaker::{SpeakerLedger, SpeakerPolicy, SpeakerProfile};
pub use transcript::{EntryKind, TranscriptEntry, TranscriptStore};

// Error handling
pub use error::{MeetscribeError, Result};

// Config
pub use config::Config;
