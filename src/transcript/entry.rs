//! Transcript entry types and the export record shape.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Transcribed speech.
    Speech,
    /// Marker for an utterance whose transcription failed after retries.
    /// The utterance is never silently dropped; `text` holds the error.
    TranscriptionFailed,
}

/// One row of the transcript ledger.
///
/// Immutable once appended. `sequence` is assigned at insertion, strictly
/// increasing and gapless from 1, and defines the canonical ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub sequence: u64,
    /// Capture offset of the utterance start, in milliseconds.
    pub start_ms: u64,
    /// Capture offset of the utterance end, in milliseconds.
    pub end_ms: u64,
    /// Speaker label, or null when diarization is off or unavailable.
    pub speaker: Option<String>,
    pub text: String,
    pub confidence: f32,
    pub kind: EntryKind,
}

impl TranscriptEntry {
    /// Duration covered by this entry.
    pub fn speaking(&self) -> Duration {
        Duration::from_millis(self.end_ms.saturating_sub(self.start_ms))
    }

    /// Renders the entry as a speaker-labeled transcript line.
    pub fn render_line(&self) -> String {
        match &self.speaker {
            Some(speaker) => format!("{speaker}: {}", self.text),
            None => self.text.clone(),
        }
    }
}

/// A not-yet-appended entry: everything but the sequence number and the
/// resolved speaker label, both assigned inside the store's critical section.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub start: Duration,
    pub end: Duration,
    /// Diarization tag from the transcription result, if any.
    pub speaker_tag: Option<String>,
    pub text: String,
    pub confidence: f32,
    pub kind: EntryKind,
}

impl EntryDraft {
    /// Draft for a successful transcription.
    pub fn speech(
        start: Duration,
        end: Duration,
        text: String,
        confidence: f32,
        speaker_tag: Option<String>,
    ) -> Self {
        Self {
            start,
            end,
            speaker_tag,
            text,
            confidence,
            kind: EntryKind::Speech,
        }
    }

    /// Marker draft for an utterance whose transcription was exhausted.
    pub fn failed(start: Duration, end: Duration, reason: String) -> Self {
        Self {
            start,
            end,
            speaker_tag: None,
            text: reason,
            confidence: 0.0,
            kind: EntryKind::TranscriptionFailed,
        }
    }
}
