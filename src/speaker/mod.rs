//! Speaker attribution and per-speaker statistics.

use crate::transcript::entry::{EntryKind, TranscriptEntry};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Attribution policy, selected at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeakerPolicy {
    /// Pass through the diarization tag attached to each transcription result.
    Diarized,
    /// No diarization: the label is null and attribution logic is bypassed.
    #[default]
    SingleSpeaker,
}

impl SpeakerPolicy {
    /// Resolves a speaker label from a diarization tag.
    ///
    /// Pure function of (policy, tag); never blocks.
    pub fn resolve(self, tag: Option<&str>) -> Option<String> {
        match self {
            SpeakerPolicy::Diarized => tag.map(str::to_string),
            SpeakerPolicy::SingleSpeaker => None,
        }
    }
}

/// Cumulative statistics for one speaker label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeakerProfile {
    /// Speaker label; `None` is the implicit single speaker.
    pub label: Option<String>,
    /// Number of utterances attributed to this speaker.
    pub utterances: u64,
    /// Number of words attributed to this speaker.
    pub words: u64,
    /// Cumulative speaking duration in milliseconds.
    pub speaking_ms: u64,
}

impl SpeakerProfile {
    fn new(label: Option<String>) -> Self {
        Self {
            label,
            utterances: 0,
            words: 0,
            speaking_ms: 0,
        }
    }
}

/// Per-speaker statistics, keyed by label.
///
/// Mutated only inside the transcript store's critical section, so profile
/// totals always match the entries already appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeakerLedger {
    profiles: BTreeMap<Option<String>, SpeakerProfile>,
}

impl SpeakerLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one attributed utterance.
    pub fn record(&mut self, label: Option<&str>, text: &str, speaking: Duration) {
        let key = label.map(str::to_string);
        let profile = self
            .profiles
            .entry(key.clone())
            .or_insert_with(|| SpeakerProfile::new(key));
        profile.utterances += 1;
        profile.words += word_count(text);
        profile.speaking_ms += speaking.as_millis() as u64;
    }

    /// Returns all profiles, ordered by label (implicit speaker first).
    pub fn profiles(&self) -> Vec<SpeakerProfile> {
        self.profiles.values().cloned().collect()
    }

    /// Number of distinct speaker labels seen.
    pub fn speaker_count(&self) -> usize {
        self.profiles.len()
    }

    /// Rebuilds a ledger from a transcript snapshot.
    ///
    /// Failed-marker entries carry no speech and are not counted. Used as a
    /// consistency check against the live ledger.
    pub fn recompute(entries: &[TranscriptEntry]) -> Self {
        let mut ledger = Self::new();
        for entry in entries {
            if entry.kind != EntryKind::Speech {
                continue;
            }
            ledger.record(
                entry.speaker.as_deref(),
                &entry.text,
                Duration::from_millis(entry.end_ms.saturating_sub(entry.start_ms)),
            );
        }
        ledger
    }
}

/// Number of whitespace-separated words in a text.
pub fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}
