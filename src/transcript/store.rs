//! Append-only transcript store.
//!
//! The single source of truth for attributed transcript entries, read by the
//! presentation layer and the summarization service. One mutex guards both
//! the entry list and the speaker ledger, entered once per append, so a
//! reader never observes an entry without its profile update (or vice versa).

use crate::error::Result;
use crate::speaker::{SpeakerLedger, SpeakerPolicy, SpeakerProfile};
use crate::transcript::entry::{EntryDraft, EntryKind, TranscriptEntry};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::io::Write;

struct StoreInner {
    entries: Vec<TranscriptEntry>,
    ledger: SpeakerLedger,
    closed: bool,
}

/// Thread-safe, append-only transcript ledger.
pub struct TranscriptStore {
    policy: SpeakerPolicy,
    inner: Mutex<StoreInner>,
    entry_tx: Option<Sender<TranscriptEntry>>,
}

impl TranscriptStore {
    /// Creates an empty store with the given attribution policy.
    pub fn new(policy: SpeakerPolicy) -> Self {
        Self {
            policy,
            inner: Mutex::new(StoreInner {
                entries: Vec::new(),
                ledger: SpeakerLedger::new(),
                closed: false,
            }),
            entry_tx: None,
        }
    }

    /// Registers a channel notified on every append (non-blocking send;
    /// the presentation layer may also just poll `snapshot`).
    pub fn with_entry_sender(mut self, tx: Sender<TranscriptEntry>) -> Self {
        self.entry_tx = Some(tx);
        self
    }

    /// The attribution policy this store was opened with.
    pub fn policy(&self) -> SpeakerPolicy {
        self.policy
    }

    /// Appends a draft, assigning the next sequence number and resolving the
    /// speaker label. Returns the appended entry, or `None` once the store
    /// has been closed (results arriving after a force-stop are discarded).
    pub fn append(&self, draft: EntryDraft) -> Option<TranscriptEntry> {
        let entry = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return None;
            }

            let speaker = match draft.kind {
                EntryKind::Speech => self.policy.resolve(draft.speaker_tag.as_deref()),
                EntryKind::TranscriptionFailed => None,
            };

            let entry = TranscriptEntry {
                sequence: inner.entries.len() as u64 + 1,
                start_ms: draft.start.as_millis() as u64,
                end_ms: draft.end.as_millis() as u64,
                speaker,
                text: draft.text,
                confidence: draft.confidence,
                kind: draft.kind,
            };

            if entry.kind == EntryKind::Speech {
                inner
                    .ledger
                    .record(entry.speaker.as_deref(), &entry.text, entry.speaking());
            }
            inner.entries.push(entry.clone());
            entry
        };

        if let Some(tx) = &self.entry_tx {
            let _ = tx.try_send(entry.clone());
        }

        Some(entry)
    }

    /// Rejects all further appends. Entries already appended stay readable.
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }

    /// Returns true once the store no longer accepts appends.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Copy of all entries in sequence order (copy-on-read; writers are
    /// never blocked for long).
    pub fn snapshot(&self) -> Vec<TranscriptEntry> {
        self.inner.lock().entries.clone()
    }

    /// Number of entries appended.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Returns true if nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Speaker-labeled concatenation of all speech entries, for
    /// summarization. Failed markers are omitted.
    pub fn full_text(&self) -> String {
        let inner = self.inner.lock();
        let mut out = String::new();
        for entry in &inner.entries {
            if entry.kind != EntryKind::Speech {
                continue;
            }
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&entry.render_line());
        }
        out
    }

    /// Copies of the per-speaker profiles, implicit speaker first.
    pub fn speaker_profiles(&self) -> Vec<SpeakerProfile> {
        self.inner.lock().ledger.profiles()
    }

    /// Writes the transcript as JSONL: one entry per line, all fields, in
    /// sequence order. Sufficient for the summarization service and for
    /// reproducible tests.
    pub fn export_jsonl<W: Write>(&self, mut writer: W) -> Result<()> {
        for entry in self.snapshot() {
            let line = serde_json::to_string(&entry)
                .map_err(|e| crate::error::MeetscribeError::Other(e.to_string()))?;
            writeln!(writer, "{line}")?;
        }
        Ok(())
    }
}
