//! Ordered commit of transcription results into the store.
//!
//! Workers in a pool of size >1 finish out of order. The committer holds
//! results back until every earlier utterance has been committed, so store
//! sequence numbers reflect utterance start order, not completion order.
//! Release is gapless because every dequeued utterance commits exactly one
//! draft — a transcription or a failed marker.

use crate::transcript::entry::EntryDraft;
use crate::transcript::store::TranscriptStore;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

struct ReorderBuffer {
    /// Next utterance index to release.
    next: u64,
    pending: BTreeMap<u64, EntryDraft>,
}

/// Serializes result commits from all dispatcher workers.
pub struct Committer {
    store: Arc<TranscriptStore>,
    reorder: Mutex<ReorderBuffer>,
}

impl Committer {
    /// Creates a committer that releases utterance index 0 first.
    pub fn new(store: Arc<TranscriptStore>) -> Self {
        Self {
            store,
            reorder: Mutex::new(ReorderBuffer {
                next: 0,
                pending: BTreeMap::new(),
            }),
        }
    }

    /// Commits the result for one utterance, releasing any run of
    /// consecutive pending results that it completes.
    pub fn commit(&self, utterance_index: u64, draft: EntryDraft) {
        let mut guard = self.reorder.lock();
        let reorder = &mut *guard;
        reorder.pending.insert(utterance_index, draft);
        loop {
            let next = reorder.next;
            match reorder.pending.remove(&next) {
                Some(draft) => {
                    self.store.append(draft);
                    reorder.next += 1;
                }
                None => break,
            }
        }
    }

    /// Number of results waiting on an earlier utterance.
    pub fn pending(&self) -> usize {
        self.reorder.lock().pending.len()
    }
}
