//! Bounded utterance queue between segmentation and dispatch.
//!
//! A thin wrapper around a bounded crossbeam channel. `enqueue` blocks while
//! the queue is full — this is the pipeline's backpressure point: when
//! transcription falls behind, the segmenter (and with it the frame source)
//! pauses instead of dropping audio. Both ends unblock promptly when the
//! session is force-stopped.

use crate::pipeline::types::Utterance;
use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How often blocked callers re-check the cancel flag.
const POLL: Duration = Duration::from_millis(25);

/// Creates a bounded utterance queue with the given capacity.
///
/// Dropping the sender closes the queue; receivers drain remaining items and
/// then observe [`Dequeue::Closed`].
pub fn utterance_queue(
    capacity: usize,
    cancel: Arc<AtomicBool>,
) -> (UtteranceSender, UtteranceReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    (
        UtteranceSender {
            tx,
            cancel: cancel.clone(),
        },
        UtteranceReceiver { rx, cancel },
    )
}

/// Outcome of an enqueue attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Enqueue {
    /// The utterance was accepted.
    Accepted,
    /// The session was force-stopped while waiting for space.
    Cancelled,
    /// All receivers are gone.
    Closed,
}

/// Outcome of a dequeue attempt.
#[derive(Debug)]
pub enum Dequeue {
    /// The next utterance, in segmentation order.
    Item(Utterance),
    /// The sender is gone and the queue is drained.
    Closed,
    /// The session was force-stopped.
    Cancelled,
}

/// Producing end of the queue, owned by the capture/segmentation stage.
pub struct UtteranceSender {
    tx: Sender<Utterance>,
    cancel: Arc<AtomicBool>,
}

impl UtteranceSender {
    /// Enqueues an utterance, blocking while the queue is full.
    pub fn enqueue(&self, utterance: Utterance) -> Enqueue {
        let mut pending = utterance;
        loop {
            if self.cancel.load(Ordering::SeqCst) {
                return Enqueue::Cancelled;
            }
            match self.tx.send_timeout(pending, POLL) {
                Ok(()) => return Enqueue::Accepted,
                Err(SendTimeoutError::Timeout(returned)) => pending = returned,
                Err(SendTimeoutError::Disconnected(_)) => return Enqueue::Closed,
            }
        }
    }

    /// Number of utterances currently buffered.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    /// Returns true if no utterances are buffered.
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// Consuming end of the queue, cloned across dispatcher workers.
///
/// Each utterance is delivered to exactly one worker.
#[derive(Clone)]
pub struct UtteranceReceiver {
    rx: Receiver<Utterance>,
    cancel: Arc<AtomicBool>,
}

impl UtteranceReceiver {
    /// Dequeues the next utterance, blocking until one arrives, the queue
    /// closes, or the session is force-stopped.
    pub fn dequeue(&self) -> Dequeue {
        loop {
            if self.cancel.load(Ordering::SeqCst) {
                return Dequeue::Cancelled;
            }
            match self.rx.recv_timeout(POLL) {
                Ok(utterance) => return Dequeue::Item(utterance),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Dequeue::Closed,
            }
        }
    }

    /// Number of utterances currently buffered.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns true if no utterances are buffered.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    fn utterance(index: u64) -> Utterance {
        Utterance {
            index,
            frames: Vec::new(),
            start: Duration::from_millis(index * 100),
            end: Duration::from_millis(index * 100 + 50),
            voiced_frames: 0,
            voiced_samples: 0,
        }
    }

    #[test]
    fn test_fifo_order() {
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = utterance_queue(4, cancel);

        for i in 0..3 {
            assert_eq!(tx.enqueue(utterance(i)), Enqueue::Accepted);
        }

        for expected in 0..3 {
            match rx.dequeue() {
                Dequeue::Item(u) => assert_eq!(u.index, expected),
                other => panic!("Expected item, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_closed_after_sender_dropped_and_drained() {
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = utterance_queue(4, cancel);

        tx.enqueue(utterance(0));
        drop(tx);

        assert!(matches!(rx.dequeue(), Dequeue::Item(_)));
        assert!(matches!(rx.dequeue(), Dequeue::Closed));
    }

    #[test]
    fn test_enqueue_blocks_when_full_then_resumes() {
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = utterance_queue(1, cancel);

        assert_eq!(tx.enqueue(utterance(0)), Enqueue::Accepted);

        let handle = thread::spawn(move || {
            let started = Instant::now();
            let outcome = tx.enqueue(utterance(1));
            (outcome, started.elapsed())
        });

        // Give the producer time to block on the full queue.
        thread::sleep(Duration::from_millis(100));
        assert!(matches!(rx.dequeue(), Dequeue::Item(_)));

        let (outcome, elapsed) = handle.join().unwrap();
        assert_eq!(outcome, Enqueue::Accepted);
        assert!(elapsed >= Duration::from_millis(50), "send did not block");
    }

    #[test]
    fn test_cancel_unblocks_full_enqueue() {
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, _rx) = utterance_queue(1, cancel.clone());

        assert_eq!(tx.enqueue(utterance(0)), Enqueue::Accepted);

        let handle = thread::spawn(move || tx.enqueue(utterance(1)));
        thread::sleep(Duration::from_millis(50));
        cancel.store(true, Ordering::SeqCst);

        assert_eq!(handle.join().unwrap(), Enqueue::Cancelled);
    }

    #[test]
    fn test_cancel_unblocks_empty_dequeue() {
        let cancel = Arc::new(AtomicBool::new(false));
        let (_tx, rx) = utterance_queue(1, cancel.clone());

        let handle = thread::spawn(move || rx.dequeue());
        thread::sleep(Duration::from_millis(50));
        cancel.store(true, Ordering::SeqCst);

        assert!(matches!(handle.join().unwrap(), Dequeue::Cancelled));
    }

    #[test]
    fn test_each_item_consumed_by_exactly_one_receiver() {
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = utterance_queue(8, cancel);

        for i in 0..8 {
            tx.enqueue(utterance(i));
        }
        drop(tx);

        let rx2 = rx.clone();
        let worker = |rx: UtteranceReceiver| {
            thread::spawn(move || {
                let mut seen = Vec::new();
                loop {
                    match rx.dequeue() {
                        Dequeue::Item(u) => seen.push(u.index),
                        _ => break,
                    }
                }
                seen
            })
        };

        let a = worker(rx).join().unwrap();
        let b = worker(rx2).join().unwrap();

        let mut all: Vec<u64> = a.into_iter().chain(b).collect();
        all.sort_unstable();
        assert_eq!(all, (0..8).collect::<Vec<_>>());
    }
}
