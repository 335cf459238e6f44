//! Transcription dispatcher: the worker pool draining the utterance queue.

use crate::audio::wav::encode_wav_mono16;
use crate::defaults;
use crate::pipeline::commit::Committer;
use crate::pipeline::queue::{Dequeue, UtteranceReceiver};
use crate::pipeline::types::Utterance;
use crate::session::report::{SessionReporter, Subsystem};
use crate::stt::service::TranscriptionService;
use crate::transcript::entry::EntryDraft;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Configuration for the dispatcher pool.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Number of worker threads.
    pub pool_size: usize,
    /// Retry budget for transient service failures.
    pub retry_limit: u32,
    /// Base backoff between retries; doubles per attempt.
    pub retry_backoff: Duration,
    /// Sample rate of dispatched audio in Hz.
    pub sample_rate: u32,
    /// Language hint forwarded to the service.
    pub language_hint: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            pool_size: defaults::DISPATCHER_POOL_SIZE,
            retry_limit: defaults::TRANSCRIPTION_RETRY_LIMIT,
            retry_backoff: Duration::from_millis(defaults::RETRY_BACKOFF_MS),
            sample_rate: defaults::SAMPLE_RATE,
            language_hint: defaults::DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Spawns the worker pool. Workers exit when the queue closes (drain) or the
/// cancel flag is set (force stop).
pub(crate) fn spawn_workers(
    config: &DispatcherConfig,
    queue: UtteranceReceiver,
    service: Arc<dyn TranscriptionService>,
    committer: Arc<Committer>,
    cancel: Arc<AtomicBool>,
    reporter: Arc<dyn SessionReporter>,
) -> Vec<JoinHandle<()>> {
    (0..config.pool_size.max(1))
        .map(|_| {
            let config = config.clone();
            let queue = queue.clone();
            let service = service.clone();
            let committer = committer.clone();
            let cancel = cancel.clone();
            let reporter = reporter.clone();
            thread::spawn(move || {
                worker_loop(&config, &queue, &*service, &committer, &cancel, &*reporter)
            })
        })
        .collect()
}

fn worker_loop(
    config: &DispatcherConfig,
    queue: &UtteranceReceiver,
    service: &dyn TranscriptionService,
    committer: &Committer,
    cancel: &AtomicBool,
    reporter: &dyn SessionReporter,
) {
    loop {
        match queue.dequeue() {
            Dequeue::Item(utterance) => {
                let draft = transcribe_utterance(config, service, &utterance, cancel, reporter);
                committer.commit(utterance.index, draft);
            }
            Dequeue::Closed | Dequeue::Cancelled => break,
        }
    }
}

/// Transcribes one utterance with bounded retries.
///
/// Always returns a draft: success, or a failed marker once the retry
/// budget is exhausted or the error is permanent. Silent loss is disallowed.
pub(crate) fn transcribe_utterance(
    config: &DispatcherConfig,
    service: &dyn TranscriptionService,
    utterance: &Utterance,
    cancel: &AtomicBool,
    reporter: &dyn SessionReporter,
) -> EntryDraft {
    let wav = match encode_wav_mono16(&utterance.samples(), config.sample_rate) {
        Ok(wav) => wav,
        Err(e) => {
            reporter.incident(
                Subsystem::Dispatch,
                &format!("utterance {}: {e}", utterance.index),
            );
            return EntryDraft::failed(utterance.start, utterance.end, e.to_string());
        }
    };

    let mut attempt: u32 = 0;
    loop {
        match service.transcribe(&wav, config.sample_rate, &config.language_hint) {
            Ok(transcription) => {
                return EntryDraft::speech(
                    utterance.start,
                    utterance.end,
                    transcription.text,
                    transcription.confidence,
                    transcription.speaker_tag,
                );
            }
            Err(e) if e.is_transient() && attempt < config.retry_limit => {
                attempt += 1;
                reporter.incident(
                    Subsystem::Dispatch,
                    &format!(
                        "utterance {}: {e}; retry {attempt}/{}",
                        utterance.index, config.retry_limit
                    ),
                );
                let backoff = config.retry_backoff * 2u32.saturating_pow(attempt - 1);
                if !cancellable_sleep(backoff, cancel) {
                    return EntryDraft::failed(
                        utterance.start,
                        utterance.end,
                        "cancelled during retry".to_string(),
                    );
                }
            }
            Err(e) => {
                reporter.incident(
                    Subsystem::Dispatch,
                    &format!("utterance {}: giving up: {e}", utterance.index),
                );
                return EntryDraft::failed(utterance.start, utterance.end, e.to_string());
            }
        }
    }
}

/// Sleeps in small steps, returning false if cancelled meanwhile.
fn cancellable_sleep(duration: Duration, cancel: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        if cancel.load(Ordering::SeqCst) {
            return false;
        }
        thread::sleep(Duration::from_millis(10).min(duration));
    }
    !cancel.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::queue::utterance_queue;
    use crate::pipeline::types::AudioFrame;
    use crate::session::report::CollectingReporter;
    use crate::speaker::SpeakerPolicy;
    use crate::stt::service::MockTranscriptionService;
    use crate::transcript::entry::EntryKind;
    use crate::transcript::store::TranscriptStore;

    fn utterance(index: u64) -> Utterance {
        let frame = AudioFrame::new(vec![2000i16; 160], index, Duration::from_millis(index * 100));
        Utterance {
            index,
            start: frame.offset,
            end: frame.end_offset(16_000),
            frames: vec![frame],
            voiced_frames: 1,
            voiced_samples: 160,
        }
    }

    fn fast_config(pool_size: usize) -> DispatcherConfig {
        DispatcherConfig {
            pool_size,
            retry_limit: 2,
            retry_backoff: Duration::from_millis(5),
            sample_rate: 16_000,
            language_hint: "auto".to_string(),
        }
    }

    #[test]
    fn test_successful_transcription_produces_speech_draft() {
        let config = fast_config(1);
        let service = MockTranscriptionService::new()
            .with_response("hello")
            .with_confidence(0.7)
            .with_speaker_tags(&["S1"]);
        let cancel = AtomicBool::new(false);
        let reporter = CollectingReporter::new();

        let draft = transcribe_utterance(&config, &service, &utterance(0), &cancel, &reporter);
        assert_eq!(draft.kind, EntryKind::Speech);
        assert_eq!(draft.text, "hello");
        assert_eq!(draft.speaker_tag.as_deref(), Some("S1"));
        assert!(reporter.incidents().is_empty());
    }

    #[test]
    fn test_transient_failures_retried_then_succeed() {
        let config = fast_config(1);
        let service = MockTranscriptionService::new()
            .with_response("eventually")
            .with_transient_failures(2);
        let cancel = AtomicBool::new(false);
        let reporter = CollectingReporter::new();

        let draft = transcribe_utterance(&config, &service, &utterance(0), &cancel, &reporter);
        assert_eq!(draft.kind, EntryKind::Speech);
        assert_eq!(draft.text, "eventually");
        assert_eq!(service.calls(), 3);
        assert_eq!(reporter.from_subsystem(Subsystem::Dispatch).len(), 2);
    }

    #[test]
    fn test_retry_budget_exhaustion_yields_failed_marker() {
        let config = fast_config(1);
        let service = MockTranscriptionService::new().with_transient_failures(10);
        let cancel = AtomicBool::new(false);
        let reporter = CollectingReporter::new();

        let draft = transcribe_utterance(&config, &service, &utterance(0), &cancel, &reporter);
        assert_eq!(draft.kind, EntryKind::TranscriptionFailed);
        // initial call + retry_limit retries
        assert_eq!(service.calls(), 3);
    }

    #[test]
    fn test_permanent_failure_not_retried() {
        let config = fast_config(1);
        let service = MockTranscriptionService::new().with_permanent_failure();
        let cancel = AtomicBool::new(false);
        let reporter = CollectingReporter::new();

        let draft = transcribe_utterance(&config, &service, &utterance(0), &cancel, &reporter);
        assert_eq!(draft.kind, EntryKind::TranscriptionFailed);
        assert_eq!(service.calls(), 1);
        assert!(draft.text.contains("permanent"));
    }

    #[test]
    fn test_cancel_aborts_backoff() {
        let config = DispatcherConfig {
            retry_backoff: Duration::from_secs(5),
            ..fast_config(1)
        };
        let service = MockTranscriptionService::new().with_transient_failures(10);
        let cancel = AtomicBool::new(false);
        let reporter = CollectingReporter::new();

        let started = Instant::now();
        let cancel_ref = &cancel;
        thread::scope(|scope| {
            scope.spawn(move || {
                thread::sleep(Duration::from_millis(50));
                cancel_ref.store(true, Ordering::SeqCst);
            });
            let draft =
                transcribe_utterance(&config, &service, &utterance(0), cancel_ref, &reporter);
            assert_eq!(draft.kind, EntryKind::TranscriptionFailed);
        });
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_worker_pool_drains_queue_and_exits() {
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = utterance_queue(8, cancel.clone());
        let store = Arc::new(TranscriptStore::new(SpeakerPolicy::SingleSpeaker));
        let committer = Arc::new(Committer::new(store.clone()));
        let service: Arc<dyn TranscriptionService> =
            Arc::new(MockTranscriptionService::new().with_response("drained"));
        let reporter: Arc<dyn SessionReporter> = Arc::new(CollectingReporter::new());

        let workers = spawn_workers(
            &fast_config(2),
            rx,
            service,
            committer,
            cancel,
            reporter,
        );

        for i in 0..5 {
            tx.enqueue(utterance(i));
        }
        drop(tx);

        for worker in workers {
            worker.join().unwrap();
        }

        let entries = store.snapshot();
        assert_eq!(entries.len(), 5);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.sequence, i as u64 + 1);
            assert_eq!(entry.text, "drained");
        }
    }
}
