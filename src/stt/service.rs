//! Transcription service trait and the mock used in tests.

use crate::error::{MeetscribeError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// A transcription result for one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    /// Transcribed text.
    pub text: String,
    /// Service-reported confidence (0.0 to 1.0).
    pub confidence: f32,
    /// Diarization tag supplied by the service, if any.
    pub speaker_tag: Option<String>,
}

impl Transcription {
    /// Creates a plain transcription with full confidence and no speaker tag.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: 1.0,
            speaker_tag: None,
        }
    }
}

/// Trait for the external transcription service.
///
/// This trait allows swapping implementations (remote HTTP service vs mock).
/// The dispatcher is agnostic to how the service is implemented internally;
/// implementations must enforce their own per-call timeout so a call never
/// blocks a worker forever.
pub trait TranscriptionService: Send + Sync {
    /// Transcribe a WAV-encoded utterance to text.
    ///
    /// # Arguments
    /// * `wav` - Complete WAV buffer (mono 16-bit PCM)
    /// * `sample_rate` - Sample rate of the encoded audio in Hz
    /// * `language_hint` - Language code, or "auto" for detection
    ///
    /// # Errors
    /// `TranscriptionTransient` failures are retried by the dispatcher;
    /// `TranscriptionPermanent` failures are recorded immediately.
    fn transcribe(&self, wav: &[u8], sample_rate: u32, language_hint: &str)
    -> Result<Transcription>;

    /// Name of the service for logging.
    fn name(&self) -> &'static str {
        "stt"
    }
}

/// Implement TranscriptionService for Arc<T> to allow sharing across workers.
impl<T: TranscriptionService> TranscriptionService for Arc<T> {
    fn transcribe(
        &self,
        wav: &[u8],
        sample_rate: u32,
        language_hint: &str,
    ) -> Result<Transcription> {
        (**self).transcribe(wav, sample_rate, language_hint)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Mock transcription service for testing.
///
/// Calls are counted; responses, speaker tags, per-call latencies, and
/// failures are scripted through the builder methods. The hold gate keeps
/// calls blocked until released, for backpressure and force-stop tests.
pub struct MockTranscriptionService {
    response: String,
    confidence: f32,
    speaker_tags: Vec<String>,
    latencies: Vec<Duration>,
    transient_failures: AtomicU32,
    permanent_failure: bool,
    hold: Option<Arc<AtomicBool>>,
    calls: AtomicUsize,
}

impl MockTranscriptionService {
    /// Create a new mock with a fixed response and no scripted behavior.
    pub fn new() -> Self {
        Self {
            response: "mock transcription".to_string(),
            confidence: 0.9,
            speaker_tags: Vec::new(),
            latencies: Vec::new(),
            transient_failures: AtomicU32::new(0),
            permanent_failure: false,
            hold: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Configure the text returned for every call.
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the reported confidence.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Configure speaker tags, cycled per call in order.
    pub fn with_speaker_tags(mut self, tags: &[&str]) -> Self {
        self.speaker_tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Configure per-call latencies, indexed by call order (last one repeats).
    pub fn with_latencies(mut self, latencies: Vec<Duration>) -> Self {
        self.latencies = latencies;
        self
    }

    /// Fail the first `n` calls with a transient error.
    pub fn with_transient_failures(self, n: u32) -> Self {
        self.transient_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Fail every call with a permanent error.
    pub fn with_permanent_failure(mut self) -> Self {
        self.permanent_failure = true;
        self
    }

    /// Block every call while the flag is set (released by clearing it).
    pub fn with_hold(mut self, hold: Arc<AtomicBool>) -> Self {
        self.hold = Some(hold);
        self
    }

    /// Number of transcribe calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTranscriptionService {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptionService for MockTranscriptionService {
    fn transcribe(
        &self,
        _wav: &[u8],
        _sample_rate: u32,
        _language_hint: &str,
    ) -> Result<Transcription> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(hold) = &self.hold {
            // Safety valve so a forgotten release cannot hang the test suite.
            let deadline = Instant::now() + Duration::from_secs(30);
            while hold.load(Ordering::SeqCst) && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(5));
            }
        }

        if let Some(latency) = self
            .latencies
            .get(call)
            .or_else(|| self.latencies.last())
            .copied()
        {
            std::thread::sleep(latency);
        }

        if self.permanent_failure {
            return Err(MeetscribeError::permanent("mock permanent failure"));
        }

        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(MeetscribeError::transient("mock transient failure"));
        }

        let speaker_tag = if self.speaker_tags.is_empty() {
            None
        } else {
            Some(self.speaker_tags[call % self.speaker_tags.len()].clone())
        };

        Ok(Transcription {
            text: self.response.clone(),
            confidence: self.confidence,
            speaker_tag,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_returns_response() {
        let service = MockTranscriptionService::new()
            .with_response("hello meeting")
            .with_confidence(0.8);

        let result = service.transcribe(&[0u8; 44], 16_000, "auto").unwrap();
        assert_eq!(result.text, "hello meeting");
        assert!((result.confidence - 0.8).abs() < f32::EPSILON);
        assert!(result.speaker_tag.is_none());
        assert_eq!(service.calls(), 1);
    }

    #[test]
    fn test_mock_cycles_speaker_tags() {
        let service = MockTranscriptionService::new().with_speaker_tags(&["S1", "S2"]);

        let tags: Vec<_> = (0..4)
            .map(|_| {
                service
                    .transcribe(&[], 16_000, "auto")
                    .unwrap()
                    .speaker_tag
                    .unwrap()
            })
            .collect();
        assert_eq!(tags, vec!["S1", "S2", "S1", "S2"]);
    }

    #[test]
    fn test_mock_transient_then_success() {
        let service = MockTranscriptionService::new().with_transient_failures(2);

        assert!(service.transcribe(&[], 16_000, "auto").unwrap_err().is_transient());
        assert!(service.transcribe(&[], 16_000, "auto").unwrap_err().is_transient());
        assert!(service.transcribe(&[], 16_000, "auto").is_ok());
        assert_eq!(service.calls(), 3);
    }

    #[test]
    fn test_mock_permanent_failure() {
        let service = MockTranscriptionService::new().with_permanent_failure();
        let err = service.transcribe(&[], 16_000, "auto").unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_service_trait_is_object_safe() {
        let service: Box<dyn TranscriptionService> =
            Box::new(MockTranscriptionService::new().with_response("boxed"));

        assert_eq!(service.name(), "mock");
        let result = service.transcribe(&[], 16_000, "en").unwrap();
        assert_eq!(result.text, "boxed");
    }

    #[test]
    fn test_hold_gate_blocks_until_released() {
        let hold = Arc::new(AtomicBool::new(true));
        let service =
            Arc::new(MockTranscriptionService::new().with_hold(hold.clone()));

        let worker = {
            let service = service.clone();
            std::thread::spawn(move || service.transcribe(&[], 16_000, "auto"))
        };

        std::thread::sleep(Duration::from_millis(50));
        assert!(!worker.is_finished());

        hold.store(false, Ordering::SeqCst);
        assert!(worker.join().unwrap().is_ok());
    }
}
