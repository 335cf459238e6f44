//! Default configuration constants for meetscribe.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16_000;

/// Default capture frame size in samples.
///
/// 1024 samples at 16kHz is 64ms of audio per frame — small enough for
/// responsive silence detection, large enough to keep per-frame overhead low.
pub const FRAME_SIZE: usize = 1024;

/// Default silence threshold, as mean absolute amplitude over i16 samples.
///
/// A frame whose level is at or below this value counts as silent.
/// 500 is tuned for typical meeting-room microphone levels.
pub const SILENCE_THRESHOLD: f32 = 500.0;

/// Default trailing-silence duration (seconds) that closes an utterance.
///
/// 2 seconds allows for natural pauses in speech without splitting a
/// sentence across utterances.
pub const SILENCE_DURATION_SECS: f32 = 2.0;

/// Default utterance queue capacity.
///
/// Enough to buffer a few seconds of backlog when the transcription service
/// falls behind; beyond this the segmenter blocks (backpressure).
pub const QUEUE_CAPACITY: usize = 8;

/// Default transcription dispatcher pool size.
pub const DISPATCHER_POOL_SIZE: usize = 1;

/// Default retry limit for transient transcription failures.
pub const TRANSCRIPTION_RETRY_LIMIT: u32 = 3;

/// Base backoff between transcription retries in milliseconds (doubles per attempt).
pub const RETRY_BACKOFF_MS: u64 = 250;

/// Default per-request timeout for the transcription service in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Deadline for `force_stop` in milliseconds.
///
/// Threads still running after this are detached; they die with the process.
pub const FORCE_STOP_DEADLINE_MS: u64 = 150;

/// Default language hint for transcription.
///
/// "auto" lets the service detect the spoken language.
pub const DEFAULT_LANGUAGE: &str = "auto";

/// Default transcription model requested from the service.
pub const DEFAULT_STT_MODEL: &str = "whisper-1";

/// Default transcription service endpoint.
pub const DEFAULT_STT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Default summarization model requested from the service.
pub const DEFAULT_SUMMARY_MODEL: &str = "gpt-4o-mini";

/// Default summarization service endpoint.
pub const DEFAULT_SUMMARY_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Meeting title used when none is supplied.
pub const DEFAULT_MEETING_TITLE: &str = "Untitled meeting";

/// Environment variable holding the API key for the remote services.
pub const API_KEY_ENV: &str = "MEETSCRIBE_API_KEY";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_duration_is_a_useful_fraction_of_silence_window() {
        // The silence window must span multiple frames, or the segmenter
        // would close utterances on a single quiet frame.
        let frames_per_window =
            (SILENCE_DURATION_SECS * SAMPLE_RATE as f32 / FRAME_SIZE as f32).ceil() as usize;
        assert!(frames_per_window > 10);
    }
}
