//! Frame source trait and the scripted source used in tests.

use crate::error::{MeetscribeError, Result};
use crate::pipeline::types::AudioFrame;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Trait for devices that produce fixed-size PCM frames.
///
/// This trait allows swapping implementations (real capture device vs scripted).
/// The frame source is the only component touching hardware I/O; it assigns
/// monotonic sequence numbers and sample-derived capture offsets.
pub trait FrameSource: Send {
    /// Start capturing audio from the source.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio from the source.
    fn stop(&mut self) -> Result<()>;

    /// Pull the next captured frame.
    ///
    /// Returns `Ok(None)` when no frame is available right now. For a finite
    /// source this means the stream has ended; a live source may simply not
    /// have accumulated a full frame yet.
    ///
    /// Any error is a fatal capture failure: frame contiguity cannot be
    /// verified after a gap, so the session must abort rather than continue
    /// with missing frames.
    fn next_frame(&mut self) -> Result<Option<AudioFrame>>;

    /// Finite sources (files, scripts) end the session when exhausted.
    fn is_finite(&self) -> bool {
        false
    }
}

/// One phase of scripted frames: `count` frames cloned from `samples`.
#[derive(Debug, Clone)]
pub struct FramePhase {
    /// Sample template for each frame in this phase.
    pub samples: Vec<i16>,
    /// Number of frames to emit.
    pub count: usize,
}

impl FramePhase {
    /// A phase of voiced frames at a constant amplitude.
    pub fn voiced(frame_size: usize, amplitude: i16, count: usize) -> Self {
        Self {
            samples: vec![amplitude; frame_size],
            count,
        }
    }

    /// A phase of all-zero (silent) frames.
    pub fn silent(frame_size: usize, count: usize) -> Self {
        Self {
            samples: vec![0i16; frame_size],
            count,
        }
    }
}

/// Deterministic frame source for tests.
///
/// Emits the configured phases in order, then reports end of stream.
/// The shared pull counter lets tests observe the production rate at the
/// capture boundary (backpressure assertions).
pub struct ScriptedFrameSource {
    phases: Vec<FramePhase>,
    phase_index: usize,
    emitted_in_phase: usize,
    sequence: u64,
    samples_emitted: u64,
    sample_rate: u32,
    started: bool,
    fail_after: Option<u64>,
    error_message: String,
    pulls: Arc<AtomicU64>,
}

impl ScriptedFrameSource {
    /// Creates a new scripted source with no phases (immediately exhausted).
    pub fn new(sample_rate: u32) -> Self {
        Self {
            phases: Vec::new(),
            phase_index: 0,
            emitted_in_phase: 0,
            sequence: 0,
            samples_emitted: 0,
            sample_rate,
            started: false,
            fail_after: None,
            error_message: "scripted capture failure".to_string(),
            pulls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Appends a phase to the script.
    pub fn with_phase(mut self, phase: FramePhase) -> Self {
        self.phases.push(phase);
        self
    }

    /// Appends several phases to the script.
    pub fn with_phases(mut self, phases: Vec<FramePhase>) -> Self {
        self.phases.extend(phases);
        self
    }

    /// Configure the source to fail with a capture error after `n` frames.
    pub fn with_failure_after(mut self, n: u64) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Configure the error message used for injected failures.
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Shared counter of frames handed out, for production-rate assertions.
    pub fn pull_counter(&self) -> Arc<AtomicU64> {
        self.pulls.clone()
    }

    /// Total number of frames the script will produce.
    pub fn total_frames(&self) -> usize {
        self.phases.iter().map(|p| p.count).sum()
    }

    fn current_template(&mut self) -> Option<Vec<i16>> {
        while let Some(phase) = self.phases.get(self.phase_index) {
            if self.emitted_in_phase < phase.count {
                return Some(phase.samples.clone());
            }
            self.phase_index += 1;
            self.emitted_in_phase = 0;
        }
        None
    }
}

impl FrameSource for ScriptedFrameSource {
    fn start(&mut self) -> Result<()> {
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.started = false;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<AudioFrame>> {
        if let Some(limit) = self.fail_after
            && self.sequence >= limit
        {
            return Err(MeetscribeError::Capture {
                message: self.error_message.clone(),
            });
        }

        let Some(samples) = self.current_template() else {
            return Ok(None);
        };

        let offset = offset_of(self.samples_emitted, self.sample_rate);
        let frame = AudioFrame::new(samples, self.sequence, offset);

        self.sequence += 1;
        self.emitted_in_phase += 1;
        self.samples_emitted += frame.samples.len() as u64;
        self.pulls.fetch_add(1, Ordering::Relaxed);

        Ok(Some(frame))
    }

    fn is_finite(&self) -> bool {
        true
    }
}

/// Capture offset for a stream position, derived from the sample count.
pub(crate) fn offset_of(samples_emitted: u64, sample_rate: u32) -> Duration {
    Duration::from_nanos(samples_emitted * 1_000_000_000 / sample_rate.max(1) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_source_emits_phases_in_order() {
        let mut source = ScriptedFrameSource::new(16_000)
            .with_phase(FramePhase::voiced(160, 3000, 2))
            .with_phase(FramePhase::silent(160, 1));

        source.start().unwrap();

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(first.offset, Duration::ZERO);
        assert_eq!(first.samples[0], 3000);

        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.sequence, 1);
        assert_eq!(second.offset, Duration::from_millis(10));

        let third = source.next_frame().unwrap().unwrap();
        assert_eq!(third.samples[0], 0);

        assert!(source.next_frame().unwrap().is_none());
        assert!(source.is_finite());
    }

    #[test]
    fn test_scripted_source_counts_pulls() {
        let mut source =
            ScriptedFrameSource::new(16_000).with_phase(FramePhase::voiced(160, 1000, 5));
        let pulls = source.pull_counter();

        source.start().unwrap();
        for _ in 0..3 {
            source.next_frame().unwrap();
        }

        assert_eq!(pulls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_scripted_source_failure_injection() {
        let mut source = ScriptedFrameSource::new(16_000)
            .with_phase(FramePhase::voiced(160, 1000, 5))
            .with_failure_after(2)
            .with_error_message("device unplugged");

        source.start().unwrap();
        assert!(source.next_frame().is_ok());
        assert!(source.next_frame().is_ok());

        let err = source.next_frame().unwrap_err();
        match err {
            MeetscribeError::Capture { message } => assert_eq!(message, "device unplugged"),
            other => panic!("Expected Capture error, got {other:?}"),
        }
    }

    #[test]
    fn test_total_frames_sums_phases() {
        let source = ScriptedFrameSource::new(16_000)
            .with_phases(vec![
                FramePhase::voiced(160, 500, 4),
                FramePhase::silent(160, 6),
            ]);
        assert_eq!(source.total_frames(), 10);
    }
}
