//! Silence-based utterance segmentation.
//!
//! Classifies each frame as silent or voiced by mean absolute amplitude,
//! accumulates voiced runs, and closes an utterance once trailing silence
//! reaches the configured duration.

use crate::defaults;
use crate::pipeline::types::{AudioFrame, Utterance};

/// Configuration for the silence segmenter.
#[derive(Debug, Clone, Copy)]
pub struct SegmenterConfig {
    /// Mean-absolute-amplitude threshold; a frame at or below it is silent.
    pub silence_threshold: f32,
    /// Trailing silence (seconds) that closes an utterance.
    pub silence_duration_secs: f32,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Samples per frame.
    pub frame_size: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            silence_threshold: defaults::SILENCE_THRESHOLD,
            silence_duration_secs: defaults::SILENCE_DURATION_SECS,
            sample_rate: defaults::SAMPLE_RATE,
            frame_size: defaults::FRAME_SIZE,
        }
    }
}

impl SegmenterConfig {
    /// Number of consecutive silent frames that closes an utterance.
    ///
    /// `ceil(silence_duration_secs * sample_rate / frame_size)`, at least 1.
    /// The sample count is rounded before the division so that float noise
    /// in the configured duration cannot shift the frame threshold.
    pub fn close_run_frames(&self) -> usize {
        let silence_samples =
            (self.silence_duration_secs * self.sample_rate as f32).round() as usize;
        silence_samples.div_ceil(self.frame_size.max(1)).max(1)
    }
}

/// Mean absolute amplitude of a sample buffer.
pub fn mean_abs_level(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: i64 = samples.iter().map(|&s| (s as i32).abs() as i64).sum();
    (sum as f64 / samples.len() as f64) as f32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentState {
    /// Between utterances; silent frames are discarded.
    Silent,
    /// Accumulating an utterance; counting trailing silence toward close.
    Voiced,
}

/// Silence segmenter state machine.
///
/// Frames are consumed in capture order by a single thread; utterance
/// indexes therefore increase with start offsets.
pub struct SilenceSegmenter {
    config: SegmenterConfig,
    state: SegmentState,
    /// Buffered frames of the open utterance, with their voiced flag.
    buffer: Vec<(AudioFrame, bool)>,
    silence_run: usize,
    emitted: u64,
}

impl SilenceSegmenter {
    /// Creates a segmenter with the given configuration.
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            state: SegmentState::Silent,
            buffer: Vec::new(),
            silence_run: 0,
            emitted: 0,
        }
    }

    /// Returns true while an utterance is being accumulated.
    pub fn is_voiced(&self) -> bool {
        self.state == SegmentState::Voiced
    }

    /// Number of utterances emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Consumes one frame; returns a completed utterance when trailing
    /// silence closes the current voiced run.
    ///
    /// The trailing silent frames are excluded from the emitted utterance —
    /// they carry no speech and would waste transcription bandwidth. An
    /// all-silent span never produces an utterance.
    pub fn push(&mut self, frame: AudioFrame) -> Option<Utterance> {
        // Tie-break: a level exactly at the threshold counts as silent, so
        // synthetic zero-signal frames behave deterministically.
        let voiced = mean_abs_level(&frame.samples) > self.config.silence_threshold;

        match self.state {
            SegmentState::Silent => {
                if voiced {
                    self.state = SegmentState::Voiced;
                    self.silence_run = 0;
                    self.buffer.push((frame, true));
                }
                None
            }
            SegmentState::Voiced => {
                self.buffer.push((frame, voiced));
                if voiced {
                    self.silence_run = 0;
                    return None;
                }

                self.silence_run += 1;
                if self.silence_run < self.config.close_run_frames() {
                    return None;
                }

                let keep = self.buffer.len() - self.silence_run;
                let utterance = self.close(keep);
                self.state = SegmentState::Silent;
                Some(utterance)
            }
        }
    }

    /// Force-closes any in-progress utterance at end of stream.
    ///
    /// Partial trailing silence stays included — the stream ended before the
    /// close threshold, and no speech may be lost at session end.
    pub fn flush(&mut self) -> Option<Utterance> {
        if self.state != SegmentState::Voiced || self.buffer.is_empty() {
            return None;
        }

        let keep = self.buffer.len();
        let utterance = self.close(keep);
        self.state = SegmentState::Silent;
        Some(utterance)
    }

    /// Builds an utterance from the first `keep` buffered frames and resets
    /// the buffer. `keep` is always at least 1: the buffer starts with a
    /// voiced frame, and the silence run only covers trailing frames.
    fn close(&mut self, keep: usize) -> Utterance {
        let kept: Vec<(AudioFrame, bool)> = self.buffer.drain(..).take(keep).collect();
        self.silence_run = 0;

        let voiced_frames = kept.iter().filter(|(_, v)| *v).count();
        let voiced_samples = kept
            .iter()
            .filter(|(_, v)| *v)
            .map(|(f, _)| f.samples.len())
            .sum();

        let start = kept[0].0.offset;
        let end = kept[kept.len() - 1].0.end_offset(self.config.sample_rate);
        let frames = kept.into_iter().map(|(f, _)| f).collect();

        let utterance = Utterance {
            index: self.emitted,
            frames,
            start,
            end,
            voiced_frames,
            voiced_samples,
        };
        self.emitted += 1;
        utterance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const FRAME: usize = 160;
    const RATE: u32 = 16_000;

    fn test_config(close_frames: usize) -> SegmenterConfig {
        // silence_duration tuned so close_run_frames() == close_frames
        SegmenterConfig {
            silence_threshold: 500.0,
            silence_duration_secs: close_frames as f32 * FRAME as f32 / RATE as f32,
            sample_rate: RATE,
            frame_size: FRAME,
        }
    }

    fn feed(segmenter: &mut SilenceSegmenter, pattern: &[(i16, usize)]) -> Vec<Utterance> {
        let mut utterances = Vec::new();
        let mut sequence = 0u64;
        for &(amplitude, count) in pattern {
            for _ in 0..count {
                let offset =
                    Duration::from_nanos(sequence * FRAME as u64 * 1_000_000_000 / RATE as u64);
                let frame = AudioFrame::new(vec![amplitude; FRAME], sequence, offset);
                sequence += 1;
                if let Some(u) = segmenter.push(frame) {
                    utterances.push(u);
                }
            }
        }
        utterances
    }

    #[test]
    fn test_close_run_frames_rounds_up() {
        let config = SegmenterConfig {
            silence_threshold: 500.0,
            silence_duration_secs: 2.0,
            sample_rate: 16_000,
            frame_size: 1024,
        };
        // 2.0 * 16000 / 1024 = 31.25 → 32
        assert_eq!(config.close_run_frames(), 32);
    }

    #[test]
    fn test_mean_abs_level() {
        assert_eq!(mean_abs_level(&[]), 0.0);
        assert_eq!(mean_abs_level(&[0, 0, 0]), 0.0);
        assert_eq!(mean_abs_level(&[100, -100, 100, -100]), 100.0);
        // i16::MIN must not overflow on abs()
        assert!(mean_abs_level(&[i16::MIN]) > 32767.0);
    }

    #[test]
    fn test_threshold_tie_counts_as_silent() {
        let mut segmenter = SilenceSegmenter::new(test_config(3));
        // Exactly at threshold → silent → never opens an utterance
        let utterances = feed(&mut segmenter, &[(500, 10)]);
        assert!(utterances.is_empty());
        assert!(!segmenter.is_voiced());
        assert!(segmenter.flush().is_none());
    }

    #[test]
    fn test_all_silent_span_emits_nothing() {
        let mut segmenter = SilenceSegmenter::new(test_config(3));
        let utterances = feed(&mut segmenter, &[(0, 100)]);
        assert!(utterances.is_empty());
        assert_eq!(segmenter.emitted(), 0);
    }

    #[test]
    fn test_segmentation_determinism() {
        // 50 voiced, 40 silent (close at 30), 50 voiced → exactly two
        // utterances: the first of length 50, the second starting at the
        // 91st frame of the stream.
        let mut segmenter = SilenceSegmenter::new(test_config(30));
        let mut utterances = feed(&mut segmenter, &[(3000, 50), (0, 40), (3000, 50)]);
        if let Some(u) = segmenter.flush() {
            utterances.push(u);
        }

        assert_eq!(utterances.len(), 2);

        let first = &utterances[0];
        assert_eq!(first.index, 0);
        assert_eq!(first.frame_count(), 50);
        assert_eq!(first.frames[0].sequence, 0);
        assert_eq!(first.frames[49].sequence, 49);
        assert_eq!(first.voiced_frames, 50);

        let second = &utterances[1];
        assert_eq!(second.index, 1);
        assert_eq!(second.frame_count(), 50);
        // 1-based frame 91 is sequence 90
        assert_eq!(second.frames[0].sequence, 90);
    }

    #[test]
    fn test_trailing_silence_excluded_from_close() {
        let mut segmenter = SilenceSegmenter::new(test_config(3));
        let utterances = feed(&mut segmenter, &[(2000, 5), (0, 3)]);

        assert_eq!(utterances.len(), 1);
        assert_eq!(utterances[0].frame_count(), 5);
        assert_eq!(utterances[0].voiced_frames, 5);
        assert_eq!(utterances[0].end, Duration::from_millis(50));
    }

    #[test]
    fn test_internal_pause_shorter_than_close_is_kept() {
        let mut segmenter = SilenceSegmenter::new(test_config(4));
        let mut utterances = feed(&mut segmenter, &[(2000, 3), (0, 2), (2000, 3)]);
        if let Some(u) = segmenter.flush() {
            utterances.push(u);
        }

        assert_eq!(utterances.len(), 1);
        // The 2-frame pause is below the close threshold and stays inside.
        assert_eq!(utterances[0].frame_count(), 8);
        assert_eq!(utterances[0].voiced_frames, 6);
    }

    #[test]
    fn test_flush_keeps_partial_trailing_silence() {
        let mut segmenter = SilenceSegmenter::new(test_config(5));
        let utterances = feed(&mut segmenter, &[(2000, 4), (0, 2)]);
        assert!(utterances.is_empty());

        let flushed = segmenter.flush().expect("open utterance must flush");
        assert_eq!(flushed.frame_count(), 6);
        assert_eq!(flushed.voiced_frames, 4);
        assert!(!segmenter.is_voiced());
        assert!(segmenter.flush().is_none());
    }

    #[test]
    fn test_no_silent_loss() {
        // Every voiced frame must land in exactly one emitted utterance.
        let pattern: &[(i16, usize)] = &[
            (3000, 7),
            (0, 3), // short pause, kept
            (1000, 2),
            (0, 4), // close (>= 4)
            (0, 10),
            (2500, 1),
            (0, 4),
            (4000, 12),
        ];
        let total_voiced: usize = pattern
            .iter()
            .filter(|(a, _)| *a > 500)
            .map(|(_, c)| c)
            .sum();

        let mut segmenter = SilenceSegmenter::new(test_config(4));
        let mut utterances = feed(&mut segmenter, pattern);
        if let Some(u) = segmenter.flush() {
            utterances.push(u);
        }

        let voiced_emitted: usize = utterances.iter().map(|u| u.voiced_frames).sum();
        assert_eq!(voiced_emitted, total_voiced);

        // Indexes are consecutive from 0
        for (i, u) in utterances.iter().enumerate() {
            assert_eq!(u.index, i as u64);
        }
    }

    #[test]
    fn test_start_end_offsets_match_frames() {
        let mut segmenter = SilenceSegmenter::new(test_config(2));
        let utterances = feed(&mut segmenter, &[(0, 10), (2000, 3), (0, 2)]);

        assert_eq!(utterances.len(), 1);
        let u = &utterances[0];
        // Leading silence discarded: starts at frame 10 (100ms)
        assert_eq!(u.start, Duration::from_millis(100));
        assert_eq!(u.end, Duration::from_millis(130));
        assert_eq!(u.duration(), Duration::from_millis(30));
    }
}
