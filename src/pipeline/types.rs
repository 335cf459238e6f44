//! Data types flowing through the recording pipeline.

use std::time::Duration;

/// A fixed-size frame of raw PCM samples from the capture device.
///
/// Frames are immutable once produced. `offset` is derived from the sample
/// position in the stream (not wall-clock time), so frame timestamps are
/// exact, contiguous, and deterministic for a given input.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// PCM samples (16-bit signed integers, mono).
    pub samples: Vec<i16>,
    /// Monotonic sequence number assigned by the frame source.
    pub sequence: u64,
    /// Capture offset of the first sample, relative to session start.
    pub offset: Duration,
}

impl AudioFrame {
    /// Creates a new audio frame.
    pub fn new(samples: Vec<i16>, sequence: u64, offset: Duration) -> Self {
        Self {
            samples,
            sequence,
            offset,
        }
    }

    /// Returns the duration of this frame at the given sample rate.
    pub fn duration(&self, sample_rate: u32) -> Duration {
        sample_span(self.samples.len(), sample_rate)
    }

    /// Returns the capture offset just past the last sample of this frame.
    pub fn end_offset(&self, sample_rate: u32) -> Duration {
        self.offset + self.duration(sample_rate)
    }
}

/// Converts a sample count into a duration at the given sample rate.
pub fn sample_span(samples: usize, sample_rate: u32) -> Duration {
    Duration::from_nanos(samples as u64 * 1_000_000_000 / sample_rate.max(1) as u64)
}

/// A contiguous voiced audio span bounded by silence — the atomic unit of
/// transcription.
///
/// Created when the segmenter closes a voiced run; destroyed after dispatch.
/// `index` is the segmentation order and drives re-ordering of results that
/// complete out of order when the dispatcher pool has more than one worker.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Segmentation order, starting at 0.
    pub index: u64,
    /// The frames making up this utterance, in capture order.
    pub frames: Vec<AudioFrame>,
    /// Capture offset of the first sample.
    pub start: Duration,
    /// Capture offset just past the last sample.
    pub end: Duration,
    /// Number of frames classified as voiced.
    pub voiced_frames: usize,
    /// Number of samples in frames classified as voiced.
    pub voiced_samples: usize,
}

impl Utterance {
    /// Total duration covered by this utterance.
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }

    /// Number of frames in this utterance.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Total number of samples across all frames.
    pub fn sample_count(&self) -> usize {
        self.frames.iter().map(|f| f.samples.len()).sum()
    }

    /// Concatenates all frames into a single PCM buffer for transport.
    pub fn samples(&self) -> Vec<i16> {
        let mut merged = Vec::with_capacity(self.sample_count());
        for frame in &self.frames {
            merged.extend_from_slice(&frame.samples);
        }
        merged
    }
}
