//! Utterance segmentation by silence detection.

pub mod segmenter;

pub use segmenter::{SegmenterConfig, SilenceSegmenter, mean_abs_level};
