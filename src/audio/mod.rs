//! Audio capture: frame source trait, real device capture, WAV transport.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod source;
pub mod wav;

pub use source::{FramePhase, FrameSource, ScriptedFrameSource};
pub use wav::encode_wav_mono16;

#[cfg(feature = "cpal-audio")]
pub use capture::{CpalFrameSource, list_devices, suppress_audio_warnings};
