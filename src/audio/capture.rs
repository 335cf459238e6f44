//! Real audio capture using CPAL (Cross-Platform Audio Library).

use crate::audio::source::{FrameSource, offset_of};
use crate::error::{MeetscribeError, Result};
use crate::pipeline::types::AudioFrame;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing to users.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2 (stderr).
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Preferred device names for GNOME/PipeWire environments.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Device name patterns to filter out (not useful for voice input).
const FILTERED_PATTERNS: &[&str] = &["surround", "front:", "rear:", "HDMI", "S/PDIF"];

fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

/// List all available audio input devices, preferred devices marked
/// with "\[recommended\]".
///
/// # Errors
/// Returns `MeetscribeError::Capture` if device enumeration fails.
pub fn list_devices() -> Result<Vec<String>> {
    let (host, devices) = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices();
        (host, devices)
    });
    let _ = host; // keep host alive while iterating devices
    let devices = devices.map_err(|e| MeetscribeError::Capture {
        message: format!("Failed to enumerate input devices: {e}"),
    })?;

    let mut device_names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            if should_filter_device(&name) {
                continue;
            }
            if is_preferred_device(&name) {
                device_names.push(format!("{name} [recommended]"));
            } else {
                device_names.push(name);
            }
        }
    }

    Ok(device_names)
}

/// Get the best default input device, preferring PipeWire/PulseAudio so the
/// desktop's device selection is respected.
fn get_best_default_device() -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Ok(devices) = host.input_devices() {
            for device in devices {
                if let Ok(name) = device.name()
                    && is_preferred_device(&name)
                {
                    return Ok(device);
                }
            }
        }

        host.default_input_device()
            .ok_or_else(|| MeetscribeError::AudioDeviceNotFound {
                device: "default".to_string(),
            })
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: The stream is only accessed from one thread at a time — it is
/// created in `start()` and dropped in `stop()`, both called by the owner of
/// the frame source. The stream methods themselves are called synchronously.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Frame source backed by a CPAL input stream.
///
/// Captures 16-bit PCM at 16kHz mono and assembles fixed-size frames with
/// monotonic sequence numbers and sample-derived offsets. The callback
/// accumulates samples into a bounded buffer; if the pipeline stalls long
/// enough to overflow it, the stream has a gap and the next `next_frame`
/// call fails fatally.
pub struct CpalFrameSource {
    device: cpal::Device,
    stream: Option<SendableStream>,
    buffer: Arc<Mutex<Vec<i16>>>,
    overrun: Arc<AtomicBool>,
    frame_size: usize,
    sample_rate: u32,
    sequence: u64,
    samples_emitted: u64,
}

/// Maximum samples buffered before an overrun is declared (30 seconds).
fn overrun_limit(sample_rate: u32) -> usize {
    sample_rate as usize * 30
}

impl CpalFrameSource {
    /// Create a new CPAL frame source.
    ///
    /// # Arguments
    /// * `device_name` - Optional device name. If None, uses the best default.
    /// * `sample_rate` - Capture rate in Hz (the service expects 16kHz).
    /// * `frame_size` - Samples per emitted frame.
    pub fn new(device_name: Option<&str>, sample_rate: u32, frame_size: usize) -> Result<Self> {
        let device = with_suppressed_stderr(|| {
            let host = cpal::default_host();

            if let Some(name) = device_name {
                let devices = host.input_devices().map_err(|e| MeetscribeError::Capture {
                    message: format!("Failed to enumerate devices: {e}"),
                })?;

                for dev in devices {
                    if let Ok(dev_name) = dev.name()
                        && dev_name == name
                    {
                        return Ok(dev);
                    }
                }

                Err(MeetscribeError::AudioDeviceNotFound {
                    device: name.to_string(),
                })
            } else {
                get_best_default_device()
            }
        })?;

        Ok(Self {
            device,
            stream: None,
            buffer: Arc::new(Mutex::new(Vec::new())),
            overrun: Arc::new(AtomicBool::new(false)),
            frame_size,
            sample_rate,
            sequence: 0,
            samples_emitted: 0,
        })
    }

    /// Build the input stream, trying i16 then f32 at the requested config.
    ///
    /// PipeWire/PulseAudio convert transparently to the requested rate; raw
    /// ALSA devices that cannot do 16kHz mono are reported as unsupported.
    fn build_stream(&self) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: self.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            eprintln!("meetscribe: audio stream error: {err}");
        };

        let limit = overrun_limit(self.sample_rate);

        let buffer = Arc::clone(&self.buffer);
        let overrun = Arc::clone(&self.overrun);
        if let Ok(stream) = self.device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    if buf.len() + data.len() > limit {
                        overrun.store(true, Ordering::SeqCst);
                    } else {
                        buf.extend_from_slice(data);
                    }
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        let buffer = Arc::clone(&self.buffer);
        let overrun = Arc::clone(&self.overrun);
        self.device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        if buf.len() + data.len() > limit {
                            overrun.store(true, Ordering::SeqCst);
                        } else {
                            buf.extend(
                                data.iter()
                                    .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
                            );
                        }
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| MeetscribeError::Capture {
                message: format!(
                    "Device does not support {}Hz mono capture: {e}",
                    self.sample_rate
                ),
            })
    }
}

impl FrameSource for CpalFrameSource {
    fn start(&mut self) -> Result<()> {
        let stream = self.build_stream()?;
        stream.play().map_err(|e| MeetscribeError::Capture {
            message: format!("Failed to start audio stream: {e}"),
        })?;
        self.stream = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stream = None;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<AudioFrame>> {
        if self.overrun.load(Ordering::SeqCst) {
            return Err(MeetscribeError::Capture {
                message: "capture buffer overrun — frame stream has a gap".to_string(),
            });
        }

        let mut buf = self.buffer.lock().map_err(|_| MeetscribeError::Capture {
            message: "capture buffer lock poisoned".to_string(),
        })?;

        if buf.len() < self.frame_size {
            return Ok(None);
        }

        let samples: Vec<i16> = buf.drain(..self.frame_size).collect();
        drop(buf);

        let offset = offset_of(self.samples_emitted, self.sample_rate);
        let frame = AudioFrame::new(samples, self.sequence, offset);
        self.sequence += 1;
        self.samples_emitted += self.frame_size as u64;

        Ok(Some(frame))
    }
}

/// Suppress noisy JACK/ALSA messages that occur during audio backend probing.
///
/// # Safety
/// Modifies environment variables; call before spawning threads.
pub fn suppress_audio_warnings() {
    // SAFETY: Called at startup before any threads are spawned
    unsafe {
        std::env::set_var("JACK_NO_START_SERVER", "1");
        std::env::set_var("ALSA_DEBUG", "0");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_filtering() {
        assert!(should_filter_device("HDA Intel HDMI"));
        assert!(should_filter_device("surround51:CARD=PCH"));
        assert!(!should_filter_device("pipewire"));
    }

    #[test]
    fn test_preferred_devices() {
        assert!(is_preferred_device("pipewire"));
        assert!(is_preferred_device("PulseAudio sound server"));
        assert!(!is_preferred_device("hw:CARD=PCH,DEV=0"));
    }

    #[test]
    fn test_overrun_limit_scales_with_rate() {
        assert_eq!(overrun_limit(16_000), 480_000);
    }

    // Building a real stream requires audio hardware; covered by the
    // `devices` CLI command rather than unit tests.
}
