//! Configuration loading and validation.

use crate::defaults;
use crate::error::{MeetscribeError, Result};
use crate::pipeline::dispatcher::DispatcherConfig;
use crate::segment::SegmenterConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub segmentation: SegmentationConfig,
    pub dispatch: DispatchConfig,
    pub stt: SttConfig,
    pub summary: SummaryConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub frame_size: usize,
}

/// Silence segmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmentationConfig {
    pub silence_threshold: f32,
    pub silence_duration_secs: f32,
}

/// Dispatcher and queue configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    pub pool_size: usize,
    pub queue_capacity: usize,
    pub retry_limit: u32,
    pub retry_backoff_ms: u64,
}

/// Transcription service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    pub endpoint: String,
    pub model: String,
    pub language: String,
    pub request_timeout_secs: u64,
}

/// Summarization service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SummaryConfig {
    pub endpoint: String,
    pub model: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            frame_size: defaults::FRAME_SIZE,
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            silence_threshold: defaults::SILENCE_THRESHOLD,
            silence_duration_secs: defaults::SILENCE_DURATION_SECS,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pool_size: defaults::DISPATCHER_POOL_SIZE,
            queue_capacity: defaults::QUEUE_CAPACITY,
            retry_limit: defaults::TRANSCRIPTION_RETRY_LIMIT,
            retry_backoff_ms: defaults::RETRY_BACKOFF_MS,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::DEFAULT_STT_ENDPOINT.to_string(),
            model: defaults::DEFAULT_STT_MODEL.to_string(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::DEFAULT_SUMMARY_ENDPOINT.to_string(),
            model: defaults::DEFAULT_SUMMARY_MODEL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MeetscribeError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                MeetscribeError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file, or defaults if the file doesn't exist.
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(MeetscribeError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - MEETSCRIBE_LANGUAGE → stt.language
    /// - MEETSCRIBE_AUDIO_DEVICE → audio.device
    /// - MEETSCRIBE_STT_ENDPOINT → stt.endpoint
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(language) = std::env::var("MEETSCRIBE_LANGUAGE")
            && !language.is_empty()
        {
            self.stt.language = language;
        }

        if let Ok(device) = std::env::var("MEETSCRIBE_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        if let Ok(endpoint) = std::env::var("MEETSCRIBE_STT_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.stt.endpoint = endpoint;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/meetscribe/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join("meetscribe").join("config.toml"))
    }

    /// Rejects configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        fn invalid(key: &str, message: &str) -> MeetscribeError {
            MeetscribeError::ConfigInvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            }
        }

        if self.audio.sample_rate == 0 {
            return Err(invalid("audio.sample_rate", "must be positive"));
        }
        if self.audio.frame_size == 0 {
            return Err(invalid("audio.frame_size", "must be positive"));
        }
        if self.segmentation.silence_duration_secs <= 0.0 {
            return Err(invalid("segmentation.silence_duration_secs", "must be positive"));
        }
        if self.segmentation.silence_threshold < 0.0 {
            return Err(invalid("segmentation.silence_threshold", "must not be negative"));
        }
        if self.dispatch.pool_size == 0 {
            return Err(invalid("dispatch.pool_size", "must be at least 1"));
        }
        if self.dispatch.queue_capacity == 0 {
            return Err(invalid("dispatch.queue_capacity", "must be at least 1"));
        }
        Ok(())
    }

    /// Segmenter view of this configuration.
    pub fn segmenter(&self) -> SegmenterConfig {
        SegmenterConfig {
            silence_threshold: self.segmentation.silence_threshold,
            silence_duration_secs: self.segmentation.silence_duration_secs,
            sample_rate: self.audio.sample_rate,
            frame_size: self.audio.frame_size,
        }
    }

    /// Dispatcher view of this configuration.
    pub fn dispatcher(&self) -> DispatcherConfig {
        DispatcherConfig {
            pool_size: self.dispatch.pool_size,
            retry_limit: self.dispatch.retry_limit,
            retry_backoff: Duration::from_millis(self.dispatch.retry_backoff_ms),
            sample_rate: self.audio.sample_rate,
            language_hint: self.stt.language.clone(),
        }
    }
}
