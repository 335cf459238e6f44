//! HTTP client for a hosted transcription service.
//!
//! Speaks the Whisper-style transcription endpoint shape: multipart upload
//! of a WAV file plus a model field, JSON `{"text": ...}` response. The
//! request timeout is the per-call bound the dispatcher relies on.

use crate::defaults;
use crate::error::{MeetscribeError, Result};
use crate::stt::service::{Transcription, TranscriptionService};
use serde::Deserialize;
use std::time::Duration;

/// Configuration for the HTTP transcription client.
#[derive(Debug, Clone)]
pub struct HttpSttConfig {
    /// Endpoint URL.
    pub endpoint: String,
    /// Bearer token.
    pub api_key: String,
    /// Model name sent with each request.
    pub model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpSttConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::DEFAULT_STT_ENDPOINT.to_string(),
            api_key: String::new(),
            model: defaults::DEFAULT_STT_MODEL.to_string(),
            timeout: Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    text: String,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    speaker: Option<String>,
}

/// Transcription service backed by an HTTP endpoint.
pub struct HttpTranscriptionService {
    config: HttpSttConfig,
    client: reqwest::blocking::Client,
}

impl HttpTranscriptionService {
    /// Builds a client with the configured timeout.
    pub fn new(config: HttpSttConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MeetscribeError::Other(format!("HTTP client init failed: {e}")))?;
        Ok(Self { config, client })
    }
}

impl TranscriptionService for HttpTranscriptionService {
    fn transcribe(
        &self,
        wav: &[u8],
        _sample_rate: u32,
        language_hint: &str,
    ) -> Result<Transcription> {
        let file = reqwest::blocking::multipart::Part::bytes(wav.to_vec())
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| MeetscribeError::permanent(format!("multipart build failed: {e}")))?;

        let mut form = reqwest::blocking::multipart::Form::new()
            .text("model", self.config.model.clone())
            .part("file", file);
        if language_hint != defaults::DEFAULT_LANGUAGE {
            form = form.text("language", language_hint.to_string());
        }

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .map_err(|e| {
                // Timeouts and connection resets are worth retrying.
                if e.is_timeout() || e.is_connect() {
                    MeetscribeError::transient(e.to_string())
                } else {
                    MeetscribeError::permanent(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = format!("service returned {status}: {body}");
            return if status.as_u16() == 408
                || status.as_u16() == 429
                || status.is_server_error()
            {
                Err(MeetscribeError::transient(message))
            } else {
                Err(MeetscribeError::permanent(message))
            };
        }

        let parsed: TranscribeResponse = response
            .json()
            .map_err(|e| MeetscribeError::permanent(format!("malformed response: {e}")))?;

        Ok(Transcription {
            text: parsed.text,
            confidence: parsed.confidence.unwrap_or(1.0),
            speaker_tag: parsed.speaker,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
