//! HTTP client for a chat-completion summarization service.

use crate::defaults;
use crate::error::{MeetscribeError, Result};
use crate::summary::SummarizationService;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the HTTP summarization client.
#[derive(Debug, Clone)]
pub struct HttpSummaryConfig {
    /// Endpoint URL.
    pub endpoint: String,
    /// Bearer token.
    pub api_key: String,
    /// Model name sent with each request.
    pub model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpSummaryConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::DEFAULT_SUMMARY_ENDPOINT.to_string(),
            api_key: String::new(),
            model: defaults::DEFAULT_SUMMARY_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Summarization service backed by a chat-completion endpoint.
pub struct HttpSummarizer {
    config: HttpSummaryConfig,
    client: reqwest::blocking::Client,
}

impl HttpSummarizer {
    /// Builds a client with the configured timeout.
    pub fn new(config: HttpSummaryConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MeetscribeError::Other(format!("HTTP client init failed: {e}")))?;
        Ok(Self { config, client })
    }

    fn prompt(transcript: &str, meeting_title: &str, participants: &[String]) -> String {
        let participant_list = if participants.is_empty() {
            "not provided".to_string()
        } else {
            participants.join(", ")
        };
        format!(
            "Create a comprehensive summary of the following meeting transcript.\n\
             \n\
             Meeting title: {meeting_title}\n\
             Participants: {participant_list}\n\
             \n\
             Transcript:\n\
             \n\
             {transcript}\n\
             \n\
             Include: main topics discussed, key decisions, action items with\n\
             assignees if mentioned, and unresolved questions."
        )
    }
}

impl SummarizationService for HttpSummarizer {
    fn summarize(
        &self,
        transcript: &str,
        meeting_title: &str,
        participants: &[String],
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a professional meeting summarizer that creates concise, \
                              accurate, and well-structured summaries."
                        .to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::prompt(transcript, meeting_title, participants),
                },
            ],
            temperature: 0.3,
            max_tokens: 1500,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .map_err(|e| MeetscribeError::Summarization {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(MeetscribeError::Summarization {
                message: format!("service returned {status}: {body}"),
            });
        }

        let parsed: ChatResponse = response.json().map_err(|e| MeetscribeError::Summarization {
            message: format!("malformed response: {e}"),
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| MeetscribeError::Summarization {
                message: "empty response".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_title_and_participants() {
        let prompt = HttpSummarizer::prompt(
            "A: hello",
            "Planning",
            &["Ana".to_string(), "Ben".to_string()],
        );
        assert!(prompt.contains("Meeting title: Planning"));
        assert!(prompt.contains("Participants: Ana, Ben"));
        assert!(prompt.contains("A: hello"));
    }

    #[test]
    fn test_prompt_without_participants() {
        let prompt = HttpSummarizer::prompt("text", "Title", &[]);
        assert!(prompt.contains("Participants: not provided"));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"choices":[{"message":{"content":"the summary"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content, "the summary");
    }
}
