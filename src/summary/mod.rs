//! Summarization service seam.
//!
//! Summarization consumes the finished transcript; its failures never affect
//! transcript integrity — the transcript persists regardless.

#[cfg(feature = "remote")]
pub mod remote;

use crate::error::Result;

/// Trait for the external summarization service.
pub trait SummarizationService: Send + Sync {
    /// Produces a prose summary of the full transcript.
    ///
    /// # Arguments
    /// * `transcript` - Speaker-labeled transcript text
    /// * `meeting_title` - Title supplied at session start
    /// * `participants` - Participant names, possibly empty
    fn summarize(
        &self,
        transcript: &str,
        meeting_title: &str,
        participants: &[String],
    ) -> Result<String>;
}

/// Mock summarizer for tests.
pub struct MockSummarizer {
    response: String,
    should_fail: bool,
}

impl MockSummarizer {
    /// Creates a mock returning a fixed summary.
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
        }
    }

    /// Configure the mock to fail.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl SummarizationService for MockSummarizer {
    fn summarize(
        &self,
        _transcript: &str,
        _meeting_title: &str,
        _participants: &[String],
    ) -> Result<String> {
        if self.should_fail {
            Err(crate::error::MeetscribeError::Summarization {
                message: "mock summarization failure".to_string(),
            })
        } else {
            Ok(self.response.clone())
        }
    }
}

#[cfg(feature = "remote")]
pub use remote::{HttpSummarizer, HttpSummaryConfig};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_summarizer_returns_response() {
        let summarizer = MockSummarizer::new("three decisions were made");
        let summary = summarizer
            .summarize("A: hello", "Standup", &["A".to_string()])
            .unwrap();
        assert_eq!(summary, "three decisions were made");
    }

    #[test]
    fn test_mock_summarizer_failure() {
        let summarizer = MockSummarizer::new("unused").with_failure();
        let err = summarizer.summarize("text", "title", &[]).unwrap_err();
        assert!(err.to_string().contains("Summarization failed"));
    }
}
