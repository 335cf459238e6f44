//! Incident reporting for pipeline stages.
//!
//! Contained failures (a retried call, a failed utterance) are reported and
//! recorded, not propagated; fatal failures abort the session. The reporter
//! seam keeps the pipeline testable without scraping stderr.

use crate::error::MeetscribeError;
use parking_lot::Mutex;
use std::fmt;

/// Which part of the pipeline an incident came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    /// Frame source + segmenter stage.
    Capture,
    /// Dispatcher workers and the transcription service.
    Dispatch,
    /// Attribution + store commit path.
    Commit,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Subsystem::Capture => "capture",
            Subsystem::Dispatch => "dispatch",
            Subsystem::Commit => "commit",
        };
        write!(f, "{name}")
    }
}

/// Trait for reporting session incidents.
pub trait SessionReporter: Send + Sync {
    /// A contained incident: processing continues.
    fn incident(&self, subsystem: Subsystem, message: &str);

    /// A fatal error: the session is aborting.
    fn fatal(&self, subsystem: Subsystem, error: &MeetscribeError) {
        self.incident(subsystem, &format!("fatal: {error}"));
    }
}

/// Default reporter that logs to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl SessionReporter for LogReporter {
    fn incident(&self, subsystem: Subsystem, message: &str) {
        eprintln!("meetscribe: [{subsystem}] {message}");
    }
}

/// Reporter that collects incidents, for tests.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    incidents: Mutex<Vec<(Subsystem, String)>>,
}

impl CollectingReporter {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// All incidents reported so far.
    pub fn incidents(&self) -> Vec<(Subsystem, String)> {
        self.incidents.lock().clone()
    }

    /// Incidents from one subsystem.
    pub fn from_subsystem(&self, subsystem: Subsystem) -> Vec<String> {
        self.incidents
            .lock()
            .iter()
            .filter(|(s, _)| *s == subsystem)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl SessionReporter for CollectingReporter {
    fn incident(&self, subsystem: Subsystem, message: &str) {
        self.incidents.lock().push((subsystem, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsystem_display() {
        assert_eq!(Subsystem::Capture.to_string(), "capture");
        assert_eq!(Subsystem::Dispatch.to_string(), "dispatch");
        assert_eq!(Subsystem::Commit.to_string(), "commit");
    }

    #[test]
    fn test_collecting_reporter_records_in_order() {
        let reporter = CollectingReporter::new();
        reporter.incident(Subsystem::Dispatch, "retry 1");
        reporter.incident(Subsystem::Capture, "device hiccup");
        reporter.incident(Subsystem::Dispatch, "retry 2");

        assert_eq!(reporter.incidents().len(), 3);
        assert_eq!(
            reporter.from_subsystem(Subsystem::Dispatch),
            vec!["retry 1", "retry 2"]
        );
    }

    #[test]
    fn test_fatal_goes_through_incident_by_default() {
        let reporter = CollectingReporter::new();
        reporter.fatal(
            Subsystem::Capture,
            &MeetscribeError::Capture {
                message: "gap".to_string(),
            },
        );

        let incidents = reporter.from_subsystem(Subsystem::Capture);
        assert_eq!(incidents.len(), 1);
        assert!(incidents[0].contains("fatal"));
        assert!(incidents[0].contains("gap"));
    }

    #[test]
    fn test_log_reporter_does_not_panic() {
        LogReporter.incident(Subsystem::Commit, "test incident");
    }
}
