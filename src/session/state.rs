//! Session lifecycle state machine.

use crate::error::{MeetscribeError, Result};
use parking_lot::RwLock;
use std::fmt;

/// Lifecycle of a recording session.
///
/// `Stopped` is terminal; a new session requires a fresh controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No threads running.
    Idle,
    /// Capturing, segmenting, and transcribing.
    Recording,
    /// New input rejected; in-flight work allowed to complete.
    Draining,
    /// Terminal.
    Stopped,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "Idle",
            SessionState::Recording => "Recording",
            SessionState::Draining => "Draining",
            SessionState::Stopped => "Stopped",
        };
        write!(f, "{name}")
    }
}

/// Shared state cell with validated transitions.
///
/// All transitions go through one synchronization point; other components
/// observe the state but never set it directly.
#[derive(Debug, Default)]
pub struct StateCell {
    state: RwLock<SessionState>,
}

impl StateCell {
    /// Creates a cell in `Idle`.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SessionState::Idle),
        }
    }

    /// The current state.
    pub fn current(&self) -> SessionState {
        *self.state.read()
    }

    /// Performs a validated transition.
    pub fn transition(&self, to: SessionState) -> Result<()> {
        let mut state = self.state.write();
        let from = *state;

        let valid = matches!(
            (from, to),
            (SessionState::Idle, SessionState::Recording)
                | (SessionState::Recording, SessionState::Draining)
                | (SessionState::Draining, SessionState::Stopped)
                | (SessionState::Idle, SessionState::Stopped)
                | (SessionState::Recording, SessionState::Stopped)
        );

        if !valid {
            return Err(MeetscribeError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        *state = to;
        Ok(())
    }

    /// Unconditional transition to `Stopped` (force stop, from any state).
    /// Returns the previous state.
    pub fn force_stop(&self) -> SessionState {
        let mut state = self.state.write();
        let previous = *state;
        *state = SessionState::Stopped;
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_lifecycle() {
        let cell = StateCell::new();
        assert_eq!(cell.current(), SessionState::Idle);

        cell.transition(SessionState::Recording).unwrap();
        cell.transition(SessionState::Draining).unwrap();
        cell.transition(SessionState::Stopped).unwrap();
        assert_eq!(cell.current(), SessionState::Stopped);
    }

    #[test]
    fn test_force_stop_edge_from_recording() {
        let cell = StateCell::new();
        cell.transition(SessionState::Recording).unwrap();
        cell.transition(SessionState::Stopped).unwrap();
        assert_eq!(cell.current(), SessionState::Stopped);
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let cell = StateCell::new();

        let err = cell.transition(SessionState::Draining).unwrap_err();
        assert!(matches!(err, MeetscribeError::InvalidTransition { .. }));

        cell.transition(SessionState::Recording).unwrap();
        assert!(cell.transition(SessionState::Recording).is_err());

        cell.transition(SessionState::Draining).unwrap();
        assert!(cell.transition(SessionState::Recording).is_err());
    }

    #[test]
    fn test_stopped_is_terminal() {
        let cell = StateCell::new();
        cell.transition(SessionState::Stopped).unwrap();
        assert!(cell.transition(SessionState::Recording).is_err());
        assert!(cell.transition(SessionState::Draining).is_err());
    }

    #[test]
    fn test_force_stop_from_any_state() {
        let cell = StateCell::new();
        assert_eq!(cell.force_stop(), SessionState::Idle);
        assert_eq!(cell.current(), SessionState::Stopped);

        // Idempotent from Stopped
        assert_eq!(cell.force_stop(), SessionState::Stopped);

        let cell = StateCell::new();
        cell.transition(SessionState::Recording).unwrap();
        cell.transition(SessionState::Draining).unwrap();
        assert_eq!(cell.force_stop(), SessionState::Draining);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(SessionState::Idle.to_string(), "Idle");
        assert_eq!(SessionState::Recording.to_string(), "Recording");
        assert_eq!(SessionState::Draining.to_string(), "Draining");
        assert_eq!(SessionState::Stopped.to_string(), "Stopped");
    }
}
