//! Session lifecycle: state machine, controller, and incident reporting.

pub mod controller;
pub mod report;
pub mod state;

pub use controller::{SessionConfig, SessionController, SessionOptions};
pub use report::{CollectingReporter, LogReporter, SessionReporter, Subsystem};
pub use state::{SessionState, StateCell};
