//! Interview session data model
//!
//! This module provides the client-side view of an interview:
//! - `Session`: the active session and its round counter
//! - `SessionOptions`: parameters used to start a session
//! - `Evaluation` / `Feedback`: graded rounds and the aggregate report
//! - `Band`: the discrete tier derived from a numeric score

mod config;
mod session;
mod stats;

pub use config::{InterviewMode, SessionOptions};
pub use session::{RoundAdvance, Session};
pub use stats::{Band, Evaluation, Feedback, HistoryEntry};
