//! Voice interaction controller
//!
//! Sequences one interview turn over audio: speak the question, record the
//! answer, transcribe it, submit it and speak the grading and next question.

mod controller;
mod speech;
mod state;

pub use controller::{VoiceConfig, VoiceEvent, VoiceSessionController};
pub use speech::{HttpSpeechService, SpeechService};
pub use state::VoiceState;
