//! Error types surfaced by the interview client.

use thiserror::Error;

use crate::voice::VoiceState;

/// Errors from the stateless REST operations.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("failed to start interview: {0}")]
    Start(String),
    #[error("failed to submit answer: {0}")]
    Submission(String),
    #[error("feedback not available: {0}")]
    NotFound(String),
    #[error("failed to end interview: {0}")]
    End(String),
    #[error("failed to get history: {0}")]
    History(String),
    #[error("failed to upload CV: {0}")]
    CvUpload(String),
    #[error("failed to parse job description: {0}")]
    JdParse(String),
    #[error("request failed: {0}")]
    Connection(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// Errors from the realtime session socket.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum SocketError {
    #[error("websocket connection error: {0}")]
    Connection(String),
    #[error("websocket not connected")]
    NotConnected,
    #[error("websocket closed after {attempts} reconnect attempts")]
    ReconnectExhausted { attempts: u32 },
}

/// Errors from the voice interaction controller and its collaborators.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum VoiceError {
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),
    #[error("audio capture failed: {0}")]
    Capture(String),
    #[error("transcription failed: {0}")]
    Transcription(String),
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
    #[error("audio playback failed: {0}")]
    Playback(String),
    #[error("controller is busy ({0})")]
    Busy(VoiceState),
    #[error("not recording")]
    NotRecording,
    #[error("answer is empty")]
    EmptyAnswer,
    #[error("no active interview session")]
    NoActiveSession,
    #[error("an interview session is already active")]
    SessionActive,
    #[error(transparent)]
    Api(#[from] ApiError),
}
