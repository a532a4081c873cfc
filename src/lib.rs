pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod session;
pub mod transport;
pub mod voice;

pub use api::{
    AnswerSubmissionPipeline, ApiConfig, CvProfile, HttpClient, JobRequirements, ReqwestHttpClient,
    SubmitOutcome,
};
pub use audio::{
    AudioBlob, AudioCapture, AudioCaptureDevice, AudioFile, AudioFrame, AudioOutput, CaptureFormat,
    FileAudioOutput, FileCaptureDevice,
};
pub use config::Config;
pub use error::{ApiError, SocketError, VoiceError};
pub use session::{
    Band, Evaluation, Feedback, HistoryEntry, InterviewMode, RoundAdvance, Session, SessionOptions,
};
pub use transport::{Message, MessageType, SessionSocket, SocketConfig, SocketEvent, SocketState};
pub use voice::{
    HttpSpeechService, SpeechService, VoiceConfig, VoiceEvent, VoiceSessionController, VoiceState,
};
