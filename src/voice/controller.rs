use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info, warn};

use super::speech::SpeechService;
use super::state::VoiceState;
use crate::api::{AnswerSubmissionPipeline, SubmitOutcome};
use crate::audio::{AudioCapture, AudioCaptureDevice, AudioOutput, CaptureFormat};
use crate::error::VoiceError;
use crate::session::{Evaluation, Feedback, RoundAdvance, Session, SessionOptions};

/// Voice controller settings
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceConfig {
    /// Synthesis voice name
    pub voice: String,
    /// Speak questions and grading automatically
    pub auto_play: bool,
    pub capture: CaptureFormat,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice: "alloy".to_string(),
            auto_play: true,
            capture: CaptureFormat::default(),
        }
    }
}

/// Progress notifications from the controller
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceEvent {
    SessionStarted {
        session_id: String,
        question: String,
        round: u32,
        total_rounds: u32,
    },
    Transcribed(String),
    Graded(Evaluation),
    NextQuestion {
        question: String,
        round: u32,
        total_rounds: u32,
    },
    Completed { session_id: String },
    SessionEnded { session_id: String },
    /// Automatic playback failed after the operation itself succeeded
    PlaybackFailed(VoiceError),
}

/// Drives one voice interview
///
/// All operations are mutually exclusive: an operation started while another
/// is in progress fails with [`VoiceError::Busy`] and touches nothing. The
/// capture device is held only between `start_recording` and
/// `stop_recording`, and `stop_recording` always releases it, even when
/// transcription fails.
pub struct VoiceSessionController {
    config: VoiceConfig,
    pipeline: AnswerSubmissionPipeline,
    speech: Arc<dyn SpeechService>,
    output: Arc<dyn AudioOutput>,
    device: Mutex<Box<dyn AudioCaptureDevice>>,
    capture: Mutex<Option<AudioCapture>>,
    session: Mutex<Option<Session>>,
    pending_answer: Mutex<Option<String>>,
    state: watch::Sender<VoiceState>,
    events: mpsc::UnboundedSender<VoiceEvent>,
}

impl VoiceSessionController {
    pub fn new(
        config: VoiceConfig,
        pipeline: AnswerSubmissionPipeline,
        speech: Arc<dyn SpeechService>,
        device: Box<dyn AudioCaptureDevice>,
        output: Arc<dyn AudioOutput>,
    ) -> (Self, mpsc::UnboundedReceiver<VoiceEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(VoiceState::Idle);

        let controller = Self {
            config,
            pipeline,
            speech,
            output,
            device: Mutex::new(device),
            capture: Mutex::new(None),
            session: Mutex::new(None),
            pending_answer: Mutex::new(None),
            state,
            events,
        };

        (controller, events_rx)
    }

    pub fn state(&self) -> VoiceState {
        *self.state.borrow()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<VoiceState> {
        self.state.subscribe()
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    /// Snapshot of the current session, if one was started
    pub async fn session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    /// Transcript from the last `stop_recording`, until it is submitted
    pub async fn pending_answer(&self) -> Option<String> {
        self.pending_answer.lock().await.clone()
    }

    /// Start an interview and, with auto-play, speak the first question.
    pub async fn start_session(&self, options: &SessionOptions) -> Result<Session, VoiceError> {
        self.transition(VoiceState::Idle, VoiceState::Submitting)?;

        if self
            .session
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| !s.is_complete())
        {
            self.settle(VoiceState::Idle);
            return Err(VoiceError::SessionActive);
        }

        let session = match self.pipeline.start(options).await {
            Ok(session) => session,
            Err(e) => {
                self.settle(VoiceState::Idle);
                return Err(e.into());
            }
        };

        *self.session.lock().await = Some(session.clone());
        *self.pending_answer.lock().await = None;

        self.emit(VoiceEvent::SessionStarted {
            session_id: session.id.clone(),
            question: session.question().to_string(),
            round: session.round(),
            total_rounds: session.total_rounds(),
        });

        if self.config.auto_play
            && self
                .transition(VoiceState::Submitting, VoiceState::Speaking)
                .is_ok()
        {
            if let Err(e) = self.play(session.question()).await {
                self.playback_failed(e);
            }
        }

        self.settle(VoiceState::Idle);
        Ok(session)
    }

    /// Acquire the capture device and begin recording.
    ///
    /// On failure, including a denied permission, the controller stays idle
    /// and holds no device.
    pub async fn start_recording(&self) -> Result<(), VoiceError> {
        self.transition(VoiceState::Idle, VoiceState::Recording)?;

        let mut device = self.device.lock().await;
        match device.start(&self.config.capture).await {
            Ok(frames) => {
                *self.capture.lock().await =
                    Some(AudioCapture::begin(frames, self.config.capture.clone()));
                info!("Recording from {}", device.name());
                Ok(())
            }
            Err(e) => {
                if let Err(stop_err) = device.stop().await {
                    warn!("Failed to release {}: {}", device.name(), stop_err);
                }
                drop(device);
                self.settle(VoiceState::Idle);
                error!("Failed to start recording: {}", e);
                Err(e)
            }
        }
    }

    /// Stop recording, release the device and transcribe the answer.
    ///
    /// The transcript is kept as the pending answer for `submit_answer`.
    pub async fn stop_recording(&self) -> Result<String, VoiceError> {
        self.transition(VoiceState::Recording, VoiceState::Transcribing)?;

        {
            let mut device = self.device.lock().await;
            if let Err(e) = device.stop().await {
                warn!("Failed to release {}: {}", device.name(), e);
            }
        }

        let capture = self.capture.lock().await.take();
        let blob = match capture {
            Some(capture) => capture.finish().await,
            None => Err(VoiceError::Capture("no capture in progress".to_string())),
        };

        let transcript = match blob {
            Ok(blob) => {
                debug!("Captured {:.1}s of audio", blob.duration_secs());
                self.speech.transcribe(&blob).await
            }
            Err(e) => Err(e),
        };

        let result = match transcript {
            Ok(text) => {
                *self.pending_answer.lock().await = Some(text.clone());
                self.emit(VoiceEvent::Transcribed(text.clone()));
                Ok(text)
            }
            Err(e) => {
                error!("Failed to transcribe recording: {}", e);
                Err(e)
            }
        };

        self.settle(VoiceState::Idle);
        result
    }

    /// Synthesize and play `text`.
    pub async fn speak(&self, text: &str) -> Result<(), VoiceError> {
        self.transition(VoiceState::Idle, VoiceState::Speaking)?;
        let result = self.play(text).await;
        self.settle(VoiceState::Idle);

        if let Err(e) = &result {
            error!("Failed to speak: {}", e);
        }
        result
    }

    /// Submit `answer` for the current question and advance the session.
    ///
    /// With auto-play the grading summary and the next question are spoken
    /// before this returns; playback failures are reported as
    /// [`VoiceEvent::PlaybackFailed`] since the answer was already accepted.
    pub async fn submit_answer(&self, answer: &str) -> Result<SubmitOutcome, VoiceError> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(VoiceError::EmptyAnswer);
        }

        self.transition(VoiceState::Idle, VoiceState::Submitting)?;

        let current = self
            .session
            .lock()
            .await
            .as_ref()
            .filter(|s| !s.is_complete())
            .map(|s| (s.id.clone(), s.question().to_string()));

        let Some((session_id, question)) = current else {
            self.settle(VoiceState::Idle);
            return Err(VoiceError::NoActiveSession);
        };

        let outcome = match self.pipeline.submit(&session_id, &question, answer).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.settle(VoiceState::Idle);
                return Err(e.into());
            }
        };

        if let Some(session) = self.session.lock().await.as_mut() {
            if let Err(e) = session.advance(&outcome.advance) {
                self.settle(VoiceState::Idle);
                return Err(e.into());
            }
        }
        *self.pending_answer.lock().await = None;

        self.emit(VoiceEvent::Graded(outcome.evaluation.clone()));
        match &outcome.advance {
            RoundAdvance::Next { question, round } => self.emit(VoiceEvent::NextQuestion {
                question: question.clone(),
                round: *round,
                total_rounds: outcome.total_rounds,
            }),
            RoundAdvance::Complete => self.emit(VoiceEvent::Completed {
                session_id: session_id.clone(),
            }),
        }

        if self.config.auto_play
            && self
                .transition(VoiceState::Submitting, VoiceState::Speaking)
                .is_ok()
        {
            let mut utterances = vec![outcome.evaluation.summary()];
            if let RoundAdvance::Next { question, .. } = &outcome.advance {
                utterances.push(question.clone());
            }

            for text in &utterances {
                if let Err(e) = self.play(text).await {
                    self.playback_failed(e);
                    break;
                }
            }
        }

        self.settle(VoiceState::Idle);
        Ok(outcome)
    }

    /// Aggregated feedback for the current session
    pub async fn feedback(&self) -> Result<Feedback, VoiceError> {
        let session_id = self
            .session
            .lock()
            .await
            .as_ref()
            .map(|s| s.id.clone())
            .ok_or(VoiceError::NoActiveSession)?;

        Ok(self.pipeline.feedback(&session_id).await?)
    }

    /// Delete the current session on the server and forget it locally.
    pub async fn end_session(&self) -> Result<(), VoiceError> {
        self.transition(VoiceState::Idle, VoiceState::Submitting)?;

        let Some(session) = self.session.lock().await.take() else {
            self.settle(VoiceState::Idle);
            return Err(VoiceError::NoActiveSession);
        };
        *self.pending_answer.lock().await = None;

        let result = self.pipeline.end(&session.id).await;
        self.settle(VoiceState::Idle);
        result?;

        self.emit(VoiceEvent::SessionEnded {
            session_id: session.id,
        });
        Ok(())
    }

    /// Release the device, discard any recording and forget the session.
    ///
    /// Allowed while idle or recording; the other states belong to an
    /// operation that is still awaiting.
    pub async fn reset(&self) -> Result<(), VoiceError> {
        let mut busy = None;
        self.state.send_if_modified(|state| match *state {
            VoiceState::Idle => false,
            VoiceState::Recording => {
                *state = VoiceState::Idle;
                true
            }
            other => {
                busy = Some(other);
                false
            }
        });
        if let Some(state) = busy {
            return Err(VoiceError::Busy(state));
        }

        {
            let mut device = self.device.lock().await;
            if device.is_capturing() {
                if let Err(e) = device.stop().await {
                    warn!("Failed to release {}: {}", device.name(), e);
                }
            }
        }

        if let Some(capture) = self.capture.lock().await.take() {
            if let Ok(blob) = capture.finish().await {
                debug!("Discarded {:.1}s of recording", blob.duration_secs());
            }
        }

        *self.session.lock().await = None;
        *self.pending_answer.lock().await = None;
        info!("Voice controller reset");
        Ok(())
    }

    async fn play(&self, text: &str) -> Result<(), VoiceError> {
        let audio = self.speech.synthesize(text, &self.config.voice).await?;
        self.output.play(&audio).await
    }

    /// Move from `from` to `to`, or report what the controller is doing.
    fn transition(&self, from: VoiceState, to: VoiceState) -> Result<(), VoiceError> {
        let mut current = from;
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                current = *state;
                false
            }
        });

        if current != from {
            return Err(match (from, current) {
                (VoiceState::Recording, VoiceState::Idle) => VoiceError::NotRecording,
                (_, busy) => VoiceError::Busy(busy),
            });
        }

        debug!("Voice state {} -> {}", from, to);
        Ok(())
    }

    fn settle(&self, state: VoiceState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    fn emit(&self, event: VoiceEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    fn playback_failed(&self, e: VoiceError) {
        warn!("Automatic playback failed: {}", e);
        self.emit(VoiceEvent::PlaybackFailed(e));
    }
}
