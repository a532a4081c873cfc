use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::api::messages::{SynthesizeRequest, TranscribeResponse};
use crate::api::{HttpClient, HttpRequest};
use crate::audio::AudioBlob;
use crate::error::VoiceError;

/// Speech-to-text and text-to-speech services
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Transcribe a recorded answer.
    async fn transcribe(&self, audio: &AudioBlob) -> Result<String, VoiceError>;

    /// Synthesize `text` with the named voice, returning encoded audio.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, VoiceError>;
}

/// Speech services exposed by the interview server under `/api/speech`
#[derive(Clone)]
pub struct HttpSpeechService {
    http: Arc<dyn HttpClient>,
}

impl HttpSpeechService {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SpeechService for HttpSpeechService {
    async fn transcribe(&self, audio: &AudioBlob) -> Result<String, VoiceError> {
        let request = HttpRequest::post_file(
            "/api/speech/transcribe",
            audio.file_name(),
            audio.mime_type.clone(),
            audio.bytes.clone(),
        );

        let response = self
            .http
            .send(request)
            .await
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;

        if !response.is_success() {
            let detail = response.failure("Failed to transcribe audio");
            error!("Transcription failed (HTTP {}): {}", response.status, detail);
            return Err(VoiceError::Transcription(detail));
        }

        let body: TranscribeResponse = response
            .json()
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;

        debug!("Transcribed {:.1}s of audio", audio.duration_secs());
        Ok(body.text.trim().to_string())
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, VoiceError> {
        let request = HttpRequest::post_json(
            "/api/speech/synthesize",
            &SynthesizeRequest {
                text: text.to_string(),
                voice: voice.to_string(),
            },
        )
        .map_err(|e| VoiceError::Synthesis(e.to_string()))?;

        let response = self
            .http
            .send(request)
            .await
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;

        if !response.is_success() {
            let detail = response.failure("Failed to synthesize speech");
            error!("Synthesis failed (HTTP {}): {}", response.status, detail);
            return Err(VoiceError::Synthesis(detail));
        }

        if response.body.is_empty() {
            return Err(VoiceError::Synthesis("server returned no audio".to_string()));
        }

        Ok(response.body)
    }
}
