use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::{info, warn};

use super::file::AudioFile;
use crate::error::VoiceError;

/// Audio output sink
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Play encoded audio, resolving once playback has ended.
    async fn play(&self, audio: &[u8]) -> Result<(), VoiceError>;
}

/// Writes each utterance to `speech-NNN.wav` in a directory
pub struct FileAudioOutput {
    dir: PathBuf,
    counter: AtomicUsize,
}

impl FileAudioOutput {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            counter: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AudioOutput for FileAudioOutput {
    async fn play(&self, audio: &[u8]) -> Result<(), VoiceError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| VoiceError::Playback(format!("{}: {}", self.dir.display(), e)))?;

        let index = self.counter.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("speech-{:03}.wav", index));

        tokio::fs::write(&path, audio)
            .await
            .map_err(|e| VoiceError::Playback(format!("{}: {}", path.display(), e)))?;

        match AudioFile::from_bytes(audio) {
            Ok(decoded) => info!(
                "Played {:.1}s of speech -> {}",
                decoded.duration_seconds,
                path.display()
            ),
            Err(e) => warn!("Wrote {} (not decodable as WAV: {:#})", path.display(), e),
        }

        Ok(())
    }
}
