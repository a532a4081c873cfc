use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use hound::WavReader;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::backend::{AudioCaptureDevice, AudioFrame, CaptureFormat};
use crate::error::VoiceError;

/// A decoded WAV file
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;
        Self::decode(reader, path.display().to_string())
    }

    /// Decode WAV bytes held in memory, e.g. synthesized speech.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let reader = WavReader::new(Cursor::new(bytes)).context("Failed to parse WAV data")?;
        Self::decode(reader, "<memory>".to_string())
    }

    fn decode<R: std::io::Read>(reader: WavReader<R>, path: String) -> Result<Self> {
        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = if spec.sample_rate == 0 || spec.channels == 0 {
            0.0
        } else {
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64)
        };

        Ok(Self {
            path,
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Split into frames of `frame_ms` milliseconds.
    pub fn frames(&self, frame_ms: u64) -> Vec<AudioFrame> {
        let per_frame = (self.sample_rate as u64 * self.channels as u64 * frame_ms.max(1) / 1000)
            .max(self.channels as u64) as usize;

        self.samples
            .chunks(per_frame)
            .enumerate()
            .map(|(i, chunk)| AudioFrame {
                samples: chunk.to_vec(),
                sample_rate: self.sample_rate,
                channels: self.channels,
                timestamp_ms: i as u64 * frame_ms,
            })
            .collect()
    }
}

/// Capture device that plays back WAV files as if spoken into a microphone
///
/// Each recording consumes the next file in order, wrapping around at the end.
/// `stop` waits until the whole file has been delivered.
pub struct FileCaptureDevice {
    paths: Vec<PathBuf>,
    next: usize,
    producer: Option<JoinHandle<()>>,
}

impl FileCaptureDevice {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            next: 0,
            producer: None,
        }
    }
}

#[async_trait]
impl AudioCaptureDevice for FileCaptureDevice {
    async fn start(&mut self, format: &CaptureFormat) -> Result<mpsc::Receiver<AudioFrame>, VoiceError> {
        if self.producer.is_some() {
            return Err(VoiceError::Capture("already capturing".to_string()));
        }
        if self.paths.is_empty() {
            return Err(VoiceError::Capture("no answer recordings configured".to_string()));
        }

        let path = self.paths[self.next % self.paths.len()].clone();
        self.next += 1;

        let audio = AudioFile::open(&path).map_err(|e| VoiceError::Capture(format!("{:#}", e)))?;
        let frames = audio.frames(format.buffer_duration_ms);
        info!(
            "Replaying {} as microphone input ({:.1}s, {} frames)",
            path.display(),
            audio.duration_seconds,
            frames.len()
        );

        let (tx, rx) = mpsc::channel(64);
        self.producer = Some(tokio::spawn(async move {
            for frame in frames {
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), VoiceError> {
        // A replayed answer is always delivered in full
        if let Some(producer) = self.producer.take() {
            producer
                .await
                .map_err(|e| VoiceError::Capture(format!("replay task failed: {}", e)))?;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.producer.is_some()
    }

    fn name(&self) -> &str {
        "WAV file replay"
    }
}
