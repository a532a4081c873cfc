use std::io::Cursor;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{AudioFrame, CaptureFormat};
use crate::error::VoiceError;

/// A finalized recording ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlob {
    /// Encoded audio (WAV, 16-bit PCM)
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// File extension used when uploading
    pub extension: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// Number of samples across all channels
    pub sample_count: usize,
}

impl AudioBlob {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.sample_count as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    pub fn file_name(&self) -> String {
        format!("recording.{}", self.extension)
    }
}

/// An in-progress recording
///
/// Frames are buffered by a background task from the moment the capture
/// begins. `finish` flushes whatever arrived, including frames still queued
/// in the channel, and encodes them into a single blob.
pub struct AudioCapture {
    format: CaptureFormat,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<Vec<AudioFrame>>,
}

impl AudioCapture {
    pub fn begin(mut frames: mpsc::Receiver<AudioFrame>, format: CaptureFormat) -> Self {
        let (stop, mut stop_rx) = oneshot::channel::<()>();
        let target = format.clone();

        let task = tokio::spawn(async move {
            let mut buffered = Vec::new();

            loop {
                tokio::select! {
                    biased;
                    frame = frames.recv() => match frame {
                        Some(frame) => buffered.push(normalize_frame(frame, &target)),
                        None => break,
                    },
                    _ = &mut stop_rx => {
                        while let Ok(frame) = frames.try_recv() {
                            buffered.push(normalize_frame(frame, &target));
                        }
                        break;
                    }
                }
            }

            buffered
        });

        Self {
            format,
            stop: Some(stop),
            task,
        }
    }

    /// Stop buffering and encode everything captured so far.
    pub async fn finish(mut self) -> Result<AudioBlob, VoiceError> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }

        let frames = (&mut self.task)
            .await
            .map_err(|e| VoiceError::Capture(format!("capture task failed: {}", e)))?;

        let blob = encode_wav(&frames, &self.format)?;
        info!(
            "Captured {} frames ({:.1}s, {} bytes)",
            frames.len(),
            blob.duration_secs(),
            blob.bytes.len()
        );

        Ok(blob)
    }
}

/// Encode frames as a 16-bit PCM WAV blob.
///
/// Frames that could not be normalized to the format of the first frame are
/// skipped.
pub fn encode_wav(frames: &[AudioFrame], format: &CaptureFormat) -> Result<AudioBlob, VoiceError> {
    let (sample_rate, channels) = frames
        .first()
        .map(|f| (f.sample_rate, f.channels))
        .unwrap_or((format.sample_rate, format.channels));

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut sample_count = 0;
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| VoiceError::Capture(format!("failed to create WAV encoder: {}", e)))?;

        for frame in frames {
            if frame.sample_rate != sample_rate || frame.channels != channels {
                warn!(
                    "Skipping frame at {}ms: {}Hz/{}ch does not match {}Hz/{}ch",
                    frame.timestamp_ms, frame.sample_rate, frame.channels, sample_rate, channels
                );
                continue;
            }
            for &sample in &frame.samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| VoiceError::Capture(format!("failed to write sample: {}", e)))?;
            }
            sample_count += frame.samples.len();
        }

        writer
            .finalize()
            .map_err(|e| VoiceError::Capture(format!("failed to finalize WAV: {}", e)))?;
    }

    Ok(AudioBlob {
        bytes: cursor.into_inner(),
        mime_type: "audio/wav".to_string(),
        extension: "wav".to_string(),
        sample_rate,
        channels,
        sample_count,
    })
}

/// Downsample and downmix a frame towards the target format.
pub fn normalize_frame(frame: AudioFrame, target: &CaptureFormat) -> AudioFrame {
    let mut processed = frame;

    if processed.sample_rate != target.sample_rate {
        processed = downsample_frame(processed, target.sample_rate);
    }

    if processed.channels != target.channels && target.channels == 1 {
        processed = stereo_to_mono(processed);
    }

    processed
}

/// Downsample by decimation. Only integer ratios are supported; anything
/// else (including upsampling) is returned unchanged.
fn downsample_frame(frame: AudioFrame, target_rate: u32) -> AudioFrame {
    if target_rate == 0 || frame.sample_rate <= target_rate || frame.sample_rate % target_rate != 0 {
        return frame;
    }

    let ratio = (frame.sample_rate / target_rate) as usize;
    let channels = frame.channels.max(1) as usize;

    // Keep whole interleaved groups so channels stay aligned
    let samples: Vec<i16> = frame
        .samples
        .chunks_exact(channels)
        .step_by(ratio)
        .flatten()
        .copied()
        .collect();

    AudioFrame {
        samples,
        sample_rate: target_rate,
        ..frame
    }
}

/// Average left and right channels
fn stereo_to_mono(frame: AudioFrame) -> AudioFrame {
    if frame.channels != 2 {
        return frame;
    }

    let samples = frame
        .samples
        .chunks_exact(2)
        .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
        .collect();

    AudioFrame {
        samples,
        channels: 1,
        ..frame
    }
}
