use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::VoiceError;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since recording started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / (self.sample_rate as u64 * self.channels as u64)
    }
}

/// Format captured answers are normalized to before upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFormat {
    /// Target sample rate (will decimate if needed)
    pub sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Frame size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for CaptureFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16000,      // 16kHz for Whisper
            channels: 1,             // Mono
            buffer_duration_ms: 100, // 100ms frames
        }
    }
}

/// Microphone capture capability
///
/// Implementations own the hardware. `start` acquires it (which may require
/// user permission) and streams frames until `stop` releases it.
#[async_trait]
pub trait AudioCaptureDevice: Send + Sync {
    /// Acquire the device and start capturing.
    ///
    /// Returns a channel receiver that will receive audio frames. Fails with
    /// `VoiceError::PermissionDenied` when access is refused.
    async fn start(&mut self, format: &CaptureFormat) -> Result<mpsc::Receiver<AudioFrame>, VoiceError>;

    /// Stop capturing and release every acquired track. Must be safe to call
    /// when not capturing.
    async fn stop(&mut self) -> Result<(), VoiceError>;

    /// Check if the device is currently capturing
    fn is_capturing(&self) -> bool;

    /// Device name for logging
    fn name(&self) -> &str;
}
