// Unit tests for audio capture types
//
// These tests verify frame handling and the capture buffer.

use anyhow::Result;
use interview_practice::audio::{AudioCapture, AudioFrame, CaptureFormat};
use tokio::sync::mpsc;

fn frame(samples: Vec<i16>, sample_rate: u32, channels: u16, timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples,
        sample_rate,
        channels,
        timestamp_ms,
    }
}

#[test]
fn test_audio_frame_duration() {
    assert_eq!(frame(vec![0; 1600], 16000, 1, 0).duration_ms(), 100);
    assert_eq!(frame(vec![0; 9600], 48000, 2, 0).duration_ms(), 100);
    assert_eq!(frame(vec![0; 10], 0, 1, 0).duration_ms(), 0);
}

#[test]
fn test_capture_format_default() {
    let format = CaptureFormat::default();

    assert_eq!(format.sample_rate, 16000, "Default should be 16kHz for transcription");
    assert_eq!(format.channels, 1, "Default should be mono");
    assert_eq!(format.buffer_duration_ms, 100, "Default buffer should be 100ms");
}

#[tokio::test]
async fn test_capture_flushes_queued_frames() -> Result<()> {
    let (tx, rx) = mpsc::channel(16);
    let capture = AudioCapture::begin(rx, CaptureFormat::default());

    for i in 0..5u64 {
        tx.send(frame(vec![100; 1600], 16000, 1, i * 100)).await?;
    }

    // Still open: finish must not wait for the sender
    let blob = capture.finish().await?;
    assert_eq!(blob.sample_count, 8000);
    assert!((blob.duration_secs() - 0.5).abs() < 1e-9);
    assert_eq!(blob.file_name(), "recording.wav");
    assert_eq!(&blob.bytes[0..4], b"RIFF");

    drop(tx);
    Ok(())
}

#[tokio::test]
async fn test_capture_without_frames_is_empty_wav() -> Result<()> {
    let (tx, rx) = mpsc::channel(1);
    drop(tx);

    let blob = AudioCapture::begin(rx, CaptureFormat::default()).finish().await?;

    assert_eq!(blob.sample_count, 0);
    assert_eq!(blob.sample_rate, 16000);
    assert_eq!(blob.duration_secs(), 0.0);

    Ok(())
}
