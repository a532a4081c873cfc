pub mod backend;
pub mod capture;
pub mod file;
pub mod output;

pub use backend::{AudioCaptureDevice, AudioFrame, CaptureFormat};
pub use capture::{AudioBlob, AudioCapture};
pub use file::{AudioFile, FileCaptureDevice};
pub use output::{AudioOutput, FileAudioOutput};
