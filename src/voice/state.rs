use std::fmt;

/// What the voice controller is doing. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VoiceState {
    #[default]
    Idle,
    Recording,
    Transcribing,
    Submitting,
    Speaking,
}

impl fmt::Display for VoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VoiceState::Idle => "idle",
            VoiceState::Recording => "recording",
            VoiceState::Transcribing => "transcribing",
            VoiceState::Submitting => "submitting",
            VoiceState::Speaking => "speaking",
        };
        f.write_str(name)
    }
}
