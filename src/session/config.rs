use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Interview mode requested at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewMode {
    #[default]
    Practice,
    Official,
}

impl fmt::Display for InterviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterviewMode::Practice => f.write_str("practice"),
            InterviewMode::Official => f.write_str("official"),
        }
    }
}

impl FromStr for InterviewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "practice" => Ok(InterviewMode::Practice),
            "official" => Ok(InterviewMode::Official),
            other => Err(format!("unknown interview mode '{}'", other)),
        }
    }
}

/// Parameters for starting an interview session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionOptions {
    pub mode: InterviewMode,

    /// Index of the JD/resume sample the server should interview against
    pub sample_idx: Option<u32>,

    /// Competency to target; the server picks one when absent
    pub competency: Option<String>,

    /// Number of rounds; the server default (3) applies when absent
    pub rounds: Option<u32>,
}

impl SessionOptions {
    pub fn practice(rounds: u32) -> Self {
        Self {
            mode: InterviewMode::Practice,
            rounds: Some(rounds),
            ..Self::default()
        }
    }
}
