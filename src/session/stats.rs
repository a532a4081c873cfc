use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete performance tier derived from a score in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Band {
    L1,
    L2,
    L3,
    L4,
}

impl Band {
    pub fn from_score(score: f64) -> Self {
        if score < 0.40 {
            Band::L1
        } else if score < 0.60 {
            Band::L2
        } else if score < 0.80 {
            Band::L3
        } else {
            Band::L4
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "L1" => Some(Band::L1),
            "L2" => Some(Band::L2),
            "L3" => Some(Band::L3),
            "L4" => Some(Band::L4),
            _ => None,
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Band::L1 => "L1",
            Band::L2 => "L2",
            Band::L3 => "L3",
            Band::L4 => "L4",
        };
        f.write_str(label)
    }
}

/// The graded record of one answered round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Round the answer belongs to (1-based)
    pub round: u32,

    pub question: String,
    pub answer: String,

    /// Numeric score (0.0 to 1.0)
    pub score: f64,

    /// Band label as reported by the server
    pub band: String,

    pub justification: String,

    /// When the evaluation was recorded
    pub timestamp: DateTime<Utc>,
}

impl Evaluation {
    /// The reported band, or the one implied by the score when the server
    /// sent a label we do not know.
    pub fn band_level(&self) -> Band {
        Band::parse(&self.band).unwrap_or_else(|| Band::from_score(self.score))
    }

    /// Short human-readable summary, also used as the spoken grading.
    pub fn summary(&self) -> String {
        format!(
            "Score: {:.2} | Band: {}\n{}",
            self.score, self.band, self.justification
        )
    }
}

/// Aggregate report for a completed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub session_id: String,
    pub competency: String,
    pub total_questions: u32,
    pub average_score: f64,
    pub average_band: String,
    pub scores: Vec<f64>,

    /// Evaluations ordered by round
    pub evaluations: Vec<Evaluation>,

    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl Feedback {
    pub fn band_level(&self) -> Band {
        Band::parse(&self.average_band).unwrap_or_else(|| Band::from_score(self.average_score))
    }
}

/// Summary of a past session as listed by the history endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub session_id: String,
    pub competency: String,
    pub questions_answered: u32,
    pub average_score: f64,
    pub average_band: String,
    pub timestamp: String,
}

impl HistoryEntry {
    pub fn band_level(&self) -> Band {
        Band::parse(&self.average_band).unwrap_or_else(|| Band::from_score(self.average_score))
    }
}
