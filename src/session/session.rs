use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::config::InterviewMode;
use crate::error::ApiError;

/// What a successful submission does to the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoundAdvance {
    /// The server issued the question for `round`
    Next { question: String, round: u32 },
    /// The last round was answered
    Complete,
}

/// An active interview session as seen by the client
///
/// The round counter only moves forward one step at a time and never passes
/// `total_rounds`; completion is only accepted on the last round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub mode: InterviewMode,
    pub competency: String,
    pub difficulty: String,
    question: String,
    round: u32,
    total_rounds: u32,
    complete: bool,
}

impl Session {
    /// Create a session from the server's start response.
    pub fn new(
        id: String,
        mode: InterviewMode,
        competency: String,
        difficulty: String,
        question: String,
        round: u32,
        total_rounds: u32,
    ) -> Result<Self, ApiError> {
        if total_rounds == 0 || round == 0 || round > total_rounds {
            return Err(ApiError::Start(format!(
                "server reported round {} of {}",
                round, total_rounds
            )));
        }

        Ok(Self {
            id,
            mode,
            competency,
            difficulty,
            question,
            round,
            total_rounds,
            complete: false,
        })
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The question currently awaiting an answer
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Apply the outcome of a submission.
    pub fn advance(&mut self, advance: &RoundAdvance) -> Result<(), ApiError> {
        if self.complete {
            return Err(ApiError::Submission(format!(
                "session {} is already complete",
                self.id
            )));
        }

        match advance {
            RoundAdvance::Next { question, round } => {
                if *round != self.round + 1 || *round > self.total_rounds {
                    warn!(
                        "Session {}: rejected round advance {} -> {} (total {})",
                        self.id, self.round, round, self.total_rounds
                    );
                    return Err(ApiError::Submission(format!(
                        "server advanced round from {} to {} of {}",
                        self.round, round, self.total_rounds
                    )));
                }
                self.round = *round;
                self.question = question.clone();
                info!(
                    "Session {}: round {}/{}",
                    self.id, self.round, self.total_rounds
                );
            }
            RoundAdvance::Complete => {
                if self.round != self.total_rounds {
                    return Err(ApiError::Submission(format!(
                        "server completed the interview at round {} of {}",
                        self.round, self.total_rounds
                    )));
                }
                self.complete = true;
                info!("Session {}: complete", self.id);
            }
        }

        Ok(())
    }
}
