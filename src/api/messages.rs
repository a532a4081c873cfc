use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::session::{Evaluation, Feedback, HistoryEntry, InterviewMode};

// ============================================================================
// Interview endpoints
// ============================================================================

/// POST /api/interviews/start
#[derive(Debug, Serialize, Deserialize)]
pub struct StartRequest {
    pub mode: InterviewMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_idx: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounds: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartResponse {
    pub session_id: String,
    pub competency: String,
    pub question: String,
    #[serde(default)]
    pub difficulty: String,
    pub round: u32,
    pub total_rounds: u32,
}

/// POST /api/interviews/answer
#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub session_id: String,
    pub question: String,
    pub answer: String,
}

/// Grading of one answer. `round` is the round that comes next, so it is
/// `total_rounds + 1` once the interview is complete.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub score: f64,
    pub band: String,
    pub justification: String,
    pub next_question: Option<String>,
    pub round: u32,
    pub total_rounds: u32,
    pub is_complete: bool,
}

/// GET /api/interviews/{id}/feedback
#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub session_id: String,
    pub competency: String,
    pub total_questions: u32,
    pub average_score: f64,
    pub average_band: String,
    #[serde(default)]
    pub scores: Vec<f64>,
    #[serde(default)]
    pub evaluations: Vec<EvaluationRecord>,
    pub created_at: String,
    pub completed_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub round: u32,
    pub question: String,
    pub answer: String,
    pub score: f64,
    pub band: String,
    pub justification: String,
    pub timestamp: String,
}

/// GET /api/interviews/history
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

// ============================================================================
// Profile endpoints
// ============================================================================

/// POST /api/cv/upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvProfile {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub extracted_skills: Vec<String>,
    #[serde(default)]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub education: Option<String>,
}

/// POST /api/jd/parse
#[derive(Debug, Serialize, Deserialize)]
pub struct ParseJobDescriptionRequest {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequirements {
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub experience_required: Option<String>,
    #[serde(default)]
    pub role_level: Option<String>,
}

// ============================================================================
// Speech endpoints
// ============================================================================

/// POST /api/speech/synthesize
#[derive(Debug, Serialize, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    pub voice: String,
}

/// POST /api/speech/transcribe
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub text: String,
}

// ============================================================================
// Conversions
// ============================================================================

/// Parse a server timestamp. Accepts RFC 3339 and naive ISO 8601 (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| ApiError::Decode(format!("invalid timestamp '{}': {}", raw, e)))
}

impl EvaluationRecord {
    pub fn into_evaluation(self) -> Result<Evaluation, ApiError> {
        Ok(Evaluation {
            timestamp: parse_timestamp(&self.timestamp)?,
            round: self.round,
            question: self.question,
            answer: self.answer,
            score: self.score,
            band: self.band,
            justification: self.justification,
        })
    }
}

impl FeedbackResponse {
    pub fn into_feedback(self) -> Result<Feedback, ApiError> {
        let mut evaluations = self
            .evaluations
            .into_iter()
            .map(EvaluationRecord::into_evaluation)
            .collect::<Result<Vec<_>, _>>()?;
        evaluations.sort_by_key(|e| e.round);

        Ok(Feedback {
            created_at: parse_timestamp(&self.created_at)?,
            completed_at: parse_timestamp(&self.completed_at)?,
            session_id: self.session_id,
            competency: self.competency,
            total_questions: self.total_questions,
            average_score: self.average_score,
            average_band: self.average_band,
            scores: self.scores,
            evaluations,
        })
    }
}
