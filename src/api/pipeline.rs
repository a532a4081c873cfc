use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::client::{ApiConfig, HttpClient, HttpRequest, ReqwestHttpClient};
use super::messages::{
    AnswerRequest, AnswerResponse, CvProfile, FeedbackResponse, HistoryResponse, JobRequirements,
    ParseJobDescriptionRequest, StartRequest, StartResponse,
};
use crate::error::ApiError;
use crate::session::{Evaluation, Feedback, HistoryEntry, RoundAdvance, Session, SessionOptions};

/// Result of a successful answer submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub evaluation: Evaluation,
    pub advance: RoundAdvance,
    pub total_rounds: u32,
}

impl SubmitOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self.advance, RoundAdvance::Complete)
    }
}

/// Stateless request/response façade over the interview REST operations
///
/// Every call is a single exchange: nothing is retried and failures are
/// returned exactly as the server described them.
#[derive(Clone)]
pub struct AnswerSubmissionPipeline {
    http: Arc<dyn HttpClient>,
}

impl AnswerSubmissionPipeline {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Pipeline talking to the configured server over reqwest.
    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(Arc::new(ReqwestHttpClient::new(config)))
    }

    /// The underlying transport, shared with the speech services.
    pub fn http(&self) -> Arc<dyn HttpClient> {
        Arc::clone(&self.http)
    }

    /// POST /api/interviews/start
    pub async fn start(&self, options: &SessionOptions) -> Result<Session, ApiError> {
        let request = StartRequest {
            mode: options.mode,
            sample_idx: options.sample_idx,
            competency: options.competency.clone(),
            rounds: options.rounds,
        };

        let response = self
            .http
            .send(HttpRequest::post_json("/api/interviews/start", &request)?)
            .await?;

        if !response.is_success() {
            let detail = response.failure("Failed to start interview");
            error!("Start interview failed (HTTP {}): {}", response.status, detail);
            return Err(ApiError::Start(detail));
        }

        let body: StartResponse = response.json()?;
        info!(
            "Started session {} ({}, round {}/{})",
            body.session_id, body.competency, body.round, body.total_rounds
        );

        Session::new(
            body.session_id,
            options.mode,
            body.competency,
            body.difficulty,
            body.question,
            body.round,
            body.total_rounds,
        )
    }

    /// POST /api/interviews/answer
    pub async fn submit(
        &self,
        session_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<SubmitOutcome, ApiError> {
        let request = AnswerRequest {
            session_id: session_id.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
        };

        let response = self
            .http
            .send(HttpRequest::post_json("/api/interviews/answer", &request)?)
            .await?;

        if !response.is_success() {
            let detail = response.failure("Failed to submit answer");
            error!("Submit answer failed (HTTP {}): {}", response.status, detail);
            return Err(ApiError::Submission(detail));
        }

        let body: AnswerResponse = response.json()?;

        let advance = if body.is_complete {
            RoundAdvance::Complete
        } else {
            let question = body.next_question.ok_or_else(|| {
                ApiError::Decode("answer response has neither next_question nor is_complete".into())
            })?;
            RoundAdvance::Next {
                question,
                round: body.round,
            }
        };

        let evaluation = Evaluation {
            round: body.round.saturating_sub(1).max(1),
            question: question.to_string(),
            answer: answer.to_string(),
            score: body.score,
            band: body.band,
            justification: body.justification,
            timestamp: Utc::now(),
        };

        info!(
            "Session {}: round {} graded {:.2} ({}){}",
            session_id,
            evaluation.round,
            evaluation.score,
            evaluation.band_level(),
            if body.is_complete { ", interview complete" } else { "" }
        );

        Ok(SubmitOutcome {
            evaluation,
            advance,
            total_rounds: body.total_rounds,
        })
    }

    /// GET /api/interviews/{id}/feedback
    ///
    /// Any non-success response means the session is unknown or not complete.
    pub async fn feedback(&self, session_id: &str) -> Result<Feedback, ApiError> {
        let response = self
            .http
            .send(HttpRequest::get(format!("/api/interviews/{}/feedback", session_id)))
            .await?;

        if !response.is_success() {
            let detail = response.failure("Failed to get feedback");
            warn!("Feedback for {} unavailable (HTTP {}): {}", session_id, response.status, detail);
            return Err(ApiError::NotFound(detail));
        }

        response.json::<FeedbackResponse>()?.into_feedback()
    }

    /// DELETE /api/interviews/{id}
    pub async fn end(&self, session_id: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .send(HttpRequest::delete(format!("/api/interviews/{}", session_id)))
            .await?;

        if !response.is_success() {
            return Err(ApiError::End(response.failure("Failed to end interview")));
        }

        info!("Ended session {}", session_id);
        Ok(())
    }

    /// GET /api/interviews/history
    pub async fn history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        let response = self
            .http
            .send(HttpRequest::get("/api/interviews/history"))
            .await?;

        if !response.is_success() {
            return Err(ApiError::History(response.failure("Failed to get history")));
        }

        Ok(response.json::<HistoryResponse>()?.history)
    }

    /// POST /api/cv/upload as a multipart `file` field
    pub async fn upload_cv(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<CvProfile, ApiError> {
        let response = self
            .http
            .send(HttpRequest::post_file("/api/cv/upload", file_name, mime, bytes))
            .await?;

        if !response.is_success() {
            let detail = response.failure("Failed to upload CV");
            error!("CV upload failed (HTTP {}): {}", response.status, detail);
            return Err(ApiError::CvUpload(detail));
        }

        let profile: CvProfile = response.json()?;
        info!(
            "Uploaded CV {} ({} skills)",
            profile.filename,
            profile.extracted_skills.len()
        );
        Ok(profile)
    }

    /// POST /api/jd/parse
    pub async fn parse_job_description(&self, content: &str) -> Result<JobRequirements, ApiError> {
        let request = ParseJobDescriptionRequest {
            content: content.to_string(),
        };

        let response = self
            .http
            .send(HttpRequest::post_json("/api/jd/parse", &request)?)
            .await?;

        if !response.is_success() {
            let detail = response.failure("Failed to parse JD");
            error!("Job description parse failed (HTTP {}): {}", response.status, detail);
            return Err(ApiError::JdParse(detail));
        }

        response.json()
    }

    /// GET /health
    pub async fn health(&self) -> bool {
        match self.http.send(HttpRequest::get("/health")).await {
            Ok(response) => response.is_success(),
            Err(e) => {
                warn!("Health check failed: {}", e);
                false
            }
        }
    }
}
