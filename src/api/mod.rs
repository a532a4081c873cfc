//! REST access to the interview service
//!
//! - `HttpClient`: minimal capability trait over an HTTP transport
//! - `ReqwestHttpClient`: the production adapter
//! - `AnswerSubmissionPipeline`: stateless start / answer / feedback façade,
//!   plus CV upload and job description parsing

pub mod client;
pub mod messages;
mod pipeline;

pub use client::{ApiConfig, HttpClient, HttpMethod, HttpRequest, HttpResponse, RequestBody, ReqwestHttpClient};
pub use messages::{CvProfile, JobRequirements};
pub use pipeline::{AnswerSubmissionPipeline, SubmitOutcome};
