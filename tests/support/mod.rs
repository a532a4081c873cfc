// Shared fakes for the integration tests
//
// `FakeInterviewServer` answers the interview and speech endpoints in memory,
// following the server's round numbering and error bodies.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use interview_practice::api::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RequestBody};
use interview_practice::ApiError;
use serde_json::{json, Value};
use tokio::sync::oneshot;

struct FakeSession {
    competency: String,
    total_rounds: u32,
    /// Round awaiting an answer; `total_rounds + 1` once complete
    round: u32,
    evaluations: Vec<Value>,
}

impl FakeSession {
    fn is_complete(&self) -> bool {
        self.round > self.total_rounds
    }

    fn average(&self) -> f64 {
        let scores: Vec<f64> = self
            .evaluations
            .iter()
            .filter_map(|e| e["score"].as_f64())
            .collect();
        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    }
}

#[derive(Default)]
struct ServerState {
    sessions: HashMap<String, FakeSession>,
    next_id: u32,
    failures: HashMap<String, (u16, String)>,
    requests: Vec<HttpRequest>,
}

#[derive(Default)]
pub struct FakeInterviewServer {
    state: Mutex<ServerState>,
    holds: Mutex<HashMap<String, oneshot::Receiver<()>>>,
}

pub fn question(round: u32) -> String {
    format!("Question {}", round)
}

/// Score the fake grader gives round `round`: 0.35, 0.55, 0.75, 0.95, ...
pub fn score(round: u32) -> f64 {
    0.35 + 0.2 * (round - 1) as f64
}

pub fn band(score: f64) -> &'static str {
    if score < 0.40 {
        "L1"
    } else if score < 0.60 {
        "L2"
    } else if score < 0.80 {
        "L3"
    } else {
        "L4"
    }
}

fn respond(status: u16, body: Value) -> HttpResponse {
    HttpResponse {
        status,
        body: body.to_string().into_bytes(),
    }
}

fn detail(status: u16, message: &str) -> HttpResponse {
    respond(status, json!({ "detail": message }))
}

impl FakeInterviewServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next request whose path starts with `path` with `status`
    /// and a raw `body`.
    pub fn fail_next(&self, path: &str, status: u16, body: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(path.to_string(), (status, body.to_string()));
    }

    /// Hold the next request to exactly `path` until the returned sender
    /// fires or is dropped.
    pub fn hold_next(&self, path: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.holds.lock().unwrap().insert(path.to_string(), rx);
        tx
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    fn handle(state: &mut ServerState, request: &HttpRequest) -> HttpResponse {
        let body = match &request.body {
            RequestBody::Json(value) => value.clone(),
            _ => Value::Null,
        };
        let path = request.path.as_str();

        match (request.method, path) {
            (HttpMethod::Get, "/health") => respond(200, json!({ "status": "healthy" })),

            (HttpMethod::Post, "/api/interviews/start") => {
                state.next_id += 1;
                let id = format!("session-{}", state.next_id);
                let total_rounds = body["rounds"].as_u64().unwrap_or(3) as u32;
                let competency = body["competency"]
                    .as_str()
                    .unwrap_or("Problem Solving")
                    .to_string();

                state.sessions.insert(
                    id.clone(),
                    FakeSession {
                        competency: competency.clone(),
                        total_rounds,
                        round: 1,
                        evaluations: Vec::new(),
                    },
                );

                respond(
                    200,
                    json!({
                        "session_id": id,
                        "competency": competency,
                        "question": question(1),
                        "difficulty": "medium",
                        "round": 1,
                        "total_rounds": total_rounds,
                    }),
                )
            }

            (HttpMethod::Post, "/api/interviews/answer") => {
                let id = body["session_id"].as_str().unwrap_or_default();
                let Some(session) = state.sessions.get_mut(id) else {
                    return detail(404, "Session not found");
                };
                if session.is_complete() {
                    return detail(400, "Interview already complete");
                }
                let answer = body["answer"].as_str().unwrap_or_default();
                if answer.trim().is_empty() {
                    return detail(400, "Answer cannot be empty");
                }

                let round = session.round;
                let score = score(round);
                session.evaluations.push(json!({
                    "round": round,
                    "question": body["question"],
                    "answer": answer,
                    "score": score,
                    "band": band(score),
                    "justification": format!("Justification for round {}", round),
                    "timestamp": format!("2026-01-05T10:0{}:00.123456", round),
                }));
                session.round += 1;

                let is_complete = session.is_complete();
                respond(
                    200,
                    json!({
                        "score": score,
                        "band": band(score),
                        "justification": format!("Justification for round {}", round),
                        "next_question": if is_complete { None } else { Some(question(session.round)) },
                        "round": session.round,
                        "total_rounds": session.total_rounds,
                        "is_complete": is_complete,
                    }),
                )
            }

            (HttpMethod::Get, "/api/interviews/history") => {
                let mut history: Vec<Value> = state
                    .sessions
                    .iter()
                    .filter(|(_, s)| s.is_complete())
                    .map(|(id, s)| {
                        json!({
                            "session_id": id,
                            "competency": s.competency,
                            "questions_answered": s.evaluations.len(),
                            "average_score": s.average(),
                            "average_band": band(s.average()),
                            "timestamp": "2026-01-05T10:10:00",
                        })
                    })
                    .collect();
                history.sort_by(|a, b| a["session_id"].as_str().cmp(&b["session_id"].as_str()));
                respond(200, json!({ "history": history }))
            }

            (HttpMethod::Get, p) if p.ends_with("/feedback") => {
                let id = p
                    .trim_start_matches("/api/interviews/")
                    .trim_end_matches("/feedback");
                let Some(session) = state.sessions.get(id) else {
                    return detail(404, "Session not found");
                };
                if !session.is_complete() {
                    return detail(400, "Interview not complete");
                }

                // Stored newest first to check the client orders by round
                let mut evaluations = session.evaluations.clone();
                evaluations.reverse();
                let scores: Vec<f64> = session
                    .evaluations
                    .iter()
                    .filter_map(|e| e["score"].as_f64())
                    .collect();

                respond(
                    200,
                    json!({
                        "session_id": id,
                        "competency": session.competency,
                        "total_questions": session.evaluations.len(),
                        "average_score": session.average(),
                        "average_band": band(session.average()),
                        "scores": scores,
                        "evaluations": evaluations,
                        "created_at": "2026-01-05T10:00:00",
                        "completed_at": "2026-01-05T10:10:00+00:00",
                    }),
                )
            }

            (HttpMethod::Delete, p) if p.starts_with("/api/interviews/") => {
                let id = p.trim_start_matches("/api/interviews/");
                match state.sessions.remove(id) {
                    Some(_) => respond(200, json!({ "message": "Interview ended" })),
                    None => detail(404, "Session not found"),
                }
            }

            (HttpMethod::Post, "/api/cv/upload") => match &request.body {
                RequestBody::File {
                    field,
                    file_name,
                    bytes,
                    ..
                } if field == "file" && !bytes.is_empty() => respond(
                    200,
                    json!({
                        "success": true,
                        "filename": file_name,
                        "extracted_skills": ["Rust", "SQL", "Problem Solving"],
                        "experience_years": 3,
                        "education": "Bachelor's in Computer Science",
                    }),
                ),
                _ => detail(400, "No CV uploaded"),
            },

            (HttpMethod::Post, "/api/jd/parse") => {
                if body["content"].as_str().unwrap_or_default().trim().is_empty() {
                    return detail(422, "Job description content is required");
                }
                respond(
                    200,
                    json!({
                        "success": true,
                        "required_skills": ["Rust", "System Design", "Communication"],
                        "experience_required": "3-5 years",
                        "role_level": "Mid-Senior",
                    }),
                )
            }

            (HttpMethod::Post, "/api/speech/transcribe") => match &request.body {
                RequestBody::File { bytes, .. } if !bytes.is_empty() => {
                    respond(200, json!({ "text": "  my transcribed answer \n" }))
                }
                _ => detail(400, "No audio uploaded"),
            },

            (HttpMethod::Post, "/api/speech/synthesize") => HttpResponse {
                status: 200,
                body: format!("audio:{}", body["text"].as_str().unwrap_or_default()).into_bytes(),
            },

            _ => detail(404, "Not Found"),
        }
    }
}

#[async_trait]
impl HttpClient for FakeInterviewServer {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let hold = self.holds.lock().unwrap().remove(&request.path);
        if let Some(hold) = hold {
            let _ = hold.await;
        }

        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());

        let injected = state
            .failures
            .keys()
            .find(|prefix| request.path.starts_with(prefix.as_str()))
            .cloned();
        if let Some(prefix) = injected {
            if let Some((status, body)) = state.failures.remove(&prefix) {
                return Ok(HttpResponse {
                    status,
                    body: body.into_bytes(),
                });
            }
        }

        Ok(Self::handle(&mut state, &request))
    }
}

/// `HttpClient` that never reaches a server
pub struct UnreachableServer;

#[async_trait]
impl HttpClient for UnreachableServer {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, ApiError> {
        Err(ApiError::Connection("connection refused".to_string()))
    }
}
