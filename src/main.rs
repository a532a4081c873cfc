use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use interview_practice::session::Feedback;
use interview_practice::transport::{CompletePayload, GradingPayload, QuestionPayload};
use interview_practice::{
    AnswerSubmissionPipeline, Config, FileAudioOutput, FileCaptureDevice, HttpSpeechService,
    InterviewMode, MessageType, SessionOptions, SessionSocket, SocketEvent, VoiceEvent,
    VoiceSessionController,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "interview-practice")]
#[command(about = "Practice competency interviews against an interview server")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/interview-practice")]
    config: String,

    /// Number of rounds
    #[arg(short, long)]
    rounds: Option<u32>,

    /// Interview mode: practice or official
    #[arg(short, long, default_value = "practice")]
    mode: InterviewMode,

    /// Competency to practice
    #[arg(long)]
    competency: Option<String>,

    /// JD/resume sample index
    #[arg(long)]
    sample_idx: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer questions typed on stdin, one line per answer
    Text {
        /// Exchange questions and answers over the session websocket
        #[arg(long)]
        socket: bool,
    },
    /// Answer with recorded WAV files, one per round
    Voice {
        /// Answer recordings, used in order
        #[arg(short, long, num_args = 1.., required = true)]
        answers: Vec<PathBuf>,

        /// Directory synthesized speech is written to
        #[arg(short, long, default_value = "speech")]
        out_dir: PathBuf,
    },
    /// Show feedback for a completed session
    Feedback { session_id: String },
    /// List past sessions
    History,
    /// Check that the server is reachable
    Health,
    /// Delete a session
    End { session_id: String },
    /// Upload a CV and list the skills the server extracted
    Cv { path: PathBuf },
    /// Parse a job description from a text file
    Jd { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} -> {}", cfg.service.name, cfg.server.http_url);

    let pipeline = AnswerSubmissionPipeline::from_config(&cfg.api());
    let options = SessionOptions {
        mode: cli.mode,
        sample_idx: cli.sample_idx,
        competency: cli.competency.clone(),
        rounds: cli.rounds,
    };

    match cli.command {
        Command::Text { socket: false } => run_text(&pipeline, &options).await,
        Command::Text { socket: true } => run_socket(&cfg, &pipeline, &options).await,
        Command::Voice { answers, out_dir } => {
            run_voice(&cfg, pipeline, &options, answers, out_dir).await
        }
        Command::Feedback { session_id } => {
            print_feedback(&pipeline.feedback(&session_id).await?);
            Ok(())
        }
        Command::History => {
            let history = pipeline.history().await?;
            if history.is_empty() {
                println!("No completed interviews");
            }
            for entry in history {
                println!(
                    "{}  {}  {} answered  avg {:.2} ({})  {}",
                    entry.session_id,
                    entry.competency,
                    entry.questions_answered,
                    entry.average_score,
                    entry.band_level(),
                    entry.timestamp
                );
            }
            Ok(())
        }
        Command::Health => {
            if pipeline.health().await {
                println!("ok");
                Ok(())
            } else {
                bail!("server at {} is not healthy", cfg.server.http_url)
            }
        }
        Command::End { session_id } => {
            pipeline.end(&session_id).await?;
            println!("Ended {}", session_id);
            Ok(())
        }
        Command::Cv { path } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "cv".to_string());
            let mime = match path.extension().and_then(|e| e.to_str()) {
                Some("pdf") => "application/pdf",
                Some("txt") | Some("md") => "text/plain",
                _ => "application/octet-stream",
            };
            let profile = pipeline.upload_cv(&file_name, mime, bytes).await?;
            println!("{}: {}", profile.filename, profile.extracted_skills.join(", "));
            Ok(())
        }
        Command::Jd { path } => {
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let requirements = pipeline.parse_job_description(&content).await?;
            println!("Required: {}", requirements.required_skills.join(", "));
            if let Some(level) = requirements.role_level {
                println!("Level: {}", level);
            }
            Ok(())
        }
    }
}

async fn run_text(pipeline: &AnswerSubmissionPipeline, options: &SessionOptions) -> Result<()> {
    let mut session = pipeline.start(options).await?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    println!("Competency: {} ({})", session.competency, session.difficulty);

    while !session.is_complete() {
        println!(
            "\n[{}/{}] {}",
            session.round(),
            session.total_rounds(),
            session.question()
        );

        let answer = read_answer(&mut input).await?;
        let outcome = pipeline
            .submit(&session.id, session.question(), &answer)
            .await?;
        println!("{}", outcome.evaluation.summary());
        session.advance(&outcome.advance)?;
    }

    print_feedback(&pipeline.feedback(&session.id).await?);
    Ok(())
}

async fn run_socket(
    cfg: &Config,
    pipeline: &AnswerSubmissionPipeline,
    options: &SessionOptions,
) -> Result<()> {
    let session = pipeline.start(options).await?;
    let (socket, mut events) = SessionSocket::new(session.id.clone(), cfg.socket());
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    socket.connect().await?;
    println!("Competency: {} ({})", session.competency, session.difficulty);

    while let Some(event) = events.recv().await {
        match event {
            SocketEvent::Connected => info!("Socket open for {}", session.id),
            SocketEvent::Reconnecting { attempt, delay } => {
                warn!("Connection lost, reconnect {} in {:?}", attempt, delay)
            }
            SocketEvent::Error(e) => warn!("Socket error: {}", e),
            SocketEvent::Closed(e) => bail!(e),
            SocketEvent::Message(message) => match message.kind() {
                MessageType::Question => {
                    let Some(q) = message.payload::<QuestionPayload>() else {
                        continue;
                    };
                    println!("\n[{}/{}] {}", q.round, q.total_rounds, q.question);
                    let answer = read_answer(&mut input).await?;
                    socket.send_answer(&answer).await;
                }
                MessageType::Grading => {
                    if let Some(g) = message.payload::<GradingPayload>() {
                        println!(
                            "Score: {:.2} | Band: {}\n{}",
                            g.score, g.band, g.justification
                        );
                    }
                }
                MessageType::Complete => {
                    if let Some(c) = message.payload::<CompletePayload>() {
                        info!("Session {} complete, average {:.2}", c.session_id, c.average_score);
                    }
                    break;
                }
                MessageType::Error => {
                    warn!("Server: {}", message.message().unwrap_or("unknown error"))
                }
                _ => {}
            },
        }
    }

    socket.disconnect().await;
    print_feedback(&pipeline.feedback(&session.id).await?);
    Ok(())
}

async fn run_voice(
    cfg: &Config,
    pipeline: AnswerSubmissionPipeline,
    options: &SessionOptions,
    answers: Vec<PathBuf>,
    out_dir: PathBuf,
) -> Result<()> {
    let speech = Arc::new(HttpSpeechService::new(pipeline.http()));
    let (controller, mut events) = VoiceSessionController::new(
        cfg.voice(),
        pipeline,
        speech,
        Box::new(FileCaptureDevice::new(answers)),
        Arc::new(FileAudioOutput::new(out_dir)),
    );

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                VoiceEvent::SessionStarted {
                    question,
                    round,
                    total_rounds,
                    ..
                }
                | VoiceEvent::NextQuestion {
                    question,
                    round,
                    total_rounds,
                } => println!("\n[{}/{}] {}", round, total_rounds, question),
                VoiceEvent::Transcribed(text) => println!("> {}", text),
                VoiceEvent::Graded(evaluation) => println!("{}", evaluation.summary()),
                VoiceEvent::Completed { session_id } => info!("Session {} complete", session_id),
                VoiceEvent::SessionEnded { session_id } => info!("Session {} ended", session_id),
                VoiceEvent::PlaybackFailed(e) => warn!("Playback failed: {}", e),
            }
        }
    });

    controller.start_session(options).await?;

    loop {
        controller.start_recording().await?;
        let answer = controller.stop_recording().await?;
        let outcome = controller.submit_answer(&answer).await?;
        if outcome.is_complete() {
            break;
        }
    }

    let feedback = controller.feedback().await?;
    drop(controller);
    printer.await?;

    print_feedback(&feedback);
    Ok(())
}

async fn read_answer(input: &mut Lines<BufReader<Stdin>>) -> Result<String> {
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = input
            .next_line()
            .await?
            .context("stdin closed before the interview finished")?;
        let answer = line.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
    }
}

fn print_feedback(feedback: &Feedback) {
    println!(
        "\n{} ({} questions): average {:.2} ({})",
        feedback.competency,
        feedback.total_questions,
        feedback.average_score,
        feedback.band_level()
    );
    for evaluation in &feedback.evaluations {
        println!(
            "  Q{} {:.2} ({}) {}",
            evaluation.round, evaluation.score, evaluation.band_level(), evaluation.question
        );
    }
}
