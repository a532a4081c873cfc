use std::time::Duration;

use anyhow::{ensure, Result};
use serde::Deserialize;

use crate::api::ApiConfig;
use crate::audio::CaptureFormat;
use crate::transport::SocketConfig;
use crate::voice::VoiceConfig;

/// Environment variable prefix, e.g. `INTERVIEW_SERVER__HTTP_URL`.
const ENV_PREFIX: &str = "INTERVIEW";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub server: ServerConfig,
    pub socket: SocketSettings,
    pub voice: VoiceSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub http_url: String,
    pub ws_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocketSettings {
    pub max_reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
    pub ping_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceSettings {
    pub voice: String,
    pub auto_play: bool,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Config {
    /// Load configuration from an optional file at `path` (any extension the
    /// `config` crate understands), environment overrides and built-in defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "interview-practice")?
            .set_default("server.http_url", "http://localhost:8000")?
            .set_default("server.ws_url", "ws://localhost:8000")?
            .set_default("socket.max_reconnect_attempts", 3)?
            .set_default("socket.reconnect_delay_ms", 1000)?
            .set_default("socket.ping_interval_secs", 30)?
            .set_default("voice.voice", "alloy")?
            .set_default("voice.auto_play", true)?
            .set_default("voice.sample_rate", 16000)?
            .set_default("voice.channels", 1)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let loaded: Self = settings.try_deserialize()?;
        ensure!(
            loaded.socket.ping_interval_secs > 0,
            "socket.ping_interval_secs must be at least 1"
        );
        Ok(loaded)
    }

    pub fn api(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.server.http_url.clone(),
        }
    }

    pub fn socket(&self) -> SocketConfig {
        SocketConfig {
            ws_url: self.server.ws_url.clone(),
            max_reconnect_attempts: self.socket.max_reconnect_attempts,
            reconnect_delay: Duration::from_millis(self.socket.reconnect_delay_ms),
            ping_interval: Duration::from_secs(self.socket.ping_interval_secs),
        }
    }

    pub fn voice(&self) -> VoiceConfig {
        VoiceConfig {
            voice: self.voice.voice.clone(),
            auto_play: self.voice.auto_play,
            capture: CaptureFormat {
                sample_rate: self.voice.sample_rate,
                channels: self.voice.channels,
                ..CaptureFormat::default()
            },
        }
    }
}
