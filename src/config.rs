use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CONTROL_REPLY_TIMEOUT_MS, DEFAULT_FRAME_PUBLISH_INTERVAL_MS,
    DEFAULT_LEADERBOARD_LIMIT, DEFAULT_MAX_PLAY_SESSIONS, MAX_LEADERBOARD_LIMIT,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub cors_origin: String,
    pub control: ControlConfig,
    pub session: SessionConfig,
    pub leaderboard: LeaderboardConfig,
}

#[derive(Debug, Clone)]
pub struct ControlConfig {
    /// When off, sessions pick the next pose locally.
    pub enabled: bool,
    pub reply_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub frame_publish_interval_ms: u64,
    pub max_play_sessions: usize,
}

#[derive(Debug, Clone)]
pub struct LeaderboardConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl ControlConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

impl SessionConfig {
    pub fn frame_publish_interval(&self) -> Duration {
        Duration::from_millis(self.frame_publish_interval_ms)
    }
}

impl LeaderboardConfig {
    /// Missing → default, otherwise clamped to `1..=max_limit`.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

impl Config {
    pub fn from_env() -> Self {
        let max_limit = env_or_parse("LEADERBOARD_MAX_LIMIT", MAX_LEADERBOARD_LIMIT).max(1);
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/pose-round.sled"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            control: ControlConfig {
                enabled: env_or_bool("CONTROL_CHANNEL_ENABLED", true),
                reply_timeout_ms: env_or_parse(
                    "CONTROL_REPLY_TIMEOUT_MS",
                    DEFAULT_CONTROL_REPLY_TIMEOUT_MS,
                ),
            },
            session: SessionConfig {
                frame_publish_interval_ms: env_or_parse(
                    "FRAME_PUBLISH_INTERVAL_MS",
                    DEFAULT_FRAME_PUBLISH_INTERVAL_MS,
                ),
                max_play_sessions: env_or_parse("MAX_PLAY_SESSIONS", DEFAULT_MAX_PLAY_SESSIONS),
            },
            leaderboard: LeaderboardConfig {
                default_limit: env_or_parse("LEADERBOARD_DEFAULT_LIMIT", DEFAULT_LEADERBOARD_LIMIT)
                    .clamp(1, max_limit),
                max_limit,
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Failed to parse env var, using default");
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
