//! Environment-driven engine configuration.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub api_host: String,
    pub api_port: u16,
    /// Per-owner daily video render limit.
    pub video_daily_limit: i64,
    pub video_default_duration_sec: u32,
    pub video_default_resolution: String,
    pub video_default_motion: String,
    /// Create-path provider order, e.g. ["pika", "runway"].
    pub video_provider_priority: Vec<String>,
    /// Cron expression for the recurring per-worker dispatch pass; None
    /// disables the heartbeat (dispatch is then purely call-driven).
    pub dispatch_cron: Option<String>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("BACKLOT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("backlot")
            });

        Self {
            data_dir,
            api_host: env_or("BACKLOT_API_HOST", "127.0.0.1"),
            api_port: env_parse("BACKLOT_API_PORT", 8710),
            video_daily_limit: env_parse("BACKLOT_VIDEO_DAILY_LIMIT", 20),
            video_default_duration_sec: env_parse("BACKLOT_VIDEO_DEFAULT_DURATION", 4),
            video_default_resolution: env_or("BACKLOT_VIDEO_DEFAULT_RESOLUTION", "720p"),
            video_default_motion: env_or("BACKLOT_VIDEO_DEFAULT_MOTION", "low"),
            video_provider_priority: env_or("BACKLOT_VIDEO_PROVIDER_PRIORITY", "pika,runway")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            dispatch_cron: std::env::var("BACKLOT_DISPATCH_CRON")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        }
    }
}
