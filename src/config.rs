use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, ensure};

pub const DEFAULT_REBIND_DELAY_MS: u64 = 50;
pub const DEFAULT_FILE_LOG_FILTER: &str = "debug";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceSettings {
    pub rebind_delay: Duration,
    pub bridge_bind: Option<String>,
    pub template_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub file_log_filter: String,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            rebind_delay: Duration::from_millis(DEFAULT_REBIND_DELAY_MS),
            bridge_bind: None,
            template_path: None,
            log_dir: None,
            file_log_filter: DEFAULT_FILE_LOG_FILTER.to_owned(),
        }
    }
}

impl SurfaceSettings {
    pub fn from_env() -> Result<Self> {
        // Load .env if present, but do not fail if file does not exist.
        let _ = dotenvy::dotenv();

        let rebind_delay_ms = parse_u64_env("RESUME_REBIND_DELAY_MS", DEFAULT_REBIND_DELAY_MS)?;
        ensure!(
            rebind_delay_ms > 0,
            "RESUME_REBIND_DELAY_MS must be greater than 0"
        );

        let bridge_bind = read_optional_env("RESUME_BRIDGE_BIND");
        let template_path = read_optional_env("RESUME_TEMPLATE").map(PathBuf::from);
        let log_dir = read_optional_env("RESUME_LOG_DIR").map(PathBuf::from);
        let file_log_filter = read_optional_env("RESUME_FILE_LOG")
            .unwrap_or_else(|| DEFAULT_FILE_LOG_FILTER.to_owned());

        Ok(Self {
            rebind_delay: Duration::from_millis(rebind_delay_ms),
            bridge_bind,
            template_path,
            log_dir,
            file_log_filter,
        })
    }
}

fn read_optional_env(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    })
}

fn parse_u64_env(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("failed to parse {name} as u64")),
        Err(_) => Ok(default),
    }
}
