use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

pub const LOG_ENV: &str = "GAMEBOARD_LOG";

/// Filter directives from `GAMEBOARD_LOG`, else the configured level.
pub fn filter(cfg: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&cfg.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Routes tracing output to the log file. The terminal belongs to the UI,
/// so without a file nothing is recorded.
pub fn init(cfg: &LogConfig) -> Result<()> {
    let Some(path) = cfg.file.as_ref() else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("logging: create directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("logging: open {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter(cfg))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("logging: {err}"))?;
    tracing::info!(version = crate::VERSION, "logging started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_is_used_without_env() {
        std::env::remove_var(LOG_ENV);
        let cfg = LogConfig {
            level: "gameboard=debug".into(),
            file: None,
        };
        assert_eq!(filter(&cfg).to_string(), "gameboard=debug");
    }

    #[test]
    fn missing_file_disables_logging() {
        let cfg = LogConfig {
            level: "info".into(),
            file: None,
        };
        assert!(init(&cfg).is_ok());
    }
}
