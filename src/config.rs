use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::catalog::ChannelEntry;
use crate::feed::DEFAULT_PAGE_SIZE;

const DEFAULT_ENV_PREFIX: &str = "GAMEBOARD";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelEntry>,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            feed: FeedConfig::default(),
            channels: default_channels(),
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    crate::api::DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("gameboard/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_home_channels")]
    pub home_channels: Vec<String>,
    #[serde(default = "default_profile_recent_posts")]
    pub profile_recent_posts: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            home_channels: default_home_channels(),
            profile_recent_posts: default_profile_recent_posts(),
        }
    }
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_home_channels() -> Vec<String> {
    vec![
        "62a7367f5517e27ffcab3bcb".into(),
        "62a736925517e27ffcab3bcf".into(),
    ]
}

fn default_profile_recent_posts() -> usize {
    5
}

fn default_channels() -> Vec<ChannelEntry> {
    vec![
        ChannelEntry {
            id: "62a7367f5517e27ffcab3bcb".into(),
            name: "MapleStory".into(),
            badge: "MS".into(),
        },
        ChannelEntry {
            id: "62a736925517e27ffcab3bcf".into(),
            name: "League of Legends".into(),
            badge: "LoL".into(),
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `null` turns file logging off.
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("gameboard").join("gameboard.log"))
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.api.base_url.is_empty() {
        base.api.base_url = other.api.base_url;
    }
    if !other.api.user_agent.is_empty() {
        base.api.user_agent = other.api.user_agent;
    }
    if !other.api.timeout.is_zero() {
        base.api.timeout = other.api.timeout;
    }

    if other.feed.page_size != 0 {
        base.feed.page_size = other.feed.page_size;
    }
    if !other.feed.home_channels.is_empty() {
        base.feed.home_channels = other.feed.home_channels;
    }
    if other.feed.profile_recent_posts != 0 {
        base.feed.profile_recent_posts = other.feed.profile_recent_posts;
    }

    if !other.channels.is_empty() {
        base.channels = other.channels;
    }

    if !other.log.level.is_empty() {
        base.log.level = other.log.level;
    }
    // A missing key already carries the default path, so only an explicit
    // null reaches here as None.
    base.log.file = other.log.file;

    base
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "api.base_url" => cfg.api.base_url = value,
        "api.user_agent" => cfg.api.user_agent = value,
        "api.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.api.timeout = duration;
            }
        }
        "feed.page_size" => {
            if let Ok(parsed) = value.parse::<usize>() {
                if parsed > 0 {
                    cfg.feed.page_size = parsed;
                }
            }
        }
        "feed.home_channels" => {
            cfg.feed.home_channels = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        "feed.profile_recent_posts" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.feed.profile_recent_posts = parsed;
            }
        }
        "log.level" => cfg.log.level = value,
        "log.file" => {
            cfg.log.file = if value.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gameboard").join("config.yaml"))
}

pub fn save_api_base_url(path: Option<PathBuf>, base_url: &str) -> Result<PathBuf> {
    let base_url = base_url.trim();
    anyhow::ensure!(!base_url.is_empty(), "config: api.base_url is required");
    url::Url::parse(base_url)
        .with_context(|| format!("config: {base_url:?} is not a valid URL"))?;

    let path = if let Some(path) = path {
        path
    } else {
        default_config_path().context("config: unable to determine default config path")?
    };

    let mut cfg = if path.exists() {
        read_config_file(&path)?
    } else {
        Config::default()
    };
    cfg.api.base_url = base_url.to_string();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("config: failed to create directory {}", parent.display()))?;
    }

    let contents = serde_yaml::to_string(&cfg).context("config: failed to serialize config")?;
    fs::write(&path, contents)
        .with_context(|| format!("config: failed to write file {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    #[test]
    fn load_defaults_without_files() {
        let dir = tempdir().unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(dir.path().join("missing.yaml")),
            env_prefix: Some("GAMEBOARD_TEST_DEFAULTS".into()),
        })
        .unwrap();
        assert_eq!(cfg.log.file, default_log_file());
        assert_eq!(cfg.feed.page_size, 7);
        assert_eq!(cfg.api.timeout, Duration::from_secs(20));
        assert_eq!(cfg.channels.len(), 2);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "api:\n  base_url: https://board.example/\n  timeout: 5s\nfeed:\n  page_size: 10\nchannels:\n  - id: abc\n    name: Party\n",
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("GAMEBOARD_TEST_FILE".into()),
        })
        .unwrap();
        assert_eq!(cfg.api.base_url, "https://board.example/");
        assert_eq!(cfg.api.timeout, Duration::from_secs(5));
        assert_eq!(cfg.feed.page_size, 10);
        assert_eq!(cfg.feed.profile_recent_posts, 5);
        assert_eq!(cfg.channels[0].name, "Party");
    }

    #[test]
    fn save_base_url_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        save_api_base_url(Some(path.clone()), "https://board.example/api/").unwrap();
        let saved = read_config_file(&path).unwrap();
        assert_eq!(saved.api.base_url, "https://board.example/api/");
    }

    #[test]
    fn save_rejects_invalid_url() {
        let dir = tempdir().unwrap();
        assert!(save_api_base_url(Some(dir.path().join("c.yaml")), "not a url").is_err());
    }

    #[test]
    fn env_overrides() {
        env::set_var("GAMEBOARD_TEST_ENV_LOG__LEVEL", "debug");
        env::set_var("GAMEBOARD_TEST_ENV_FEED__HOME_CHANNELS", "a, b");
        let dir = tempdir().unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(dir.path().join("missing.yaml")),
            env_prefix: Some("GAMEBOARD_TEST_ENV".into()),
        })
        .unwrap();
        assert_eq!(cfg.log.level, "debug");
        assert_eq!(cfg.feed.home_channels, vec!["a".to_string(), "b".to_string()]);
        env::remove_var("GAMEBOARD_TEST_ENV_LOG__LEVEL");
        env::remove_var("GAMEBOARD_TEST_ENV_FEED__HOME_CHANNELS");
    }

    #[test]
    fn null_log_file_disables_file_logging() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "log:\n  level: warn\n  file: null\n").unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("GAMEBOARD_TEST_NULL_LOG".into()),
        })
        .unwrap();
        assert_eq!(cfg.log.level, "warn");
        assert_eq!(cfg.log.file, None);
    }

    #[test]
    fn empty_log_file_env_disables_file_logging() {
        env::set_var("GAMEBOARD_TEST_EMPTY_LOG_LOG__FILE", "");
        let dir = tempdir().unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(dir.path().join("missing.yaml")),
            env_prefix: Some("GAMEBOARD_TEST_EMPTY_LOG".into()),
        })
        .unwrap();
        env::remove_var("GAMEBOARD_TEST_EMPTY_LOG_LOG__FILE");
        assert_eq!(cfg.log.file, None);
    }
}
