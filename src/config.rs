use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const ENV_FILE: &str = ".env";

/// Operational settings loaded from `config.toml`. Every field is defaulted
/// so the file itself is optional; credentials never live here — they come
/// from the environment (see the `telegram_*` / `naver_cookie` getters).
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub run: RunConfig,
    pub storage: StorageConfig,
    pub watchdog: WatchdogConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub max_items: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://section.cafe.naver.com".to_string(),
            request_timeout_ms: 15_000,
            max_items: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RunConfig {
    /// Global wall-clock deadline for one run.
    pub deadline_s: u64,
    /// Inter-message delay, respects the Telegram rate limit.
    pub message_delay_ms: u64,
    /// Per-message delivery timeout.
    pub send_timeout_s: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            deadline_s: 120,
            message_delay_ms: 1_000,
            send_timeout_s: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the seen-set, stamp, and lock files. Defaults to cwd.
    pub data_dir: Option<String>,
    /// Extra directory for heartbeat/status writes, on top of the built-in
    /// candidates.
    pub health_dir: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WatchdogConfig {
    pub threshold_s: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self { threshold_s: 600 }
    }
}

impl Config {
    /// Load `config.toml`. A missing file yields the defaults; a present but
    /// malformed file is an error (silent fallback would mask typos).
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read config file: {}", path.display()))
            }
        };
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config TOML: {}", path.display()))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Load .env file into process environment. Real env vars take precedence.
    pub fn load_env_file() {
        let path = Path::new(ENV_FILE);
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return,
        };
        // Strip BOM if present (common on Windows-created files)
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        for line in content.lines() {
            let line = line.trim().trim_matches('\r');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"').trim_matches('\'');
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
        }
    }

    /// Telegram bot token; empty when unset (the sink degrades to a no-op).
    pub fn telegram_token() -> String {
        trimmed_env("TELEGRAM_BOT_TOKEN")
    }

    /// Telegram chat id; empty when unset.
    pub fn telegram_chat_id() -> String {
        trimmed_env("TELEGRAM_CHAT_ID")
    }

    /// Raw Naver session cookie, `key=value` pairs joined by `;`.
    pub fn naver_cookie() -> String {
        trimmed_env("NAVER_COOKIE")
    }
}

fn trimmed_env(key: &str) -> String {
    std::env::var(key).unwrap_or_default().trim().to_string()
}
