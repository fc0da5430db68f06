use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{LingoError, Result};

/// Primary credential variable read by the bridge and the client
pub const API_KEY_ENV: &str = "LINGODOTDEV_API_KEY";
/// Alternative credential variable name
pub const API_KEY_FALLBACK_ENV: &str = "LINGO_API_KEY";
pub const BRIDGE_URL_ENV: &str = "LINGO_BRIDGE_URL";
pub const BRIDGE_PORT_ENV: &str = "LINGO_BRIDGE_PORT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Credential; absent means passthrough mode. Never written to disk.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Locale the UI strings are written in
    pub source_locale: String,
    /// Quality mode sent with every request
    pub quality: QualityMode,
    /// Longest time `translate()` may block the UI thread
    pub wait_timeout_ms: u64,
    /// Per-attempt timeout for single translations
    pub request_timeout_ms: u64,
    /// Fixed part of the batch request timeout
    pub batch_timeout_base_ms: u64,
    /// Added to the batch timeout for every text in the batch
    pub batch_timeout_per_item_ms: u64,
    /// Attempts per single translation, including the first
    pub max_attempts: u32,
    /// First backoff delay, doubled after every failed attempt
    pub backoff_base_ms: u64,
    /// How long the first request waits for the bridge to come up
    pub readiness_wait_ms: u64,
    pub readiness_poll_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityMode {
    /// Slower, higher accuracy translation
    Quality,
    /// Backend's fast path
    Fast,
}

impl QualityMode {
    pub fn is_fast(self) -> bool {
        matches!(self, Self::Fast)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Overrides `http://localhost:{port}` when set
    pub base_url: Option<String>,
    pub port: u16,
    /// Bridge server directory, relative to the working directory
    pub directory: PathBuf,
    /// Spawn the bridge when translation is enabled and it is not running
    pub auto_start: bool,
    pub health_timeout_ms: u64,
    pub startup_poll_ms: u64,
    pub startup_max_attempts: u32,
    pub shutdown_grace_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries admitted before new translations are skipped
    pub capacity: usize,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            source_locale: "en".to_string(),
            quality: QualityMode::Quality,
            wait_timeout_ms: 300,
            request_timeout_ms: 10_000,
            batch_timeout_base_ms: 5_000,
            batch_timeout_per_item_ms: 250,
            max_attempts: 3,
            backoff_base_ms: 100,
            readiness_wait_ms: 3_000,
            readiness_poll_ms: 250,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            port: 3737,
            directory: PathBuf::from("lingo-bridge"),
            auto_start: true,
            health_timeout_ms: 500,
            startup_poll_ms: 250,
            startup_max_attempts: 40,
            shutdown_grace_ms: 2_000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 2_000 }
    }
}

impl TranslationConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Batch timeout grows with the number of texts carried.
    pub fn batch_timeout(&self, len: usize) -> Duration {
        Duration::from_millis(
            self.batch_timeout_base_ms
                .saturating_add(self.batch_timeout_per_item_ms.saturating_mul(len as u64)),
        )
    }

    pub fn readiness_wait(&self) -> Duration {
        Duration::from_millis(self.readiness_wait_ms)
    }

    pub fn readiness_poll(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_ms)
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl BridgeConfig {
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.port),
        }
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LingoError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| LingoError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LingoError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| LingoError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Load `.env` files: working directory, home directory, then `~/.totion`.
    /// Variables already present in the environment are never overwritten.
    pub fn load_dotenv() {
        let mut candidates = vec![PathBuf::from(".env")];
        if let Some(dirs) = directories::BaseDirs::new() {
            candidates.push(dirs.home_dir().join(".env"));
            candidates.push(dirs.home_dir().join(".totion").join(".env"));
        }

        for path in candidates {
            if path.exists() {
                match dotenv::from_path(&path) {
                    Ok(()) => debug!("Loaded environment from {}", path.display()),
                    Err(e) => debug!("Skipping {}: {}", path.display(), e),
                }
            }
        }
    }

    /// Overlay credential and bridge location from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(API_KEY_ENV).or_else(|| non_empty(API_KEY_FALLBACK_ENV)) {
            self.translation.api_key = Some(key);
        }

        if let Some(url) = non_empty(BRIDGE_URL_ENV) {
            self.bridge.base_url = Some(url);
        }

        if let Some(port) = non_empty(BRIDGE_PORT_ENV) {
            self.bridge.port = port.trim().parse().map_err(|_| {
                LingoError::Config(format!("{} must be a port number, got '{}'", BRIDGE_PORT_ENV, port))
            })?;
        }

        Ok(())
    }
}
