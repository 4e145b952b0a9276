use log::warn;
use serde::Deserialize;
use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:4999/api";

/// Client configuration. Every field has a default so partial documents work.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub sync_interval_ms: u64,
    pub queue_poll_interval_ms: u64,
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            sync_interval_ms: 2000,
            queue_poll_interval_ms: 2000,
            log_filter: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with `CHESS_API_URL`, `CHESS_SYNC_INTERVAL_MS`,
    /// `CHESS_QUEUE_POLL_MS` and `CHESS_LOG`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("CHESS_API_URL") {
            config.api_base_url = url;
        }
        if let Some(ms) = read_millis("CHESS_SYNC_INTERVAL_MS") {
            config.sync_interval_ms = ms;
        }
        if let Some(ms) = read_millis("CHESS_QUEUE_POLL_MS") {
            config.queue_poll_interval_ms = ms;
        }
        if let Ok(filter) = env::var("CHESS_LOG") {
            config.log_filter = filter;
        }
        config
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn queue_poll_interval(&self) -> Duration {
        Duration::from_millis(self.queue_poll_interval_ms)
    }
}

fn read_millis(name: &str) -> Option<u64> {
    let raw = env::var(name).ok()?;
    match raw.parse::<u64>() {
        Ok(0) | Err(_) => {
            warn!("Ignoring invalid {}={:?}", name, raw);
            None
        }
        Ok(ms) => Some(ms),
    }
}

/// Initialize the global logger. `RUST_LOG` wins over `default_filter`;
/// calling this more than once is harmless.
pub fn init_logging(default_filter: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::new().default_filter_or(default_filter))
        .try_init();
}
