use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Runtime settings: defaults, then `series_scraper.toml`, then `SERIES_*` env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_path: String,
    pub site_origin: String,
    pub schedule_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub follow_redirects: bool,
    pub verify_tls: bool,
    pub batch_delay_ms: u64,
    pub render_api_key: Option<String>,
    pub render_endpoint: String,
    pub render_timeout_secs: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name("series_scraper").required(false))
            .add_source(Environment::with_prefix("SERIES"))
            .build()?
            .try_deserialize()
    }

    /// Built-in defaults only; no file or environment layers.
    #[cfg(test)]
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("db_path", "data/series.sqlite")?
            .set_default("site_origin", "https://www.cricbuzz.com")?
            .set_default(
                "schedule_url",
                "https://www.cricbuzz.com/cricket-schedule/series/all",
            )?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .set_default("timeout_secs", 30)?
            .set_default("follow_redirects", true)?
            .set_default("verify_tls", true)?
            .set_default("batch_delay_ms", 500)?
            .set_default("render_endpoint", "https://api.scraperapi.com/")?
            .set_default("render_timeout_secs", 120)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}
