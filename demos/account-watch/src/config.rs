use anyhow::{Context, Result};
use keel_xrpl_connector::config::ConnectorConfig;
use keel_xrpl_logger::LogConfig;
use serde::Deserialize;

/// The top-level configuration for the account-watch demo.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct WatchConfig {
    #[serde(default)]
    pub connector: ConnectorConfig,
    #[serde(default)]
    pub watch: WatchSettings,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

/// Settings unique to the demo binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WatchSettings {
    /// The account the demo follows.
    pub account: String,
    /// How many simulated ledger rounds to run.
    pub rounds: u32,
    /// Delay between simulated rounds, in milliseconds.
    pub round_delay_ms: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            account: "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh".to_string(),
            rounds: 6,
            round_delay_ms: 400,
        }
    }
}

/// Loads the demo configuration from a specified TOML file.
pub fn load_config(path: &str) -> Result<WatchConfig> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(path))
        .add_source(config::Environment::with_prefix("KEEL").separator("__"));

    let settings: WatchConfig = builder
        .build()
        .context(format!("Failed to build configuration from '{}'", path))?
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    Ok(settings)
}
