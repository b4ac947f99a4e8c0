use anyhow::Result;
use serde::Deserialize;
use std::{fs::File, str::FromStr};
use tracing::Level;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{self, writer::MakeWriterExt},
    prelude::*,
    Registry,
};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Plain,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    File,
}

/// Logging settings, typically the `[log]` table of a service's
/// configuration file.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LogConfig {
    /// Minimum level to record. An unrecognized or empty value falls
    /// back to `info`.
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Required when `output` is `file`.
    pub file_path: Option<String>,
}

/// Installs the global subscriber described by `config`.
///
/// `RUST_LOG`, when set, takes precedence over `config.level` and may
/// carry per-target directives.
pub fn init(config: &LogConfig) -> Result<()> {
    let log_level = Level::from_str(&config.level).unwrap_or(Level::INFO);
    let filter = match EnvFilter::try_from_default_env() {
        Ok(env_filter) => env_filter,
        Err(_) => EnvFilter::default().add_directive(LevelFilter::from_level(log_level).into()),
    };
    let subscriber = Registry::default().with(filter);

    match config.output {
        LogOutput::File => {
            let file_path = config.file_path.as_deref().ok_or_else(|| {
                anyhow::anyhow!("Log output is 'file' but 'file_path' is not specified")
            })?;
            let log_file = File::create(file_path)?;
            let file_writer = log_file.with_max_level(log_level);

            match config.format {
                LogFormat::Json => subscriber
                    .with(fmt::layer().with_writer(file_writer).json())
                    .init(),
                LogFormat::Plain => subscriber
                    .with(fmt::layer().with_writer(file_writer).with_ansi(false))
                    .init(),
            }
        }
        LogOutput::Stdout => {
            let stdout_writer = std::io::stdout.with_max_level(log_level);
            match config.format {
                LogFormat::Json => subscriber
                    .with(fmt::layer().with_writer(stdout_writer).json())
                    .init(),
                LogFormat::Plain => subscriber
                    .with(fmt::layer().with_writer(stdout_writer).pretty())
                    .init(),
            }
        }
    };

    Ok(())
}
