use std::env;
use std::fs::OpenOptions;

use anyhow::{Context, Result};

use crate::config::{Config, LOG_ENV};

/// Routes `log` output to a file in the data directory; the terminal is in
/// raw alternate-screen mode, so stderr would draw over the UI.
pub fn init_logging(config: &Config) -> Result<()> {
    let path = config.log_path();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("could not open log file {}", path.display()))?;

    let filters = env::var(LOG_ENV).unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::new()
        .parse_filters(&filters)
        .format_timestamp_millis()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("could not install the logger")?;
    Ok(())
}
