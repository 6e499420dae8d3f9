use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

pub const DATA_DIR_ENV: &str = "QUICKNOTES_DATA_DIR";
pub const LOG_ENV: &str = "QUICKNOTES_LOG";

const APP_DIR_NAME: &str = "quicknotes";
const STORAGE_FILE: &str = "quicknotes_v1.json";
const LOG_FILE: &str = "quicknotes.log";

/// How long an armed delete waits for the confirming second press.
pub const DELETE_CONFIRM_WINDOW: Duration = Duration::from_millis(2500);
/// The search box only appears once there are more notes than this.
pub const SEARCH_THRESHOLD: usize = 2;
pub const TICK_RATE: Duration = Duration::from_millis(250);
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024; // 50 MB

#[derive(Clone, Debug)]
pub struct Config {
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let data_dir = resolve_data_dir(env::var_os(DATA_DIR_ENV), dirs::data_dir())?;
        Ok(Self { data_dir })
    }

    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join(STORAGE_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE)
    }
}

fn resolve_data_dir(overridden: Option<OsString>, platform: Option<PathBuf>) -> Result<PathBuf> {
    match overridden.filter(|dir| !dir.is_empty()) {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => platform
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory")),
    }
}
