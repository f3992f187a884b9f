use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::warn;

pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_AUTOSAVE_SECS: u64 = 60;
const APP_DIR_NAME: &str = "TaskWidget";

/// Runtime configuration.
///
/// # Environment Variables
///
/// - `TASK_WIDGET_DATA_DIR`: directory holding `tasks.json` and
///   `settings.json` (default: the platform's local data dir + `TaskWidget`)
/// - `TASK_WIDGET_ADDR`: bind address (default: `127.0.0.1:3000`)
/// - `TASK_WIDGET_STATIC_DIR`: widget front-end assets (default: `static`)
/// - `TASK_WIDGET_AUTOSAVE_SECS`: save interval while a timer runs, 0 disables
///   (default: 60)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub addr: SocketAddr,
    pub static_dir: PathBuf,
    pub autosave_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_dir: default_data_dir(),
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            autosave_secs: DEFAULT_AUTOSAVE_SECS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    // Invalid values keep the default and log a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = AppConfig::default();

        if let Some(dir) = lookup("TASK_WIDGET_DATA_DIR").filter(|s| !s.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("TASK_WIDGET_STATIC_DIR").filter(|s| !s.trim().is_empty()) {
            config.static_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("TASK_WIDGET_ADDR") {
            match raw.trim().parse() {
                Ok(addr) => config.addr = addr,
                Err(_) => warn!(value = %raw, fallback = DEFAULT_ADDR, "invalid TASK_WIDGET_ADDR"),
            }
        }
        if let Some(raw) = lookup("TASK_WIDGET_AUTOSAVE_SECS") {
            match raw.trim().parse() {
                Ok(secs) => config.autosave_secs = secs,
                Err(_) => warn!(
                    value = %raw,
                    fallback = DEFAULT_AUTOSAVE_SECS,
                    "invalid TASK_WIDGET_AUTOSAVE_SECS"
                ),
            }
        }
        config
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("data"))
}
