use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub catalog_path: PathBuf,
    /// Directory holding the persisted export artifacts of the latest run.
    pub data_dir: PathBuf,
    /// Directory for raw documents while a target is in flight.
    pub scratch_dir: PathBuf,
    /// Directory receiving documents that failed extraction.
    pub debug_dir: PathBuf,
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub user_agent: String,
    pub navigation_timeout_ms: u64,
    pub challenge_timeout_ms: u64,
    pub challenge_settle_ms: u64,
    pub legacy_post_load_delay_ms: u64,
    pub current_post_load_delay_ms: u64,
    pub inter_request_delay_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    /// Six-field cron expression; `None` disables scheduled crawls.
    pub crawl_schedule: Option<String>,
}
