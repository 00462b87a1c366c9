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

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub plans_path: PathBuf,
    pub geocoder_url: String,
    pub features_url: String,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub http_max_retries: u32,
    pub http_backoff_base_ms: u64,
    pub geocoder_result_limit: u32,
    pub features_result_cap: u32,
    pub features_server_timeout_secs: u32,
    pub fusion_threshold: usize,
    pub history_dedup_secs: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("plans_path", &self.plans_path)
            .field("database_url", &"[redacted]")
            .field("geocoder_url", &self.geocoder_url)
            .field("features_url", &self.features_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("http_max_retries", &self.http_max_retries)
            .field("http_backoff_base_ms", &self.http_backoff_base_ms)
            .field("geocoder_result_limit", &self.geocoder_result_limit)
            .field("features_result_cap", &self.features_result_cap)
            .field(
                "features_server_timeout_secs",
                &self.features_server_timeout_secs,
            )
            .field("fusion_threshold", &self.fusion_threshold)
            .field("history_dedup_secs", &self.history_dedup_secs)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
