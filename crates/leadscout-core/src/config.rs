use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation live here, decoupled from the process environment,
/// so tests can drive it with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::str::FromStr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    }

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        parse_as(var, &or_default(var, default))
    };
    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        parse_as(var, &or_default(var, default))
    };
    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        parse_as(var, &or_default(var, default))
    };
    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        parse_as(var, &or_default(var, default))
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("LEADSCOUT_ENV", "development"));
    let bind_addr = parse_addr("LEADSCOUT_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("LEADSCOUT_LOG_LEVEL", "info");
    let plans_path = PathBuf::from(or_default("LEADSCOUT_PLANS_PATH", "./config/plans.yaml"));

    let geocoder_url = or_default(
        "LEADSCOUT_GEOCODER_URL",
        "https://nominatim.openstreetmap.org/",
    );
    let features_url = or_default(
        "LEADSCOUT_FEATURES_URL",
        "https://overpass-api.de/api/interpreter",
    );
    let http_timeout_secs = parse_u64("LEADSCOUT_HTTP_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("LEADSCOUT_USER_AGENT", "leadscout/0.1 (lead-discovery)");
    let http_max_retries = parse_u32("LEADSCOUT_HTTP_MAX_RETRIES", "1")?;
    let http_backoff_base_ms = parse_u64("LEADSCOUT_HTTP_BACKOFF_BASE_MS", "500")?;
    let geocoder_result_limit = parse_u32("LEADSCOUT_GEOCODER_RESULT_LIMIT", "50")?;
    let features_result_cap = parse_u32("LEADSCOUT_FEATURES_RESULT_CAP", "100")?;
    let features_server_timeout_secs = parse_u32("LEADSCOUT_FEATURES_SERVER_TIMEOUT_SECS", "25")?;
    let fusion_threshold = parse_usize("LEADSCOUT_FUSION_THRESHOLD", "3")?;
    let history_dedup_secs = parse_u64("LEADSCOUT_HISTORY_DEDUP_SECS", "300")?;

    let db_max_connections = parse_u32("LEADSCOUT_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("LEADSCOUT_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("LEADSCOUT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        plans_path,
        geocoder_url,
        features_url,
        http_timeout_secs,
        user_agent,
        http_max_retries,
        http_backoff_base_ms,
        geocoder_result_limit,
        features_result_cap,
        features_server_timeout_secs,
        fusion_threshold,
        history_dedup_secs,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
