//! Offline unit tests for leadscout-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::Utc;
use leadscout_core::{AppConfig, Environment, HistoryResult};
use leadscout_db::{PoolConfig, SearchHistoryRow};
use sqlx::types::Json;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use uuid::Uuid;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        plans_path: PathBuf::from("./config/plans.yaml"),
        geocoder_url: "https://nominatim.example.org/".to_string(),
        features_url: "https://overpass.example.org/api/interpreter".to_string(),
        http_timeout_secs: 30,
        user_agent: "ua".to_string(),
        http_max_retries: 1,
        http_backoff_base_ms: 500,
        geocoder_result_limit: 50,
        features_result_cap: 100,
        features_server_timeout_secs: 25,
        fusion_threshold: 3,
        history_dedup_secs: 300,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn history_row_converts_to_domain_entry() {
    let public_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let created_at = Utc::now();
    let row = SearchHistoryRow {
        id: 1,
        public_id,
        user_id,
        query: "restaurants in Chennai".to_string(),
        service: "web design".to_string(),
        location: "Chennai".to_string(),
        criteria: "restaurants".to_string(),
        results: Json(vec![HistoryResult {
            business_name: "Saravana Bhavan".to_string(),
            location: "T. Nagar, Chennai".to_string(),
        }]),
        result_count: 1,
        created_at,
    };

    let entry = row.into_entry();
    assert_eq!(entry.id, public_id);
    assert_eq!(entry.entry.user_id, user_id);
    assert_eq!(entry.entry.result_count, 1);
    assert_eq!(entry.entry.results[0].business_name, "Saravana Bhavan");
    assert_eq!(entry.entry.recorded_at, created_at);

    let json = serde_json::to_value(&entry).expect("serialize");
    assert_eq!(json["query"], "restaurants in Chennai");
    assert_eq!(json["id"], public_id.to_string());
}
