//! `search`: runs the full lead search for one user from the terminal.

use std::sync::Arc;

use leadscout_core::{AppConfig, Lead, SearchRequest};
use leadscout_db::{PgHistoryStore, PgQuotaLedger};
use leadscout_osm::{FeatureClient, FeatureQueryOptions, GeocoderClient, HttpSettings};
use leadscout_search::{EngineOptions, SearchEngine, SyntheticEnricher};

fn build_engine(pool: &sqlx::PgPool, config: &AppConfig) -> anyhow::Result<SearchEngine> {
    let settings = HttpSettings::from_app_config(config);
    let geocoder = GeocoderClient::new(
        &config.geocoder_url,
        settings.clone(),
        config.geocoder_result_limit,
    )?;
    let features = FeatureClient::new(
        &config.features_url,
        settings,
        FeatureQueryOptions::from_app_config(config),
    )?;
    Ok(SearchEngine::new(
        Arc::new(geocoder),
        Arc::new(features),
        Arc::new(PgQuotaLedger::new(pool.clone())),
        Arc::new(PgHistoryStore::new(pool.clone())),
        Arc::new(SyntheticEnricher::default()),
    )
    .with_options(EngineOptions::from_app_config(config)))
}

/// Runs `request` as the user with `email` and prints the leads.
///
/// # Errors
///
/// Returns an error if the user does not exist, the request is rejected
/// (malformed or over quota), or the database is unreachable.
pub(crate) async fn run_search(
    email: &str,
    request: SearchRequest,
    as_json: bool,
) -> anyhow::Result<()> {
    let (config, pool) = crate::connect().await?;
    let user = leadscout_db::get_user_by_email(&pool, email)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user '{email}' not found; run `user create` first"))?;

    let engine = build_engine(&pool, &config)?;
    let outcome = engine.search(user.id, request).await?;

    // Keep the process alive until the history entry is written.
    if let Err(e) = outcome.history_task.await {
        tracing::warn!(error = %e, "history task did not complete");
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome.leads)?);
    } else {
        print_leads(&outcome.leads);
    }
    println!(
        "credits: {} of {} used on plan {}",
        outcome.quota.used_count, outcome.quota.limit_count, outcome.quota.plan_id
    );
    Ok(())
}

fn print_leads(leads: &[Lead]) {
    if leads.is_empty() {
        println!("no leads found; try broader criteria or a nearby location");
        return;
    }

    println!(
        "{:<32}{:<32}{:<10}{:>7}{:>6}",
        "NAME", "LOCATION", "WEBSITE", "RATING", "CONF"
    );
    for lead in leads {
        println!(
            "{:<32}{:<32}{:<10}{:>7.1}{:>6.2}",
            truncate(&lead.business_name, 30),
            truncate(&lead.location, 30),
            lead.website_status.to_string(),
            lead.rating,
            lead.confidence
        );
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() > max_chars {
        format!("{}...", value.chars().take(max_chars - 3).collect::<String>())
    } else {
        value.to_string()
    }
}
