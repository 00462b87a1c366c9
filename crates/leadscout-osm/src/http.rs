//! Shared HTTP plumbing for both map data clients.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::OsmError;
use crate::retry::retry_with_backoff;

/// Transport settings common to both clients.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Client-side bound on each request; a timeout is an ordinary failure.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Additional attempts after the first failure, for transient errors only.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl HttpSettings {
    #[must_use]
    pub fn from_app_config(config: &leadscout_core::AppConfig) -> Self {
        Self {
            timeout_secs: config.http_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.http_max_retries,
            backoff_base_ms: config.http_backoff_base_ms,
        }
    }

    pub(crate) fn build_client(&self) -> Result<Client, OsmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&self.user_agent)
            .build()?;
        Ok(client)
    }
}

/// Parses `raw` as a URL. With `trailing_slash`, normalises it to end in
/// exactly one `/` so relative joins append rather than replace the last
/// path segment.
pub(crate) fn parse_base_url(raw: &str, trailing_slash: bool) -> Result<Url, OsmError> {
    let candidate = if trailing_slash {
        format!("{}/", raw.trim_end_matches('/'))
    } else {
        raw.to_string()
    };
    Url::parse(&candidate).map_err(|e| OsmError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

/// GETs `url`, requires a 2xx status, and decodes the body as `T`, retrying
/// transient failures per `settings`.
pub(crate) async fn get_json<T>(
    client: &Client,
    settings: &HttpSettings,
    url: &Url,
) -> Result<T, OsmError>
where
    T: DeserializeOwned,
{
    retry_with_backoff(settings.max_retries, settings.backoff_base_ms, move || async move {
        let response = client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(OsmError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| OsmError::Deserialize {
            context: url.path().to_string(),
            source: e,
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_single_trailing_slash() {
        let url = parse_base_url("https://nominatim.example.org//", true).unwrap();
        assert_eq!(url.as_str(), "https://nominatim.example.org/");
    }

    #[test]
    fn base_url_kept_verbatim_without_normalisation() {
        let url = parse_base_url("https://overpass.example.org/api/interpreter", false).unwrap();
        assert_eq!(url.path(), "/api/interpreter");
    }

    #[test]
    fn invalid_base_url_is_reported() {
        let err = parse_base_url("not a url", true).unwrap_err();
        assert!(matches!(err, OsmError::InvalidBaseUrl { .. }));
    }
}
