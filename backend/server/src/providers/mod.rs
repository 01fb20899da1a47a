//! # Providers
//!
//! Thin clients for the stock photo APIs. Each one builds the upstream
//! request, maps the raw payload into [`shared::Image`] and computes paging.
//!
//! | Source   | Auth                          | Endpoint         |
//! |----------|-------------------------------|------------------|
//! | Unsplash | `Authorization: Client-ID …`  | `/search/photos` |
//! | Pexels   | `Authorization: …`            | `/search`        |
//! | Pixabay  | `key` query parameter         | `/`              |
//!
//! Upstream 429 becomes `RATE_LIMIT_EXCEEDED`, any other non-2xx becomes
//! `EXTERNAL_API_ERROR`, transport failures become `NETWORK_ERROR`.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use shared::{ImageSource, SearchResult};
use tracing::{debug, warn};

use crate::{
    config::{Config, ProviderConfig},
    error::AppError,
    validation::SearchQuery,
};

pub mod pexels;
pub mod pixabay;
pub mod unsplash;

pub struct Providers {
    http: Client,
    unsplash: ProviderConfig,
    pexels: ProviderConfig,
    pixabay: ProviderConfig,
}

impl Providers {
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            unsplash: config.unsplash.clone(),
            pexels: config.pexels.clone(),
            pixabay: config.pixabay.clone(),
        }
    }

    pub async fn search(
        &self,
        source: ImageSource,
        query: &SearchQuery,
    ) -> Result<SearchResult, AppError> {
        debug!(%source, query = %query.query, page = query.page, "Searching provider");

        match source {
            ImageSource::Unsplash => unsplash::search(&self.http, &self.unsplash, query).await,
            ImageSource::Pexels => pexels::search(&self.http, &self.pexels, query).await,
            ImageSource::Pixabay => pixabay::search(&self.http, &self.pixabay, query).await,
        }
    }
}

fn api_key(config: &ProviderConfig, source: ImageSource) -> Result<&str, AppError> {
    config
        .api_key
        .as_deref()
        .ok_or_else(|| AppError::Misconfigured(format!("{} API key is not configured", source.label())))
}

/// Sends `request` and decodes a JSON body, mapping failures onto the error taxonomy.
async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    source: ImageSource,
) -> Result<T, AppError> {
    let response = request
        .send()
        .await
        .map_err(|e| AppError::Network(e.to_string()))?;

    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        warn!(%source, "Upstream rate limit hit");
        return Err(AppError::RateLimited { info: None });
    }

    if !status.is_success() {
        return Err(AppError::ExternalApi {
            status: status.as_u16(),
            message: format!(
                "{} API error: {}",
                source.label(),
                status.canonical_reason().unwrap_or("Unknown")
            ),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::Network(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| AppError::ExternalApi {
        status: status.as_u16(),
        message: format!("{} API returned an unexpected response: {e}", source.label()),
    })
}

fn total_pages(total: u64, per_page: u32) -> u32 {
    if per_page == 0 {
        return 0;
    }
    total.div_ceil(per_page as u64).min(u32::MAX as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(40, 20), 2);
        assert_eq!(total_pages(41, 20), 3);
        assert_eq!(total_pages(41, 0), 0);
    }

    #[test]
    fn missing_key_names_the_provider() {
        let config = Config::default();
        let err = api_key(&config.pexels, ImageSource::Pexels).unwrap_err();

        assert_eq!(err.to_string(), "Pexels API key is not configured");
        assert_eq!(err.code(), shared::ErrorCode::InternalServerError);
    }
}
