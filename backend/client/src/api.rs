use std::{env, time::Duration};

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use shared::{ApiResponse, HealthData, ImageSource, ImageType, SearchResult};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    /// `min(base * 2^attempt, max)`, attempt counted from zero.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub image_type: Option<ImageType>,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page: None,
            per_page: None,
            image_type: None,
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Reads `NEXT_PUBLIC_APP_URL`, falling back to the local server.
    pub fn from_env() -> Self {
        let base_url = env::var("NEXT_PUBLIC_APP_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Self::new(base_url)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn search_url(&self, source: ImageSource, params: &SearchParams) -> ClientResult<Url> {
        let mut url = Url::parse(&format!("{}/search/{source}", self.base_url))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", &params.query);
            if let Some(page) = params.page {
                pairs.append_pair("page", &page.to_string());
            }
            if let Some(per_page) = params.per_page {
                pairs.append_pair("perPage", &per_page.to_string());
            }
            if let (Some(image_type), ImageSource::Pixabay) = (params.image_type, source) {
                pairs.append_pair("imageType", image_type.as_str());
            }
        }

        Ok(url)
    }

    pub async fn search_images(
        &self,
        source: ImageSource,
        params: &SearchParams,
    ) -> ClientResult<SearchResult> {
        let url = self.search_url(source, params)?;
        self.fetch_with_retry(url).await
    }

    pub async fn check_health(&self) -> ClientResult<HealthData> {
        let url = Url::parse(&format!("{}/health", self.base_url))?;
        self.fetch_with_retry(url).await
    }

    /// GETs `url` and unwraps the envelope, retrying everything but 4xx answers.
    pub async fn fetch_with_retry<T: DeserializeOwned>(&self, url: Url) -> ClientResult<T> {
        let mut attempt = 0;

        loop {
            let error = match self.fetch_once(url.clone()).await {
                Ok(data) => return Ok(data),
                Err(e) => e,
            };

            attempt += 1;
            if !error.is_retryable() || attempt >= self.retry.max_attempts {
                return Err(error);
            }

            let delay = self.retry.delay(attempt - 1);
            warn!("Request to {url} failed ({error}), retrying in {delay:?}");
            sleep(delay).await;
        }
    }

    async fn fetch_once<T: DeserializeOwned>(&self, url: Url) -> ClientResult<T> {
        debug!("GET {url}");

        let response = self.http.get(url).send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        let envelope: ApiResponse<T> =
            serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode {
                status,
                reason: e.to_string(),
            })?;

        envelope.into_result().map_err(|body| ClientError::Api {
            code: body.code,
            message: body.message,
            status,
        })
    }
}
