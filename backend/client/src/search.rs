use std::time::Duration;

use shared::{ImageSource, SearchResult};
use tracing::{debug, warn};

use crate::{
    api::{ApiClient, SearchParams},
    cache::Cache,
    error::ClientResult,
};

pub const MIN_QUERY_CHARS: usize = 2;
pub const DEDUPE_WINDOW: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Search front end: skips short queries and reuses identical requests
/// for five minutes.
pub struct Searcher {
    api: ApiClient,
    cache: Option<Cache>,
}

impl Searcher {
    pub fn new(api: ApiClient, cache: Option<Cache>) -> Self {
        Self { api, cache }
    }

    /// Request identity: source, query, page, perPage and the Pixabay filter.
    pub fn cache_key(source: ImageSource, params: &SearchParams) -> String {
        let mut key = format!(
            "/search/{source}?query={}&page={}&perPage={}",
            params.query,
            params.page.unwrap_or(DEFAULT_PAGE),
            params.per_page.unwrap_or(DEFAULT_PER_PAGE)
        );
        if let Some(image_type) = params.image_type {
            key.push_str(&format!("&imageType={image_type}"));
        }
        key
    }

    /// `Ok(None)` when the query is too short to search.
    pub async fn search(
        &self,
        source: ImageSource,
        params: &SearchParams,
    ) -> ClientResult<Option<SearchResult>> {
        if params.query.trim().chars().count() < MIN_QUERY_CHARS {
            return Ok(None);
        }

        let key = Self::cache_key(source, params);

        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get::<SearchResult>(&key)) {
            debug!("Cache hit for {key}");
            return Ok(Some(cached));
        }

        let result = self.api.search_images(source, params).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&key, &result, DEDUPE_WINDOW.as_secs()) {
                warn!("Failed to cache search result: {e}");
            }
        }

        Ok(Some(result))
    }
}
