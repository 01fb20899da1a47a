use reqwest::Client;
use serde::Deserialize;
use shared::{Image, ImageSource, ImageType, SearchResult, now_ms};

use super::{api_key, fetch_json, total_pages};
use crate::{config::ProviderConfig, error::AppError, validation::SearchQuery};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub total: u64,
    pub total_hits: u64,
    pub hits: Vec<Hit>,
}

#[derive(Deserialize)]
pub struct Hit {
    pub id: u64,
    #[serde(rename = "pageURL")]
    pub page_url: String,
    #[serde(rename = "largeImageURL")]
    pub large_image_url: String,
    #[serde(rename = "webformatURL")]
    pub webformat_url: String,
    #[serde(rename = "imageWidth")]
    pub image_width: u32,
    #[serde(rename = "imageHeight")]
    pub image_height: u32,
    pub user: String,
    pub user_id: u64,
    #[serde(default)]
    pub tags: String,
}

impl From<Hit> for Image {
    fn from(hit: Hit) -> Self {
        Image {
            id: format!("pixabay_{}", hit.id),
            url: hit.large_image_url,
            thumbnail_url: hit.webformat_url,
            width: hit.image_width,
            height: hit.image_height,
            photographer_url: Some(format!(
                "https://pixabay.com/users/{}-{}/",
                hit.user, hit.user_id
            )),
            photographer: hit.user,
            source: ImageSource::Pixabay,
            source_url: hit.page_url,
            alt: None,
            tags: Some(
                hit.tags
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(String::from)
                    .collect(),
            ),
        }
    }
}

pub async fn search(
    http: &Client,
    config: &ProviderConfig,
    query: &SearchQuery,
) -> Result<SearchResult, AppError> {
    let key = api_key(config, ImageSource::Pixabay)?;

    let mut params = vec![
        ("key", key.to_string()),
        ("q", query.query.clone()),
        ("page", query.page.to_string()),
        ("per_page", query.per_page.to_string()),
    ];
    if query.image_type != ImageType::All {
        params.push(("image_type", query.image_type.to_string()));
    }

    let request = http.get(format!("{}/", config.base_url)).query(&params);

    let data: SearchResponse = fetch_json(request, ImageSource::Pixabay).await?;

    Ok(SearchResult {
        query: query.query.clone(),
        source: ImageSource::Pixabay,
        images: data.hits.into_iter().map(Image::from).collect(),
        total_results: data.total_hits,
        page: query.page,
        per_page: query.per_page,
        total_pages: total_pages(data.total_hits, query.per_page),
        timestamp: now_ms(),
    })
}
