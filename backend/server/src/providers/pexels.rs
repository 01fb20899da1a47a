use reqwest::Client;
use serde::Deserialize;
use shared::{Image, ImageSource, SearchResult, now_ms};

use super::{api_key, fetch_json, total_pages};
use crate::{config::ProviderConfig, error::AppError, validation::SearchQuery};

#[derive(Deserialize)]
pub struct SearchResponse {
    pub total_results: u64,
    pub photos: Vec<Photo>,
}

#[derive(Deserialize)]
pub struct Photo {
    pub id: u64,
    pub src: Src,
    pub width: u32,
    pub height: u32,
    pub photographer: String,
    pub photographer_url: String,
    pub url: String,
    #[serde(default)]
    pub alt: String,
}

#[derive(Deserialize)]
pub struct Src {
    pub large: String,
    pub medium: String,
}

impl From<Photo> for Image {
    fn from(photo: Photo) -> Self {
        Image {
            id: format!("pexels_{}", photo.id),
            url: photo.src.large,
            thumbnail_url: photo.src.medium,
            width: photo.width,
            height: photo.height,
            photographer: photo.photographer,
            photographer_url: Some(photo.photographer_url),
            source: ImageSource::Pexels,
            source_url: photo.url,
            alt: Some(photo.alt).filter(|alt| !alt.is_empty()),
            tags: None,
        }
    }
}

pub async fn search(
    http: &Client,
    config: &ProviderConfig,
    query: &SearchQuery,
) -> Result<SearchResult, AppError> {
    let key = api_key(config, ImageSource::Pexels)?;

    let page = query.page.to_string();
    let per_page = query.per_page.to_string();

    let request = http
        .get(format!("{}/search", config.base_url))
        .query(&[
            ("query", query.query.as_str()),
            ("page", page.as_str()),
            ("per_page", per_page.as_str()),
        ])
        .header("Authorization", key);

    let data: SearchResponse = fetch_json(request, ImageSource::Pexels).await?;

    Ok(SearchResult {
        query: query.query.clone(),
        source: ImageSource::Pexels,
        images: data.photos.into_iter().map(Image::from).collect(),
        total_results: data.total_results,
        page: query.page,
        per_page: query.per_page,
        total_pages: total_pages(data.total_results, query.per_page),
        timestamp: now_ms(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_photo() {
        let photo: Photo = serde_json::from_value(serde_json::json!({
            "id": 42,
            "src": {
                "original": "https://images.pexels.com/original",
                "large2x": "https://images.pexels.com/large2x",
                "large": "https://images.pexels.com/large",
                "medium": "https://images.pexels.com/medium",
                "small": "https://images.pexels.com/small"
            },
            "width": 1200,
            "height": 800,
            "photographer": "Kim",
            "photographer_url": "https://www.pexels.com/@kim",
            "url": "https://www.pexels.com/photo/42",
            "alt": "A dog"
        }))
        .unwrap();

        let image = Image::from(photo);
        assert_eq!(image.id, "pexels_42");
        assert_eq!(image.url, "https://images.pexels.com/large");
        assert_eq!(image.thumbnail_url, "https://images.pexels.com/medium");
        assert_eq!(image.alt.as_deref(), Some("A dog"));
        assert_eq!(image.tags, None);
    }
}
