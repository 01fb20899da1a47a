use reqwest::Client;
use serde::Deserialize;
use shared::{Image, ImageSource, SearchResult, now_ms};

use super::{api_key, fetch_json};
use crate::{config::ProviderConfig, error::AppError, validation::SearchQuery};

#[derive(Deserialize)]
pub struct SearchResponse {
    pub total: u64,
    pub total_pages: u32,
    pub results: Vec<Photo>,
}

#[derive(Deserialize)]
pub struct Photo {
    pub id: String,
    pub urls: Urls,
    pub width: u32,
    pub height: u32,
    pub user: User,
    pub links: Links,
    pub alt_description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<Tag>>,
}

#[derive(Deserialize)]
pub struct Urls {
    pub regular: String,
    pub small: String,
}

#[derive(Deserialize)]
pub struct User {
    pub name: String,
    pub links: Links,
}

#[derive(Deserialize)]
pub struct Links {
    pub html: String,
}

#[derive(Deserialize)]
pub struct Tag {
    pub title: String,
}

impl From<Photo> for Image {
    fn from(photo: Photo) -> Self {
        Image {
            id: format!("unsplash_{}", photo.id),
            url: photo.urls.regular,
            thumbnail_url: photo.urls.small,
            width: photo.width,
            height: photo.height,
            photographer: photo.user.name,
            photographer_url: Some(photo.user.links.html),
            source: ImageSource::Unsplash,
            source_url: photo.links.html,
            alt: photo.alt_description.filter(|alt| !alt.is_empty()),
            tags: photo
                .tags
                .map(|tags| tags.into_iter().map(|tag| tag.title).collect()),
        }
    }
}

pub async fn search(
    http: &Client,
    config: &ProviderConfig,
    query: &SearchQuery,
) -> Result<SearchResult, AppError> {
    let key = api_key(config, ImageSource::Unsplash)?;

    let page = query.page.to_string();
    let per_page = query.per_page.to_string();

    let request = http
        .get(format!("{}/search/photos", config.base_url))
        .query(&[
            ("query", query.query.as_str()),
            ("page", page.as_str()),
            ("per_page", per_page.as_str()),
        ])
        .header("Authorization", format!("Client-ID {key}"))
        .header("Accept-Version", "v1");

    let data: SearchResponse = fetch_json(request, ImageSource::Unsplash).await?;

    Ok(SearchResult {
        query: query.query.clone(),
        source: ImageSource::Unsplash,
        images: data.results.into_iter().map(Image::from).collect(),
        total_results: data.total,
        page: query.page,
        per_page: query.per_page,
        total_pages: data.total_pages,
        timestamp: now_ms(),
    })
}
