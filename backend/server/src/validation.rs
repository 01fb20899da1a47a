use serde::Deserialize;
use shared::{ImageSource, ImageType};

use crate::error::AppError;

pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_QUERY_CHARS: usize = 100;
pub const MIN_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 30;
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Query string as received; every field is optional text until validated.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSearchParams {
    pub query: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub image_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub page: u32,
    pub per_page: u32,
    /// Always `All` for sources other than Pixabay.
    pub image_type: ImageType,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn validate_query(raw: &str) -> Result<String, AppError> {
    let query = raw.trim();
    let chars = query.chars().count();

    if chars < MIN_QUERY_CHARS {
        return Err(AppError::Validation(
            "検索キーワードは2文字以上で入力してください".to_string(),
        ));
    }
    if chars > MAX_QUERY_CHARS {
        return Err(AppError::Validation(
            "検索キーワードは100文字以内で入力してください".to_string(),
        ));
    }

    Ok(query.to_string())
}

fn validate_page(raw: Option<&str>) -> Result<u32, AppError> {
    let Some(raw) = raw else { return Ok(1) };

    match raw.parse::<u32>() {
        Ok(page) if page >= 1 => Ok(page),
        _ => Err(AppError::Validation(
            "ページ番号は1以上の整数で指定してください".to_string(),
        )),
    }
}

fn validate_per_page(raw: Option<&str>) -> Result<u32, AppError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_PER_PAGE);
    };

    match raw.parse::<u32>() {
        Ok(n) if (MIN_PER_PAGE..=MAX_PER_PAGE).contains(&n) => Ok(n),
        _ => Err(AppError::Validation(
            "1ページあたりの件数は10から30の範囲で指定してください".to_string(),
        )),
    }
}

fn validate_image_type(raw: Option<&str>) -> Result<ImageType, AppError> {
    let Some(raw) = raw else {
        return Ok(ImageType::All);
    };

    raw.parse().map_err(|_| {
        AppError::Validation(
            "画像タイプは photo, illustration, vector, all のいずれかを指定してください"
                .to_string(),
        )
    })
}

pub fn validate_search(
    source: ImageSource,
    raw: &RawSearchParams,
) -> Result<SearchQuery, AppError> {
    let query = validate_query(raw.query.as_deref().unwrap_or_default())?;
    let page = validate_page(present(&raw.page))?;
    let per_page = validate_per_page(present(&raw.per_page))?;

    let image_type = match source {
        ImageSource::Pixabay => validate_image_type(present(&raw.image_type))?,
        _ => ImageType::All,
    };

    Ok(SearchQuery {
        query,
        page,
        per_page,
        image_type,
    })
}
