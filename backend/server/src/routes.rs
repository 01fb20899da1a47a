use std::sync::Arc;

use axum::{
    Json,
    extract::{self, Path, Query},
    http::{
        HeaderValue,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use lgtm::{LgtmOptions, options::DEFAULT_TEXT};
use serde::{Deserialize, Serialize};
use shared::{HealthData, ImageSource, RateLimitInfo, SearchResult, SuccessResponse, now_ms};
use tracing::{debug, warn};

use crate::{
    error::AppError,
    rate_limit::insert_rate_limit_headers,
    state::State,
    validation::{RawSearchParams, validate_search},
};

pub const MAX_TEXT_CHARS: usize = 50;
pub const MAX_OUTPUT_SIDE: u32 = 4000;

/// Validates, spends one unit of the source's quota, then calls the provider.
pub async fn run_search(
    state: &State,
    source: ImageSource,
    raw: &RawSearchParams,
) -> Result<(SearchResult, RateLimitInfo), AppError> {
    let query = validate_search(source, raw)?;

    let decision = state.rate_limiter.check(source);
    if !decision.allowed {
        warn!(%source, reset = decision.info.reset, "Rate limit exceeded");
        return Err(AppError::RateLimited {
            info: Some(decision.info),
        });
    }

    let result = state.providers.search(source, &query).await?;
    debug!(
        %source,
        images = result.images.len(),
        total = result.total_results,
        "Search complete"
    );

    Ok((result, decision.info))
}

pub async fn search_handler(
    extract::State(state): extract::State<Arc<State>>,
    Path(source): Path<String>,
    Query(raw): Query<RawSearchParams>,
) -> Result<Response, AppError> {
    let source: ImageSource = source
        .parse()
        .map_err(|e: shared::ParseError| AppError::InvalidSource(e.0))?;

    let (result, info) = run_search(&state, source, &raw).await?;

    let mut response = Json(SuccessResponse::new(result)).into_response();
    insert_rate_limit_headers(response.headers_mut(), &info);

    Ok(response)
}

pub async fn health_handler(extract::State(state): extract::State<Arc<State>>) -> Response {
    let data = HealthData {
        status: "ok".to_string(),
        timestamp: now_ms(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.started_at.elapsed().as_millis() as u64,
    };

    let mut response = Json(SuccessResponse::new(data)).into_response();
    response.headers_mut().insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );

    response
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LgtmParams {
    pub url: Option<String>,
    pub text: Option<String>,
    pub font_size: Option<String>,
    pub max_width: Option<String>,
    pub max_height: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LgtmData {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_side(raw: Option<&str>, default: u32, name: &str) -> Result<u32, AppError> {
    let Some(raw) = raw else { return Ok(default) };

    match raw.parse::<u32>() {
        Ok(side) if (1..=MAX_OUTPUT_SIDE).contains(&side) => Ok(side),
        _ => Err(AppError::Validation(format!(
            "{name}は1から{MAX_OUTPUT_SIDE}の整数で指定してください"
        ))),
    }
}

/// Maps query parameters onto rendering options.
pub fn lgtm_options(params: &LgtmParams) -> Result<LgtmOptions, AppError> {
    let defaults = LgtmOptions::default();

    let text = non_empty(&params.text).unwrap_or(DEFAULT_TEXT);
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(AppError::Validation(format!(
            "テキストは{MAX_TEXT_CHARS}文字以内で入力してください"
        )));
    }

    let font_size = match non_empty(&params.font_size) {
        None => None,
        Some(raw) => match raw.parse::<f32>() {
            Ok(size) if size.is_finite() && size > 0.0 && size <= MAX_OUTPUT_SIDE as f32 => {
                Some(size)
            }
            _ => {
                return Err(AppError::Validation(format!(
                    "フォントサイズは{MAX_OUTPUT_SIDE}以下の正の数で指定してください"
                )));
            }
        },
    };

    Ok(LgtmOptions {
        text: text.to_string(),
        font_size,
        max_width: parse_side(non_empty(&params.max_width), defaults.max_width, "maxWidth")?,
        max_height: parse_side(non_empty(&params.max_height), defaults.max_height, "maxHeight")?,
        ..defaults
    })
}

pub async fn lgtm_handler(
    extract::State(state): extract::State<Arc<State>>,
    Query(params): Query<LgtmParams>,
) -> Result<Response, AppError> {
    let url = non_empty(&params.url)
        .ok_or_else(|| AppError::Missing("画像URLを指定してください".to_string()))?;
    let options = lgtm_options(&params)?;

    let renderer = state.renderer.as_ref().ok_or_else(|| {
        AppError::Unavailable("画像生成は現在利用できません".to_string())
    })?;

    let processed = renderer
        .process_url(&state.images, url, options, state.host_policy())
        .await?;

    if params.format.as_deref() == Some("json") {
        let data = LgtmData {
            data_url: processed.data_url,
            width: processed.width,
            height: processed.height,
        };
        return Ok(Json(SuccessResponse::new(data)).into_response());
    }

    Ok((
        [(CONTENT_TYPE, HeaderValue::from_static("image/png"))],
        processed.png,
    )
        .into_response())
}
