use std::future::Future;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use lgtm::ProcessError;
use serde_json::json;
use shared::{ErrorCode, ErrorResponse, RateLimitInfo};
use thiserror::Error;

use crate::rate_limit::{insert_rate_limit_headers, retry_after_secs};

pub const RATE_LIMIT_MESSAGE: &str =
    "検索回数の上限に達しました。しばらく経ってから再度お試しください。";

tokio::task_local! {
    static EXPOSE_DETAILS: bool;
}

/// Runs `f` with error details shown or hidden in any [`AppError`] response
/// it produces. Outside such a scope details are shown.
pub async fn with_error_details<F: Future>(expose: bool, f: F) -> F::Output {
    EXPOSE_DETAILS.scope(expose, f).await
}

fn expose_details() -> bool {
    EXPOSE_DETAILS.try_with(|expose| *expose).unwrap_or(true)
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    /// A required parameter was absent.
    #[error("{0}")]
    Missing(String),

    #[error("無効な検索ソースです: {0}")]
    InvalidSource(String),

    /// `info` is set when our own quota rejected the request.
    #[error("{}", RATE_LIMIT_MESSAGE)]
    RateLimited { info: Option<RateLimitInfo> },

    #[error("{message}")]
    ExternalApi { status: u16, message: String },

    #[error("ネットワークエラーが発生しました")]
    Network(String),

    #[error("画像の生成に失敗しました")]
    Generation(String),

    #[error("{0}")]
    Unavailable(String),

    /// Message shown as-is, e.g. a missing API key.
    #[error("{0}")]
    Misconfigured(String),

    #[error("サーバーエラーが発生しました")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::ValidationError,
            AppError::Missing(_) => ErrorCode::MissingQuery,
            AppError::InvalidSource(_) => ErrorCode::InvalidSource,
            AppError::RateLimited { .. } => ErrorCode::RateLimitExceeded,
            AppError::ExternalApi { .. } => ErrorCode::ExternalApiError,
            AppError::Network(_) => ErrorCode::NetworkError,
            AppError::Generation(_) => ErrorCode::GenerationError,
            AppError::Unavailable(_) => ErrorCode::ServiceUnavailable,
            AppError::Misconfigured(_) | AppError::Internal(_) => ErrorCode::InternalServerError,
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code().status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::ExternalApi { status, .. } => Some(json!({ "upstreamStatus": status })),
            AppError::Network(reason)
            | AppError::Generation(reason)
            | AppError::Internal(reason) => Some(json!(reason)),
            _ => None,
        }
    }

    pub fn to_response(&self, expose_details: bool) -> Response {
        let details = expose_details.then(|| self.details()).flatten();
        let body = ErrorResponse::new(self.code(), self.to_string()).with_details(details);

        let mut response = (self.status(), Json(body)).into_response();

        if let AppError::RateLimited { info: Some(info) } = self {
            let headers = response.headers_mut();
            insert_rate_limit_headers(headers, info);
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs(info.reset).to_string()) {
                headers.insert(RETRY_AFTER, value);
            }
        }

        response
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::error!(code = %self.code(), "{self}: {:?}", self.details());
        }

        self.to_response(expose_details())
    }
}

impl From<ProcessError> for AppError {
    fn from(error: ProcessError) -> Self {
        match error {
            ProcessError::ForbiddenHost(host) => {
                AppError::Validation(format!("この画像URLは使用できません: {host}"))
            }
            ProcessError::TooLarge { .. } => {
                AppError::Validation("画像サイズが大きすぎます".to_string())
            }
            ProcessError::Decode(e) => {
                AppError::Validation(format!("画像を読み込めませんでした: {e}"))
            }
            ProcessError::Load { url, reason } => {
                AppError::Network(format!("Failed to load image from URL: {url} ({reason})"))
            }
            other => AppError::Generation(other.to_string()),
        }
    }
}
