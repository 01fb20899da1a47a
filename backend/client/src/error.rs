use std::io;

use lgtm::ProcessError;
use shared::ErrorCode;
use thiserror::Error;

pub const CLIPBOARD_COPY_FAILED: &str = "クリップボードへのコピーに失敗しました";
pub const MARKDOWN_COPY_FAILED: &str = "マークダウンのコピーに失敗しました";
pub const DOWNLOAD_FAILED: &str = "画像のダウンロードに失敗しました";
pub const GENERATION_FAILED: &str = "画像の生成に失敗しました";

#[derive(Error, Debug)]
pub enum ClientError {
    /// Error envelope returned by the server.
    #[error("{message}")]
    Api {
        code: ErrorCode,
        message: String,
        status: u16,
    },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response ({status}): {reason}")]
    Decode { status: u16, reason: String },

    #[error("Invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("{0}")]
    Clipboard(&'static str),

    #[error("{}", DOWNLOAD_FAILED)]
    Download(#[source] ProcessError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("No processed image available")]
    NotReady,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ClientError {
    /// 4xx answers are final; everything else may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Api { status, .. } | ClientError::Decode { status, .. } => {
                !(400..500).contains(status)
            }
            ClientError::Http(_) => true,
            _ => false,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_not_retried() {
        let bad_request = ClientError::Api {
            code: ErrorCode::ValidationError,
            message: "検索キーワードは2文字以上で入力してください".into(),
            status: 400,
        };
        assert!(!bad_request.is_retryable());

        let rate_limited = ClientError::Api {
            code: ErrorCode::RateLimitExceeded,
            message: "limit".into(),
            status: 429,
        };
        assert!(!rate_limited.is_retryable());

        let upstream = ClientError::Api {
            code: ErrorCode::ExternalApiError,
            message: "Unsplash API error: Bad Gateway".into(),
            status: 502,
        };
        assert!(upstream.is_retryable());
        assert_eq!(upstream.to_string(), "Unsplash API error: Bad Gateway");
    }

    #[test]
    fn download_failure_message() {
        let err = ClientError::Download(ProcessError::Encode("bad name".into()));
        assert_eq!(err.to_string(), DOWNLOAD_FAILED);
    }
}
