use std::fmt;

use serde::{Deserialize, Serialize};

use crate::now_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ApiRateLimit,
    ApiError,
    NetworkError,
    GenerationError,
    ValidationError,
    MissingQuery,
    InvalidSource,
    RateLimitExceeded,
    ExternalApiError,
    InternalServerError,
    ServiceUnavailable,
}

impl ErrorCode {
    /// HTTP status paired with each code.
    pub fn status(self) -> u16 {
        match self {
            Self::ValidationError | Self::MissingQuery | Self::InvalidSource => 400,
            Self::RateLimitExceeded | Self::ApiRateLimit => 429,
            Self::ExternalApiError | Self::NetworkError | Self::ApiError => 502,
            Self::ServiceUnavailable => 503,
            Self::InternalServerError | Self::GenerationError => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ApiRateLimit => "API_RATE_LIMIT",
            Self::ApiError => "API_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::GenerationError => "GENERATION_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::MissingQuery => "MISSING_QUERY",
            Self::InvalidSource => "INVALID_SOURCE",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::ExternalApiError => "EXTERNAL_API_ERROR",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        };
        f.write_str(name)
    }
}

/// Quota state for one provider. `reset` is epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    pub reset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub timestamp: i64,
}

impl Meta {
    pub fn now() -> Self {
        Self {
            timestamp: now_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
    pub meta: Meta,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: Meta::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
    pub meta: Meta,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                code,
                message: message.into(),
                details: None,
            },
            meta: Meta::now(),
        }
    }

    pub fn with_details(mut self, details: Option<serde_json::Value>) -> Self {
        self.error.details = details;
        self
    }
}

/// Either side of the envelope, as read by clients.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorBody>,
    pub meta: Option<Meta>,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self) -> Result<T, ErrorBody> {
        match (self.success, self.data, self.error) {
            (true, Some(data), _) => Ok(data),
            (_, _, Some(error)) => Err(error),
            _ => Err(ErrorBody {
                code: ErrorCode::InternalServerError,
                message: "malformed response envelope".to_string(),
                details: None,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthData {
    pub status: String,
    pub timestamp: i64,
    pub version: String,
    pub uptime: u64,
}
