//! # Shared Types
//!
//! Wire structures exchanged between the search server and its clients.
//!
//! ## Envelope
//!
//! Every API response is wrapped in an envelope:
//! - success: `{ "success": true, "data": ..., "meta": { "timestamp": ms } }`
//! - failure: `{ "success": false, "error": { "code", "message", "details"? }, "meta": ... }`
//!
//! Field names are camelCase on the wire, sources are lowercase, error codes
//! are SCREAMING_SNAKE_CASE.

pub mod api;
pub mod images;

pub use api::{
    ApiResponse, ErrorBody, ErrorCode, ErrorResponse, HealthData, Meta, RateLimitInfo,
    SuccessResponse,
};
pub use images::{Image, ImageSource, ImageType, ParseError, SearchResult};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
