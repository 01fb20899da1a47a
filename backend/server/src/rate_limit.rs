//! # Rate Limiting
//!
//! Per-provider hourly quotas, held in process memory.
//!
//! - One counter per source, created on first use with the full quota.
//! - Every allowed request takes one unit; at zero, requests are rejected
//!   without touching the counter.
//! - Once `reset` has passed, the next request starts a fresh window of one
//!   hour from that moment.
//!
//! Counters are not shared between processes and vanish on restart. Running
//! several instances multiplies the effective quota.

use std::{collections::HashMap, sync::Mutex};

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use shared::{ImageSource, RateLimitInfo, now_ms};

use crate::config::Config;

pub const WINDOW_MS: i64 = 60 * 60 * 1000;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub info: RateLimitInfo,
}

pub struct RateLimiter {
    limits: HashMap<ImageSource, u32>,
    store: Mutex<HashMap<ImageSource, RateLimitInfo>>,
}

impl RateLimiter {
    pub fn new(limits: HashMap<ImageSource, u32>) -> Self {
        Self {
            limits,
            store: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ImageSource::ALL
                .into_iter()
                .map(|source| (source, config.provider(source).rate_limit))
                .collect(),
        )
    }

    pub fn limit(&self, source: ImageSource) -> u32 {
        self.limits.get(&source).copied().unwrap_or(0)
    }

    pub fn check(&self, source: ImageSource) -> RateLimitDecision {
        self.check_at(source, now_ms())
    }

    pub fn check_at(&self, source: ImageSource, now: i64) -> RateLimitDecision {
        let limit = self.limit(source);
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());

        let info = store.entry(source).or_insert(RateLimitInfo {
            limit,
            remaining: limit,
            reset: now + WINDOW_MS,
        });

        if now >= info.reset {
            *info = RateLimitInfo {
                limit,
                remaining: limit,
                reset: now + WINDOW_MS,
            };
        }

        let allowed = info.remaining > 0;
        if allowed {
            info.remaining -= 1;
        }

        RateLimitDecision {
            allowed,
            info: *info,
        }
    }
}

/// Whole seconds until `reset`, rounded up, never negative.
pub fn retry_after_secs(reset: i64) -> i64 {
    retry_after_secs_at(reset, now_ms())
}

pub fn retry_after_secs_at(reset: i64, now: i64) -> i64 {
    let remaining_ms = (reset - now).max(0);
    (remaining_ms + 999) / 1000
}

/// `X-RateLimit-*` headers, with the reset in epoch seconds.
pub fn insert_rate_limit_headers(headers: &mut HeaderMap, info: &RateLimitInfo) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(info.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(info.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(info.reset / 1000));
}
