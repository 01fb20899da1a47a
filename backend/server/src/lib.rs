//! LGTM Generator search server.
//!
//!
//!
//! # Routes
//! - `GET /api/search/{source}`: proxied provider search with per-source hourly quotas
//! - `GET /api/health`: liveness, version and uptime
//! - `GET /api/lgtm`: fetches an image and returns it stamped with "LGTM"
//! - `GET /search`: plain HTML search page over the same pipeline
//!
//!
//!
//! # Request Flow
//! - Query parameters are validated before any quota is spent
//! - The rate limiter is consulted before the provider is called
//! - Provider payloads are normalized into [`shared::Image`]
//! - Every JSON response uses the `{ success, data | error, meta }` envelope
//!
//!
//!
//! # Notes
//!
//! ## Quotas
//! Counters live in process memory. A restart resets them and several
//! replicas each get the full quota. A shared store would be needed to
//! enforce one limit across instances.
//!
//! ## Error Details
//! `details` are included in error bodies unless `APP_ENV=production`.
//! The choice is made per request from [`State`], so routers built for
//! different environments can share a process.
//!
//!
//!
//! # Setup
//!
//! Run locally.
//! ```sh
//! RUST_LOG=info cargo run -p lgtm-generator
//! ```
//!
//! Keys are read from the environment, `.env`, or `/run/secrets/<NAME>`.
//! ```sh
//! UNSPLASH_ACCESS_KEY=... PEXELS_API_KEY=... PIXABAY_API_KEY=...
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{self, Request},
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    middleware::{self, Next},
    response::Response,
    routing::get,
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod error;
pub mod pages;
pub mod providers;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod validation;

use config::Config;
use error::with_error_details;
use pages::search_page;
use rate_limit::{X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET};
use routes::{health_handler, lgtm_handler, search_handler};
use state::State;

pub async fn start_server() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = State::new(config)?;

    info!("Starting server...");
    let app = app(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");
    Ok(())
}

pub fn app(state: Arc<State>) -> Router {
    let origin = match state.config.app_url.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(e)) => {
            warn!("Ignoring invalid app url for CORS: {e}");
            AllowOrigin::any()
        }
        None => AllowOrigin::any(),
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .expose_headers([X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/search/{source}", get(search_handler))
        .route("/api/health", get(health_handler))
        .route("/api/lgtm", get(lgtm_handler))
        .route("/search", get(search_page))
        .layer(middleware::from_fn_with_state(state.clone(), error_details))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn error_details(
    extract::State(state): extract::State<Arc<State>>,
    request: Request,
    next: Next,
) -> Response {
    with_error_details(state.expose_error_details(), next.run(request)).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
