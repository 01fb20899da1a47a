use std::{sync::Arc, time::Instant};

use lgtm::{HostPolicy, Renderer, image_client};
use reqwest::Client;
use tracing::{info, warn};

use super::{config::Config, providers::Providers, rate_limit::RateLimiter};

pub struct State {
    pub config: Config,
    pub rate_limiter: RateLimiter,
    pub providers: Providers,
    /// Image fetches for `/api/lgtm`. Does not follow redirects on its own.
    pub images: Client,
    /// `None` when no usable font was found; `/api/lgtm` then answers 503.
    pub renderer: Option<Renderer>,
    pub started_at: Instant,
}

impl State {
    pub fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let user_agent = concat!("lgtm-generator/", env!("CARGO_PKG_VERSION"));
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(user_agent)
            .build()?;
        let images = image_client(config.request_timeout, user_agent)?;

        let renderer = match Renderer::load(config.font_path.as_deref()) {
            Ok(renderer) => {
                info!("Font loaded");
                Some(renderer)
            }
            Err(e) => {
                warn!("LGTM rendering disabled: {e}");
                None
            }
        };

        Ok(Arc::new(Self {
            rate_limiter: RateLimiter::from_config(&config),
            providers: Providers::new(http, &config),
            images,
            renderer,
            started_at: Instant::now(),
            config,
        }))
    }

    pub fn expose_error_details(&self) -> bool {
        !self.config.app_env.is_production()
    }

    pub fn host_policy(&self) -> HostPolicy {
        if self.config.allow_private_hosts {
            HostPolicy::AllowPrivate
        } else {
            HostPolicy::PublicOnly
        }
    }
}
