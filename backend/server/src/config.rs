use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr, time::Duration};

use shared::ImageSource;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
#[error("Invalid {key} value {value:?}: {reason}")]
pub struct ConfigError {
    pub key: String,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Test,
    Production,
}

impl AppEnv {
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

impl FromStr for AppEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Requests allowed per hour.
    pub rate_limit: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub app_env: AppEnv,
    pub app_url: Option<String>,
    pub unsplash: ProviderConfig,
    pub pexels: ProviderConfig,
    pub pixabay: ProviderConfig,
    pub font_path: Option<PathBuf>,
    pub allow_private_hosts: bool,
    pub request_timeout: Duration,
}

pub const UNSPLASH_API_URL: &str = "https://api.unsplash.com";
pub const PEXELS_API_URL: &str = "https://api.pexels.com/v1";
pub const PIXABAY_API_URL: &str = "https://pixabay.com/api";

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            app_env: AppEnv::Development,
            app_url: None,
            unsplash: ProviderConfig {
                api_key: None,
                base_url: UNSPLASH_API_URL.to_string(),
                rate_limit: 50,
            },
            pexels: ProviderConfig {
                api_key: None,
                base_url: PEXELS_API_URL.to_string(),
                rate_limit: 200,
            },
            pixabay: ProviderConfig {
                api_key: None,
                base_url: PIXABAY_API_URL.to_string(),
                rate_limit: 5000,
            },
            font_path: None,
            allow_private_hosts: false,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            port: try_load("PORT", "3000")?,
            app_env: try_load("APP_ENV", "development")?,
            app_url: var("NEXT_PUBLIC_APP_URL"),
            unsplash: load_provider("UNSPLASH", "UNSPLASH_ACCESS_KEY", &defaults.unsplash)?,
            pexels: load_provider("PEXELS", "PEXELS_API_KEY", &defaults.pexels)?,
            pixabay: load_provider("PIXABAY", "PIXABAY_API_KEY", &defaults.pixabay)?,
            font_path: var("LGTM_FONT_PATH").map(PathBuf::from),
            allow_private_hosts: try_load("LGTM_ALLOW_PRIVATE_HOSTS", "false")?,
            request_timeout: Duration::from_secs(try_load("REQUEST_TIMEOUT_SECS", "10")?),
        })
    }

    pub fn provider(&self, source: ImageSource) -> &ProviderConfig {
        match source {
            ImageSource::Unsplash => &self.unsplash,
            ImageSource::Pexels => &self.pexels,
            ImageSource::Pixabay => &self.pixabay,
        }
    }
}

fn load_provider(
    prefix: &str,
    key_name: &str,
    defaults: &ProviderConfig,
) -> Result<ProviderConfig, ConfigError> {
    let api_key = read_secret(key_name);
    if api_key.is_none() {
        warn!("{key_name} not configured, {prefix} searches will fail");
    }

    let base_url = var(&format!("{prefix}_API_URL")).unwrap_or_else(|| defaults.base_url.clone());

    Ok(ProviderConfig {
        api_key,
        base_url: base_url.trim_end_matches('/').to_string(),
        rate_limit: try_load(
            &format!("{prefix}_RATE_LIMIT"),
            &defaults.rate_limit.to_string(),
        )?,
    })
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = var(key).unwrap_or_else(|| {
        debug!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| ConfigError {
        key: key.to_string(),
        value: value.clone(),
        reason: e.to_string(),
    })
}

/// Environment first, then a Docker secret file.
fn read_secret(secret_name: &str) -> Option<String> {
    if let Some(value) = var(secret_name) {
        return Some(value);
    }

    let path = format!("/run/secrets/{secret_name}");
    match read_to_string(&path) {
        Ok(s) if !s.trim().is_empty() => {
            info!("Read {secret_name} from {path}");
            Some(s.trim().to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_provider_quotas() {
        let config = Config::default();
        assert_eq!(config.provider(ImageSource::Unsplash).rate_limit, 50);
        assert_eq!(config.provider(ImageSource::Pexels).rate_limit, 200);
        assert_eq!(config.provider(ImageSource::Pixabay).rate_limit, 5000);
        assert!(!config.allow_private_hosts);
    }

    #[test]
    fn app_env_parsing() {
        assert_eq!("production".parse::<AppEnv>(), Ok(AppEnv::Production));
        assert_eq!("DEV".parse::<AppEnv>(), Ok(AppEnv::Development));
        assert!("staging".parse::<AppEnv>().is_err());
        assert!(AppEnv::Production.is_production());
        assert!(!AppEnv::Test.is_production());
    }

    #[test]
    fn invalid_values_are_errors() {
        // Key chosen so no real environment sets it.
        let err = try_load::<u16>("LGTM_TEST_UNSET_PORT_KEY", "not-a-port").unwrap_err();
        assert_eq!(err.key, "LGTM_TEST_UNSET_PORT_KEY");
        assert_eq!(err.value, "not-a-port");
    }
}
