use std::{
    net::{IpAddr, Ipv4Addr},
    time::Duration,
};

use image::DynamicImage;
use reqwest::{
    Client, Response,
    header::{ACCEPT, CONTENT_LENGTH, LOCATION},
    redirect::Policy,
};
use tokio::{net::lookup_host, task::spawn_blocking};
use tracing::debug;
use url::Url;

use crate::error::{ProcessError, ProcessResult};

pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;
pub const MAX_REDIRECTS: usize = 5;

/// Which hosts a fetch may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostPolicy {
    #[default]
    PublicOnly,
    AllowPrivate,
}

/// Client for image fetches. Redirects are left to [`fetch_bytes`] so every
/// hop is checked against the host policy.
pub fn image_client(timeout: Duration, user_agent: &str) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .redirect(Policy::none())
        .build()
}

fn is_forbidden_v4(v4: Ipv4Addr) -> bool {
    v4.is_private()
        || v4.is_loopback()
        || v4.is_link_local()
        || v4.is_broadcast()
        || v4.is_documentation()
        || v4.is_unspecified()
        || v4.is_multicast()
        // 0.0.0.0/8
        || v4.octets()[0] == 0
}

fn is_forbidden_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_forbidden_v4(v4),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unicast_link_local()
                || v6.is_unique_local()
                || v6.is_unspecified()
                || v6.is_multicast()
                // ::ffff:a.b.c.d and ::a.b.c.d reach the embedded IPv4 host
                || v6.to_ipv4().is_some_and(is_forbidden_v4)
        }
    }
}

pub fn parse_image_url(raw: &str) -> ProcessResult<Url> {
    let url = Url::parse(raw).map_err(|e| ProcessError::load(raw, e))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ProcessError::load(raw, "only http(s) urls are allowed")),
    }
}

pub async fn validate_host(url: &Url, policy: HostPolicy) -> ProcessResult<()> {
    if policy == HostPolicy::AllowPrivate {
        return Ok(());
    }

    let host = url
        .host_str()
        .ok_or_else(|| ProcessError::ForbiddenHost(url.to_string()))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    if host.eq_ignore_ascii_case("localhost") {
        return Err(ProcessError::ForbiddenHost(host.to_string()));
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_forbidden_ip(ip) {
            return Err(ProcessError::ForbiddenHost(host.to_string()));
        }
        return Ok(());
    }

    let port = url.port_or_known_default().unwrap_or(443);
    let addrs: Vec<IpAddr> = lookup_host((host, port))
        .await
        .map_err(|e| ProcessError::load(url.as_str(), format!("dns lookup failed: {e}")))?
        .map(|a| a.ip())
        .collect();

    if addrs.is_empty() {
        return Err(ProcessError::load(url.as_str(), "dns lookup failed"));
    }
    if addrs.into_iter().any(is_forbidden_ip) {
        return Err(ProcessError::ForbiddenHost(host.to_string()));
    }

    Ok(())
}

/// Sends the request, following up to [`MAX_REDIRECTS`] redirects and
/// checking each target against `policy`. `url` itself is assumed checked.
async fn send(client: &Client, url: &Url, policy: HostPolicy) -> ProcessResult<(Url, Response)> {
    let mut url = url.clone();

    for hop in 0..=MAX_REDIRECTS {
        let response = client
            .get(url.clone())
            .header(ACCEPT, "image/*")
            .send()
            .await
            .map_err(|e| ProcessError::load(url.as_str(), e))?;

        // clients that follow redirects themselves only show the final url
        if response.url() != &url {
            validate_host(response.url(), policy).await?;
        }

        if !response.status().is_redirection() || hop == MAX_REDIRECTS {
            return Ok((url, response));
        }

        let next = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ProcessError::load(url.as_str(), format!("http {} without location", response.status()))
            })?;
        let next = url
            .join(next)
            .map_err(|e| ProcessError::load(url.as_str(), e))
            .and_then(|next| parse_image_url(next.as_str()))?;

        validate_host(&next, policy).await?;
        debug!("Following redirect {url} -> {next}");
        url = next;
    }

    Err(ProcessError::load(url.as_str(), "too many redirects"))
}

/// Downloads the body of `url`, refusing anything above [`MAX_IMAGE_BYTES`].
pub async fn fetch_bytes(client: &Client, url: &Url, policy: HostPolicy) -> ProcessResult<Vec<u8>> {
    let (url, mut response) = send(client, url, policy).await?;

    if response.status().is_redirection() {
        return Err(ProcessError::load(url.as_str(), "too many redirects"));
    }
    if !response.status().is_success() {
        return Err(ProcessError::load(
            url.as_str(),
            format!("http {}", response.status()),
        ));
    }

    let declared = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > MAX_IMAGE_BYTES) {
        return Err(ProcessError::TooLarge {
            limit: MAX_IMAGE_BYTES,
        });
    }

    let mut buf = Vec::with_capacity(declared.unwrap_or(0));
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ProcessError::load(url.as_str(), e))?
    {
        if buf.len() + chunk.len() > MAX_IMAGE_BYTES {
            return Err(ProcessError::TooLarge {
                limit: MAX_IMAGE_BYTES,
            });
        }
        buf.extend_from_slice(&chunk);
    }

    debug!("Fetched {} bytes from {url}", buf.len());
    Ok(buf)
}

/// Fetches `raw_url` and decodes it on the blocking pool.
pub async fn load_image(client: &Client, raw_url: &str, policy: HostPolicy) -> ProcessResult<DynamicImage> {
    let url = parse_image_url(raw_url)?;
    validate_host(&url, policy).await?;

    let bytes = fetch_bytes(client, &url, policy).await?;

    spawn_blocking(move || image::load_from_memory(&bytes))
        .await
        .map_err(|e| ProcessError::Task(e.to_string()))?
        .map_err(ProcessError::from)
}
