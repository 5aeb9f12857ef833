use tracing::{debug, info, warn};

use crate::{
    error::{RequestError, TransportError},
    model::{ApiKey, ZipCode},
    transport::{HttpsTransport, Transport, TrustAnchor},
};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_URL_CAPACITY: usize = 512;

/// Fixed unit system requested from the provider.
const UNITS: &str = "imperial";

const HTTP_OK: u16 = 200;
const HTTP_MOVED_PERMANENTLY: u16 = 301;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    pub base_url: String,
    /// Upper bound on the request URL length, in bytes.
    pub url_capacity: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_string(), url_capacity: DEFAULT_URL_CAPACITY }
    }
}

/// Performs the authenticated current-weather request and hands back the raw body.
#[derive(Debug, Clone)]
pub struct Fetcher<T = HttpsTransport> {
    config: FetcherConfig,
    transport: T,
}

impl Fetcher<HttpsTransport> {
    pub fn new(config: FetcherConfig, anchor: &TrustAnchor) -> Result<Self, TransportError> {
        Ok(Self::with_transport(config, HttpsTransport::new(anchor)?))
    }
}

impl<T: Transport> Fetcher<T> {
    pub fn with_transport(config: FetcherConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build the request URL, refusing anything longer than the configured capacity.
    pub fn request_url(&self, zip: ZipCode, key: &ApiKey) -> Result<String, RequestError> {
        let base = self.config.base_url.trim_end_matches('/');
        let url = format!("{base}/weather?zip={zip},us&units={UNITS}&appid={}", key.as_str());

        if url.len() > self.config.url_capacity {
            return Err(RequestError::UrlTooLong {
                len: url.len(),
                capacity: self.config.url_capacity,
            });
        }
        Ok(url)
    }

    /// One GET for `zip`. 200 and 301 both count as success; a 301 body is
    /// returned as-is without following the redirect.
    pub async fn fetch(&self, zip: ZipCode, key: &ApiKey) -> Result<String, TransportError> {
        let url = self.request_url(zip, key)?;
        let shown = redact(&url);
        debug!(url = %shown, "requesting current weather");

        let reply = self.transport.get(&url).await.inspect_err(|e| {
            warn!(url = %shown, error = %e, "weather request failed");
        })?;

        info!(url = %shown, status = reply.status, "weather request completed");
        check_status(reply.status).inspect_err(|_| {
            warn!(status = reply.status, body = %truncate_body(&reply.body), "unexpected status");
        })?;

        Ok(reply.body)
    }
}

fn check_status(status: u16) -> Result<(), TransportError> {
    match status {
        HTTP_OK | HTTP_MOVED_PERMANENTLY => Ok(()),
        other => Err(TransportError::UnexpectedStatus(other)),
    }
}

fn redact(url: &str) -> String {
    match url.split_once("appid=") {
        Some((head, _)) => format!("{head}appid=***"),
        None => url.to_string(),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
