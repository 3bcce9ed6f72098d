//! reqwest-backed [`Fetcher`]
//!
//! Features:
//! - HTTP/2 multiplexing with connection pooling for the default route
//! - TLS 1.3 via rustls
//! - Brotli, Gzip, Deflate compression (auto-negotiated)
//! - Per-request source address binding for IP rotation

use std::net::IpAddr;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use tracing::{debug, instrument};

use crate::fetch::{FetchRequest, FetchResponse, Fetcher, Method};

/// [`Fetcher`] implementation on top of a pooled reqwest client.
pub struct ReqwestFetcher {
    client: Client,
    connect_timeout: Duration,
    timeout: Duration,
}

impl ReqwestFetcher {
    /// Create a fetcher with default timeouts
    pub fn new() -> Result<Self> {
        Self::with_timeouts(Duration::from_secs(10), Duration::from_secs(30))
    }

    pub fn with_timeouts(connect_timeout: Duration, timeout: Duration) -> Result<Self> {
        let client = Self::builder(connect_timeout, timeout).build()?;
        Ok(Self {
            client,
            connect_timeout,
            timeout,
        })
    }

    fn builder(connect_timeout: Duration, timeout: Duration) -> ClientBuilder {
        Client::builder()
            // ═══════════════════════════════════════════════════════════════
            // CONNECTION REUSE
            // ═══════════════════════════════════════════════════════════════
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            // ═══════════════════════════════════════════════════════════════
            // TLS
            // ═══════════════════════════════════════════════════════════════
            .use_rustls_tls()
            // ═══════════════════════════════════════════════════════════════
            // COMPRESSION (auto-negotiated via Accept-Encoding)
            // ═══════════════════════════════════════════════════════════════
            .brotli(true)
            .gzip(true)
            .deflate(true)
            // ═══════════════════════════════════════════════════════════════
            // TIMEOUTS
            // ═══════════════════════════════════════════════════════════════
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .cookie_store(true)
    }

    /// Client bound to a specific source address.
    ///
    /// Rotated addresses are rarely reused, so these clients are not pooled.
    fn bound_client(&self, addr: IpAddr) -> Result<Client> {
        Ok(Self::builder(self.connect_timeout, self.timeout)
            .local_address(addr)
            .build()?)
    }

    /// Get the underlying reqwest client
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        let client = match request.local_address {
            Some(addr) => self.bound_client(addr)?,
            None => self.client.clone(),
        };

        let mut builder = match request.method {
            Method::Get => client.get(&request.url),
            Method::Post => client.post(&request.url),
            Method::Head => client.head(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = response.bytes().await?;

        debug!(status, bytes = body.len(), "Response received");

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new().expect("Failed to create default fetcher")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_custom_timeouts() {
        let fetcher =
            ReqwestFetcher::with_timeouts(Duration::from_secs(1), Duration::from_secs(2)).unwrap();
        assert_eq!(fetcher.timeout, Duration::from_secs(2));
        assert_eq!(fetcher.connect_timeout, Duration::from_secs(1));
    }

    #[test]
    fn binds_loopback_address() {
        let fetcher = ReqwestFetcher::new().unwrap();
        assert!(fetcher.bound_client("127.0.0.1".parse().unwrap()).is_ok());
    }
}
