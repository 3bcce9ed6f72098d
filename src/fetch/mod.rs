//! The injected fetch capability.
//!
//! All upstream traffic goes through a [`Fetcher`]. The crate ships a reqwest
//! implementation ([`crate::http_client::ReqwestFetcher`]) and a wrapper that
//! assigns a rotating source address to each request
//! ([`rotation::RotatingFetcher`]); hosts embedding the crate can supply
//! their own.

pub mod rotation;

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;

pub use rotation::{CidrRotator, IpRotator, RotatingFetcher};

/// HTTP method of a [`FetchRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Head,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Head => "HEAD",
        })
    }
}

/// An outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    /// Local address to bind the connection to. Set by IP rotation.
    pub local_address: Option<IpAddr>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            local_address: None,
        }
    }

    /// POST with a JSON body.
    pub fn post_json(url: impl Into<String>, body: &serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(Bytes::from(body.to_string())),
            local_address: None,
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A buffered response.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header lookup, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Fail on non-2xx status.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            let preview = String::from_utf8_lossy(&self.body[..self.body.len().min(200)]).into_owned();
            Err(anyhow!("HTTP {}: {}", self.status, preview))
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Performs HTTP requests on behalf of the upstream sources.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for std::sync::Arc<F> {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        (**self).fetch(request).await
    }
}
