//! Per-request source address rotation.
//!
//! YouTube rate-limits per client address. With a routed IPv6 block, every
//! request can leave from a different address inside the block, which keeps
//! long playlist traversals and downloads from tripping the limiter.
//! Rotation is best effort: when no address can be produced the request goes
//! out unmodified.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, warn};

use super::{FetchRequest, FetchResponse, Fetcher};

/// Produces the source address for the next outbound request.
pub trait IpRotator: Send + Sync {
    fn next_address(&self) -> Result<IpAddr>;
}

/// Picks a uniformly random address inside a CIDR block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidrRotator {
    network: IpAddr,
    prefix: u8,
}

impl CidrRotator {
    pub fn new(network: IpAddr, prefix: u8) -> Result<Self> {
        let max = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix > max {
            bail!("prefix /{prefix} is too long for {network}");
        }
        Ok(Self { network, prefix })
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Returns `true` if `addr` lies inside the block.
    pub fn contains(&self, addr: IpAddr) -> bool {
        match (self.network, addr) {
            (IpAddr::V4(net), IpAddr::V4(a)) => {
                let mask = mask_u32(self.prefix);
                u32::from(net) & mask == u32::from(a) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(a)) => {
                let mask = mask_u128(self.prefix);
                u128::from(net) & mask == u128::from(a) & mask
            }
            _ => false,
        }
    }

    fn random_in_block(&self, rng: &mut impl Rng) -> IpAddr {
        match self.network {
            IpAddr::V4(net) => {
                let mask = mask_u32(self.prefix);
                let host: u32 = rng.gen();
                IpAddr::V4(Ipv4Addr::from((u32::from(net) & mask) | (host & !mask)))
            }
            IpAddr::V6(net) => {
                let mask = mask_u128(self.prefix);
                let host: u128 = rng.gen();
                IpAddr::V6(Ipv6Addr::from((u128::from(net) & mask) | (host & !mask)))
            }
        }
    }
}

fn mask_u32(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

fn mask_u128(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix))
    }
}

impl FromStr for CidrRotator {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (addr, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| anyhow!("expected <address>/<prefix>, got {s:?}"))?;
        let network: IpAddr = addr
            .parse()
            .with_context(|| format!("invalid network address {addr:?}"))?;
        let prefix: u8 = prefix
            .parse()
            .with_context(|| format!("invalid prefix length {prefix:?}"))?;
        Self::new(network, prefix)
    }
}

impl IpRotator for CidrRotator {
    fn next_address(&self) -> Result<IpAddr> {
        // A /32 or /128 still "rotates", it just always yields the same address.
        Ok(self.random_in_block(&mut rand::thread_rng()))
    }
}

/// Wraps a fetcher and binds each request to the next rotated address.
///
/// Method, URL, headers and body pass through untouched; only
/// [`FetchRequest::local_address`] is set.
pub struct RotatingFetcher<F> {
    inner: F,
    rotator: Option<Arc<dyn IpRotator>>,
}

impl<F: Fetcher> RotatingFetcher<F> {
    pub fn new(inner: F, rotator: Option<Arc<dyn IpRotator>>) -> Self {
        Self { inner, rotator }
    }

    pub fn is_rotating(&self) -> bool {
        self.rotator.is_some()
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for RotatingFetcher<F> {
    async fn fetch(&self, mut request: FetchRequest) -> Result<FetchResponse> {
        if let Some(rotator) = &self.rotator {
            match rotator.next_address() {
                Ok(addr) => {
                    debug!(local_address = %addr, url = %request.url, "Rotated source address");
                    request.local_address = Some(addr);
                }
                Err(e) => {
                    warn!(error = %e, "IP rotation failed, sending request unmodified");
                }
            }
        }
        self.inner.fetch(request).await
    }
}
