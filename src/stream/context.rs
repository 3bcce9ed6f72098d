//! Per-call streaming configuration.
//!
//! The context is installed for the duration of one streaming call with
//! [`StreamingContext::scope`] and read back with
//! [`StreamingContext::current`]. It lives in a tokio task-local, so
//! concurrent streaming calls on other tasks never observe each other's
//! values. Spawned tasks do not inherit it; anything they need is passed by
//! move.

use std::future::Future;

use crate::source::ClientVariant;

/// Duplex buffer size used when the context does not set one.
pub const DEFAULT_HIGH_WATER_MARK: usize = 512 * 1024;

tokio::task_local! {
    static CONTEXT: StreamingContext;
}

/// Client variant and buffering for one streaming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamingContext {
    /// Client the upstream requests identify as.
    pub client: ClientVariant,
    /// Bytes buffered between the download and the reader before the
    /// download is suspended.
    pub high_water_mark: Option<usize>,
}

impl StreamingContext {
    #[must_use]
    pub fn new(client: ClientVariant) -> Self {
        Self {
            client,
            high_water_mark: None,
        }
    }

    #[must_use]
    pub fn with_high_water_mark(mut self, bytes: usize) -> Self {
        self.high_water_mark = Some(bytes);
        self
    }

    /// Effective buffer size; zero is treated as unset.
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_HIGH_WATER_MARK)
    }

    /// Run `fut` with this context installed.
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        CONTEXT.scope(self, fut).await
    }

    /// The context of the enclosing [`scope`](Self::scope), or the default
    /// outside of one.
    pub fn current() -> Self {
        CONTEXT.try_with(|ctx| *ctx).unwrap_or_default()
    }

    /// Returns `true` when called inside a [`scope`](Self::scope).
    pub fn is_set() -> bool {
        CONTEXT.try_with(|_| ()).is_ok()
    }
}
