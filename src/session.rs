//! The signed-in upstream session.
//!
//! The session is the only mutable state shared between resolution, bridging
//! and streaming calls. Sign-in and sign-out are single-writer operations;
//! every other caller only reads.

use std::fmt;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::source::PrimarySource;

/// Credentials attached to upstream requests once signed in.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Raw `Cookie` header of a browser session.
    pub cookie: Option<String>,
    /// OAuth access token, sent as a bearer token.
    pub access_token: Option<String>,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.cookie.as_deref().is_none_or(str::is_empty)
            && self.access_token.as_deref().is_none_or(str::is_empty)
    }
}

// Never print secrets.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("cookie", &self.cookie.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Upstream session state.
#[derive(Debug, Default)]
pub struct Session {
    credentials: RwLock<Option<Credentials>>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.credentials.read().await.is_some()
    }

    /// Current credentials, if signed in.
    pub async fn credentials(&self) -> Option<Credentials> {
        self.credentials.read().await.clone()
    }

    /// Verify `credentials` against `source` and store them on success.
    ///
    /// With `suppress_errors` set, a rejected sign-in is logged and reported
    /// as `Ok(false)`; otherwise it is returned as [`Error::Auth`].
    pub async fn sign_in(
        &self,
        source: &dyn PrimarySource,
        credentials: Credentials,
        suppress_errors: bool,
    ) -> Result<bool> {
        let outcome = if credentials.is_empty() {
            Err(Error::Auth("no cookie or access token supplied".to_string()))
        } else {
            source
                .verify_credentials(&credentials)
                .await
                .map_err(|e| Error::Auth(format!("{e:#}")))
        };

        match outcome {
            Ok(()) => {
                *self.credentials.write().await = Some(credentials);
                info!(source = source.name(), "Signed in");
                Ok(true)
            }
            Err(e) if suppress_errors => {
                warn!(source = source.name(), error = %e, "Sign-in failed, continuing signed out");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn sign_out(&self) {
        if self.credentials.write().await.take().is_some() {
            info!("Signed out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secrets() {
        let creds = Credentials {
            cookie: Some("SID=secret".into()),
            access_token: None,
        };
        let printed = format!("{creds:?}");
        assert!(!printed.contains("secret"));
        assert!(printed.contains("redacted"));
    }

    #[test]
    fn empty_credentials() {
        assert!(Credentials::default().is_empty());
        assert!(Credentials { cookie: Some(String::new()), access_token: None }.is_empty());
        assert!(!Credentials { cookie: None, access_token: Some("t".into()) }.is_empty());
    }

    #[tokio::test]
    async fn starts_signed_out() {
        let session = Session::new();
        assert!(!session.is_authenticated().await);
        session.sign_out().await;
        assert!(session.credentials().await.is_none());
    }
}
