//! Auth verification forwarder
//!
//! `POST /auth/verify` delegates the actual token check to the external
//! auth validator. The upstream call carries the original request
//! context and runs under a bounded timeout; an unreachable or slow
//! upstream is a distinct error, never a hang.

use std::time::Duration;

use inv_common::{Error, Result};

/// Client for the external auth validator.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    verify_url: Option<String>,
}

impl AuthClient {
    /// Build a client. With no verify URL configured, verification is
    /// disabled and every request passes (development setup).
    pub fn new(verify_url: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build auth client: {}", e)))?;
        Ok(AuthClient { http, verify_url })
    }

    /// Forward the bearer token and original request context upstream.
    /// `Ok(())` on 2xx, `Forbidden` on any other status, `AuthUpstream`
    /// when the upstream cannot be reached in time.
    pub async fn verify(
        &self,
        authorization: &str,
        original_uri: &str,
        original_method: &str,
    ) -> Result<()> {
        let Some(url) = &self.verify_url else {
            return Ok(());
        };

        let response = self
            .http
            .post(url)
            .header("Authorization", authorization)
            .header("X-Original-URI", original_uri)
            .header("X-Original-Method", original_method)
            .send()
            .await
            .map_err(|e| Error::AuthUpstream(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }
}
