//! SigV4 request signing with refreshing credentials
//!
//! Credentials come from an `aws-config` provider chain (environment,
//! profile, SSO, web identity, container and instance metadata). They are
//! cached until shortly before they expire and then fetched again.

use std::time::{Duration, SystemTime};

use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use parking_lot::Mutex;
use tracing::debug;

use super::BackendError;

/// Credentials closer than this to expiry are fetched again
const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Signs requests for one service in one region
pub struct RequestSigner {
    provider: Option<SharedCredentialsProvider>,
    cached: Mutex<Option<Credentials>>,
    region: String,
    service: &'static str,
}

impl RequestSigner {
    pub fn new(
        provider: Option<SharedCredentialsProvider>,
        region: impl Into<String>,
        service: &'static str,
    ) -> Self {
        Self {
            provider,
            cached: Mutex::new(None),
            region: region.into(),
            service,
        }
    }

    /// Whether a credentials provider is configured at all
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Current credentials, refreshed when missing or about to expire
    async fn credentials(&self) -> Result<Credentials, BackendError> {
        let cached = self.cached.lock().clone();
        if let Some(credentials) = cached.filter(|c| is_fresh(c, SystemTime::now())) {
            return Ok(credentials);
        }

        let provider = self.provider.as_ref().ok_or_else(|| {
            BackendError::Credentials("no AWS credentials provider configured".into())
        })?;
        let credentials = provider
            .provide_credentials()
            .await
            .map_err(|e| BackendError::Credentials(e.to_string()))?;
        debug!(expiry = ?credentials.expiry(), "Loaded AWS credentials");

        *self.cached.lock() = Some(credentials.clone());
        Ok(credentials)
    }

    /// Headers to add to a request so that it carries a valid signature
    ///
    /// `headers` are the request headers to include in the signature; the
    /// host is taken from `url`.
    pub async fn sign(
        &self,
        method: &str,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<Vec<(String, String)>, BackendError> {
        let identity = self.credentials().await?.into();
        let params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(self.service)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| BackendError::Request(format!("invalid signing parameters: {}", e)))?
            .into();

        let signable = SignableRequest::new(
            method,
            url,
            headers.iter().copied(),
            SignableBody::Bytes(body),
        )
        .map_err(|e| BackendError::Request(format!("unsignable request: {}", e)))?;

        let (instructions, _signature) = sign(signable, &params)
            .map_err(|e| BackendError::Request(format!("signing failed: {}", e)))?
            .into_parts();

        Ok(instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

fn is_fresh(credentials: &Credentials, now: SystemTime) -> bool {
    match credentials.expiry() {
        Some(expiry) => expiry > now + REFRESH_MARGIN,
        None => true,
    }
}
