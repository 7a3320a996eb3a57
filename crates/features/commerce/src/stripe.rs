//! Stripe Checkout and webhook signatures.

use crate::error::{CommerceError, CommerceErrorExt};
use crate::model::CheckoutSession;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::fmt;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::{instrument, warn};

type HmacSha256 = Hmac<Sha256>;

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Minimal Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_url: String,
    secret_key: Option<String>,
}

impl fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_url", &self.api_url)
            .field("configured", &self.secret_key.is_some())
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// A blank `secret_key` leaves checkout disabled.
    ///
    /// # Errors
    /// [`CommerceError::Http`] when the HTTP client cannot be built.
    pub fn new(api_url: &str, secret_key: &str, timeout: Duration) -> Result<Self, CommerceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Building Stripe client")?;
        let secret_key = Some(secret_key.trim().to_owned()).filter(|key| !key.is_empty());
        if secret_key.is_none() {
            warn!("Stripe secret key is not set; checkout is disabled");
        }
        Ok(Self { http, api_url: api_url.trim_end_matches('/').to_owned(), secret_key })
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.secret_key.is_some()
    }

    /// Creates a Checkout Session from already form-encoded fields.
    ///
    /// # Errors
    /// [`CommerceError::Config`] without a secret key, [`CommerceError::Provider`] when
    /// Stripe rejects the request.
    #[instrument(skip(self, form), fields(fields = form.len()))]
    pub async fn create_checkout_session(
        &self,
        form: &[(String, String)],
    ) -> Result<CheckoutSession, CommerceError> {
        let Some(key) = &self.secret_key else {
            return Err(CommerceError::Config {
                message: "payments are not configured".into(),
                context: None,
            });
        };

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_url))
            .bearer_auth(key)
            .form(form)
            .send()
            .await
            .context("Creating checkout session")?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or_else(|| status.to_string());
            return Err(CommerceError::Provider {
                status: status.as_u16(),
                message: message.into(),
                context: None,
            });
        }

        response.json().await.context("Decoding checkout session")
    }
}

/// Verifies the `Stripe-Signature` header of webhook deliveries.
///
/// The header carries `t=<unix seconds>` and one or more `v1=<hex>` entries; the signed
/// message is `"{t}.{raw body}"`.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookVerifier").field("tolerance_secs", &self.tolerance_secs).finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    #[must_use]
    pub fn new(secret: &str, tolerance_secs: i64) -> Self {
        Self { secret: secret.trim().to_owned(), tolerance_secs: tolerance_secs.max(0) }
    }

    fn expected(&self, timestamp: &str, payload: &[u8]) -> Result<Vec<u8>, CommerceError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|err| {
            CommerceError::Internal { message: err.to_string().into(), context: None }
        })?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Signature header for `payload` at `timestamp`, as Stripe would send it.
    ///
    /// # Errors
    /// [`CommerceError::Internal`] if the key is rejected by the MAC.
    pub fn sign(&self, timestamp: i64, payload: &[u8]) -> Result<String, CommerceError> {
        let signature = self.expected(&timestamp.to_string(), payload)?;
        Ok(format!("t={timestamp},v1={}", hex::encode(signature)))
    }

    /// Checks `header` against `payload` at time `now` (unix seconds).
    ///
    /// # Errors
    /// [`CommerceError::Signature`] for a missing secret, a malformed header, a timestamp
    /// outside the tolerance or no matching `v1` signature.
    pub fn verify(&self, header: &str, payload: &[u8], now: i64) -> Result<(), CommerceError> {
        if self.secret.is_empty() {
            return Err(CommerceError::signature("webhook secret is not configured"));
        }

        let mut timestamp = None;
        let mut candidates = Vec::new();
        for (key, value) in header.split(',').filter_map(|part| part.trim().split_once('=')) {
            match key {
                "t" => timestamp = Some(value),
                "v1" => candidates.push(value),
                _ => {},
            }
        }

        let raw_timestamp = timestamp.ok_or_else(|| CommerceError::signature("missing timestamp"))?;
        let sent_at: i64 =
            raw_timestamp.parse().map_err(|_| CommerceError::signature("malformed timestamp"))?;
        if candidates.is_empty() {
            return Err(CommerceError::signature("missing v1 signature"));
        }
        if now.abs_diff(sent_at) > self.tolerance_secs.unsigned_abs() {
            return Err(CommerceError::signature("timestamp outside the tolerance"));
        }

        let expected = self.expected(raw_timestamp, payload)?;
        let matched = candidates
            .iter()
            .filter_map(|candidate| hex::decode(candidate).ok())
            .any(|candidate| bool::from(candidate.ct_eq(&expected)));
        if matched { Ok(()) } else { Err(CommerceError::signature("signature mismatch")) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;

    #[test]
    fn signed_payloads_verify_within_tolerance() {
        let verifier = WebhookVerifier::new("whsec_test", 300);
        let header = verifier.sign(1_700_000_000, BODY).unwrap();
        assert!(verifier.verify(&header, BODY, 1_700_000_100).is_ok());
        assert!(verifier.verify(&header, BODY, 1_700_000_301).is_err());
    }

    #[test]
    fn any_matching_v1_entry_is_accepted() {
        let verifier = WebhookVerifier::new("whsec_test", 300);
        let header = verifier.sign(1_700_000_000, BODY).unwrap();
        let rotated = header.replace("t=1700000000,", "t=1700000000,v1=00ff,");
        assert!(verifier.verify(&rotated, BODY, 1_700_000_000).is_ok());
    }

    #[test]
    fn unconfigured_secret_rejects_everything() {
        let verifier = WebhookVerifier::new("  ", 300);
        assert!(verifier.verify("t=1,v1=00", BODY, 1).is_err());
    }
}
