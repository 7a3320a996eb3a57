//! HMAC-SHA256 signatures over the exact JSON text of a certificate.
//!
//! The signature covers the serialized string, not a re-serialization of parsed data, so
//! a verifier must be handed the stored JSON verbatim. Any changed byte in either the JSON
//! or the hex signature fails verification.

use crate::error::CertificateError;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compact JSON and its lowercase hex signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    pub json: String,
    pub signature: String,
}

/// Holds the server secret.
#[derive(Clone)]
pub struct CertificateSigner {
    key: Vec<u8>,
}

impl fmt::Debug for CertificateSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateSigner").field("key", &"***").finish()
    }
}

impl CertificateSigner {
    /// # Errors
    /// [`CertificateError::Config`] for an empty secret.
    pub fn new(secret: &str) -> Result<Self, CertificateError> {
        if secret.trim().is_empty() {
            return Err(CertificateError::Config {
                message: "certificates.secret must be set".into(),
                context: None,
            });
        }
        Ok(Self { key: secret.as_bytes().to_vec() })
    }

    /// Serializes `payload` to compact JSON and signs it.
    ///
    /// # Errors
    /// [`CertificateError::Encoding`] when `payload` cannot be serialized.
    pub fn sign_payload<T: Serialize>(&self, payload: &T) -> Result<SignedPayload, CertificateError> {
        let json = serde_json::to_string(payload)?;
        let signature = self.sign(&json)?;
        Ok(SignedPayload { json, signature })
    }

    /// Lowercase hex HMAC of `json`.
    ///
    /// # Errors
    /// [`CertificateError::Internal`] if the key is refused by the MAC.
    pub fn sign(&self, json: &str) -> Result<String, CertificateError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.key).map_err(|err| {
            CertificateError::Internal { message: err.to_string().into(), context: None }
        })?;
        mac.update(json.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Constant-time comparison of `signature` with the HMAC of `json`.
    #[must_use]
    pub fn verify_payload(&self, json: &str, signature: &str) -> bool {
        self.sign(json)
            .is_ok_and(|expected| expected.as_bytes().ct_eq(signature.as_bytes()).into())
    }
}
