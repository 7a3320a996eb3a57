use chrono::{DateTime, Utc};
use feq_derive::api_model;
use serde::Deserialize;
use uuid::Uuid;

/// Signed content of an operator certificate.
#[api_model(deny_unknown_fields = false)]
#[derive(Clone, PartialEq)]
pub struct CertificatePayload {
    pub enrollment_id: Uuid,
    /// Learner's name as printed on the certificate
    pub learner: String,
    /// Course title
    pub course: String,
    /// Final exam score between 0 and 1
    pub score: f64,
    pub issued_at: DateTime<Utc>,
    /// Re-evaluation due date
    pub expires_at: DateTime<Utc>,
    /// Public verification code
    pub code: String,
}

impl CertificatePayload {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A certificate as stored on its enrollment.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCertificate {
    pub payload: CertificatePayload,
    /// The exact JSON that was signed.
    pub json: String,
    pub signature: String,
}

/// Result of [`crate::Certificates::issue`].
#[derive(Debug, Clone, PartialEq)]
pub struct Issued {
    pub certificate: StoredCertificate,
    /// `false` when the enrollment already held a certificate.
    pub fresh: bool,
}

/// Enrollment columns read by the certificate slice.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EnrollmentRecord {
    pub(crate) id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) course_id: Uuid,
    #[serde(default)]
    pub(crate) passed: bool,
    pub(crate) cert_code: Option<String>,
    pub(crate) cert_payload: Option<String>,
    pub(crate) cert_signature: Option<String>,
}

pub(crate) const ENROLLMENT_COLUMNS: &str =
    "id,user_id,course_id,passed,cert_code,cert_payload,cert_signature";

#[derive(Debug, Deserialize)]
pub(crate) struct LearnerRecord {
    pub(crate) full_name: Option<String>,
    pub(crate) email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CourseRecord {
    pub(crate) title: String,
}

// --- HTTP ---

/// Public view of a stored certificate.
#[api_model]
pub struct CertificateView {
    pub certificate: CertificatePayload,
    pub signature: String,
    /// The stored signature matches the stored payload
    pub signature_valid: bool,
    pub expired: bool,
    /// Signature valid and not expired
    pub valid: bool,
}

/// A certificate presented for verification.
#[api_model]
pub struct VerifyRequest {
    /// Signed JSON, byte for byte
    pub payload: String,
    /// Lowercase hex HMAC-SHA256
    pub signature: String,
}

#[api_model]
pub struct VerifyResponse {
    pub valid: bool,
    pub expired: bool,
    /// Decoded payload when the signature verifies
    pub certificate: Option<CertificatePayload>,
}
