use crate::error::{CertificateError, CertificateErrorExt};
use crate::model::{
    CertificatePayload, CourseRecord, ENROLLMENT_COLUMNS, EnrollmentRecord, Issued, LearnerRecord,
    StoredCertificate, VerifyResponse,
};
use crate::CertificatesInner;
use chrono::{Duration, Utc};
use feq_database::{Database, Returning};
use feq_kernel::domain::constants::{COURSES, ENROLLMENTS, PROFILES};
use feq_kernel::security::random_code;
use feq_mailer::{Email, Mailer, escape_html};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const CODE_LEN: usize = 10;

impl CertificatesInner {
    /// Issues the certificate of a passed enrollment, or returns the one it already holds.
    ///
    /// The write only lands while `cert_code` is still empty, so concurrent submissions
    /// settle on a single certificate. A fresh certificate is emailed to the learner;
    /// delivery problems are logged and ignored.
    ///
    /// # Errors
    /// [`CertificateError::NotFound`] for an unknown enrollment,
    /// [`CertificateError::NotEligible`] when the exam has not been passed.
    #[instrument(skip(self, db, mailer))]
    pub async fn issue(
        &self,
        db: &Database,
        mailer: &Mailer,
        enrollment_id: Uuid,
        score: f64,
    ) -> Result<Issued, CertificateError> {
        let enrollment = load_enrollment(db, enrollment_id).await?;
        if let Some(existing) = self.stored(&enrollment)? {
            return Ok(Issued { certificate: existing, fresh: false });
        }
        if !enrollment.passed {
            return Err(CertificateError::NotEligible {
                message: "the final exam has not been passed".into(),
                context: None,
            });
        }

        let learner: Option<LearnerRecord> = db
            .service()
            .from(PROFILES)
            .select("full_name,email")
            .eq("id", enrollment.user_id)
            .fetch_optional()
            .await
            .context("Loading learner")?;
        let course: CourseRecord = db
            .service()
            .from(COURSES)
            .select("title")
            .eq("id", enrollment.course_id)
            .fetch_one()
            .await
            .context("Loading course")?;

        let issued_at = Utc::now();
        let payload = CertificatePayload {
            enrollment_id,
            learner: learner_name(learner.as_ref()),
            course: course.title,
            score,
            issued_at,
            expires_at: issued_at + Duration::days(self.validity_days),
            code: random_code(CODE_LEN),
        };
        let signed = self.signer.sign_payload(&payload)?;

        let written: Vec<EnrollmentRecord> = db
            .service()
            .from(ENROLLMENTS)
            .eq("id", enrollment_id)
            .is_null("cert_code")
            .select(ENROLLMENT_COLUMNS)
            .update(
                &json!({
                    "cert_code": payload.code,
                    "cert_payload": signed.json,
                    "cert_signature": signed.signature,
                    "cert_issued_at": payload.issued_at,
                    "cert_expires_at": payload.expires_at,
                }),
                Returning::Representation,
            )
            .await
            .context("Storing certificate")?;

        if written.is_empty() {
            // Another request stored its certificate first.
            let enrollment = load_enrollment(db, enrollment_id).await?;
            let existing = self.stored(&enrollment)?.ok_or_else(|| CertificateError::Internal {
                message: "certificate vanished after a concurrent issue".into(),
                context: None,
            })?;
            return Ok(Issued { certificate: existing, fresh: false });
        }

        info!(code = %payload.code, "Certificate issued");

        if let Some(email) = learner.and_then(|l| l.email) {
            mailer.send_or_log(&self.certificate_email(&email, &payload)).await;
        }

        Ok(Issued {
            certificate: StoredCertificate { payload, json: signed.json, signature: signed.signature },
            fresh: true,
        })
    }

    /// Loads a certificate by its public code.
    ///
    /// # Errors
    /// [`CertificateError::NotFound`] when no enrollment carries `code`.
    #[instrument(skip(self, db))]
    pub async fn lookup(
        &self,
        db: &Database,
        code: &str,
    ) -> Result<StoredCertificate, CertificateError> {
        let enrollment: Option<EnrollmentRecord> = db
            .service()
            .from(ENROLLMENTS)
            .select(ENROLLMENT_COLUMNS)
            .eq("cert_code", code)
            .fetch_optional()
            .await
            .context("Looking up certificate")?;

        enrollment.as_ref().map(|e| self.stored(e)).transpose()?.flatten().ok_or_else(|| {
            CertificateError::NotFound { message: "no certificate with this code".into(), context: None }
        })
    }

    /// Verifies a presented payload and signature.
    #[must_use]
    pub fn verify(&self, json: &str, signature: &str) -> VerifyResponse {
        if !self.signer.verify_payload(json, signature) {
            return VerifyResponse { valid: false, expired: false, certificate: None };
        }

        match serde_json::from_str::<CertificatePayload>(json) {
            Ok(certificate) => {
                let expired = certificate.is_expired(Utc::now());
                VerifyResponse { valid: !expired, expired, certificate: Some(certificate) }
            },
            Err(err) => {
                warn!(error = %err, "Signed payload is not a certificate");
                VerifyResponse { valid: false, expired: false, certificate: None }
            },
        }
    }

    /// Public page where anyone can check a certificate.
    #[must_use]
    pub fn verification_url(&self, code: &str) -> String {
        format!("{}/verify/{code}", self.site_url.trim_end_matches('/'))
    }

    fn stored(
        &self,
        enrollment: &EnrollmentRecord,
    ) -> Result<Option<StoredCertificate>, CertificateError> {
        let (Some(_), Some(json), Some(signature)) =
            (&enrollment.cert_code, &enrollment.cert_payload, &enrollment.cert_signature)
        else {
            return Ok(None);
        };

        let payload: CertificatePayload = serde_json::from_str(json)
            .context(format!("Stored certificate of enrollment {}", enrollment.id))?;
        Ok(Some(StoredCertificate { payload, json: json.clone(), signature: signature.clone() }))
    }

    fn certificate_email(&self, to: &str, payload: &CertificatePayload) -> Email {
        let url = self.verification_url(&payload.code);
        Email::new(to, format!("Your {} certificate", payload.course)).html(format!(
            "<p>Congratulations {learner},</p>\
             <p>You passed <strong>{course}</strong>. Your certificate code is \
             <strong>{code}</strong>, valid until {expires}.</p>\
             <p>Employers can verify it at <a href=\"{url}\">{url}</a>.</p>",
            learner = escape_html(&payload.learner),
            course = escape_html(&payload.course),
            code = payload.code,
            expires = payload.expires_at.format("%B %-d, %Y"),
            url = escape_html(&url),
        ))
    }
}

async fn load_enrollment(
    db: &Database,
    enrollment_id: Uuid,
) -> Result<EnrollmentRecord, CertificateError> {
    db.service()
        .from(ENROLLMENTS)
        .select(ENROLLMENT_COLUMNS)
        .eq("id", enrollment_id)
        .fetch_one()
        .await
        .map_err(|err| {
            if err.is_not_found() {
                CertificateError::NotFound { message: "unknown enrollment".into(), context: None }
            } else {
                err.into()
            }
        })
}

fn learner_name(learner: Option<&LearnerRecord>) -> String {
    learner
        .and_then(|l| {
            l.full_name.as_deref().filter(|n| !n.trim().is_empty()).or(l.email.as_deref())
        })
        .unwrap_or("Learner")
        .trim()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learner_name_prefers_full_name() {
        let full = LearnerRecord { full_name: Some("Ana Ruiz".into()), email: Some("a@x.co".into()) };
        let blank = LearnerRecord { full_name: Some(" ".into()), email: Some("a@x.co".into()) };
        assert_eq!(learner_name(Some(&full)), "Ana Ruiz");
        assert_eq!(learner_name(Some(&blank)), "a@x.co");
        assert_eq!(learner_name(None), "Learner");
    }
}
