use crate::Certificates;
use crate::model::{CertificateView, VerifyRequest, VerifyResponse};
use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use feq_derive::api_handler;
use feq_kernel::domain::constants::CERTIFICATES_TAG;
use feq_kernel::prelude::*;
use std::borrow::Cow;

impl Validate for VerifyRequest {
    fn validate(&self) -> Result<(), Cow<'static, str>> {
        validate::non_blank("payload", &self.payload)?;
        validate::max_len("payload", &self.payload, 8 * 1024)?;
        validate::non_blank("signature", &self.signature)
    }
}

#[api_handler(
    get,
    path = "/api/certificates/{code}",
    params(("code" = String, Path, description = "Certificate code")),
    responses(
        (status = OK, description = "Stored certificate and its validity", body = CertificateView),
        (status = NOT_FOUND, description = "Unknown code", body = ErrorBody),
    ),
    tag = CERTIFICATES_TAG,
)]
pub(crate) async fn lookup_handler(
    State(state): State<ApiState>,
    Path(code): Path<String>,
) -> Result<Json<CertificateView>, ApiError> {
    let code = ResourceGuard::code(&code)?;
    let slice = state.try_get_slice::<Certificates>()?;
    let stored = slice.lookup(&state.database, &code).await?;

    let signature_valid = slice.signer.verify_payload(&stored.json, &stored.signature);
    let expired = stored.payload.is_expired(Utc::now());

    Ok(Json(CertificateView {
        certificate: stored.payload,
        signature: stored.signature,
        signature_valid,
        expired,
        valid: signature_valid && !expired,
    }))
}

#[api_handler(
    post,
    path = "/api/certificates/verify",
    request_body = VerifyRequest,
    responses(
        (status = OK, description = "Verification outcome", body = VerifyResponse),
        (status = BAD_REQUEST, description = "Malformed request", body = ErrorBody),
    ),
    tag = CERTIFICATES_TAG,
)]
pub(crate) async fn verify_handler(
    State(state): State<ApiState>,
    ValidJson(body): ValidJson<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let slice = state.try_get_slice::<Certificates>()?;
    Ok(Json(slice.verify(&body.payload, &body.signature)))
}
