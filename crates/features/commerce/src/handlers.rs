use crate::Commerce;
use crate::error::CommerceError;
use crate::fulfilment::{self, Outcome};
use crate::model::{
    CheckoutRequest, CheckoutSession, Part, PartsPage, PartsQuery, RentalReceipt, RentalRequest,
    WebhookAck,
};
use crate::{catalog, rentals};
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;
use feq_derive::api_handler;
use feq_identity::CurrentUser;
use feq_kernel::domain::constants::COMMERCE_TAG;
use feq_kernel::prelude::*;
use tracing::{debug, warn};

const SIGNATURE_HEADER: &str = "stripe-signature";

#[api_handler(
    get,
    path = "/api/parts",
    params(PartsQuery),
    responses(
        (status = OK, description = "One page of matching parts", body = PartsPage),
        (status = BAD_REQUEST, description = "Invalid paging", body = ErrorBody),
    ),
    tag = COMMERCE_TAG,
)]
pub(crate) async fn parts_handler(
    State(state): State<ApiState>,
    ValidQuery(query): ValidQuery<PartsQuery>,
) -> Result<Json<PartsPage>, ApiError> {
    Ok(Json(catalog::search(&state.database, &query).await?))
}

#[api_handler(
    get,
    path = "/api/parts/{slug}",
    params(("slug" = String, Path, description = "Part slug")),
    responses(
        (status = OK, description = "The part", body = Part),
        (status = NOT_FOUND, description = "Unknown part", body = ErrorBody),
    ),
    tag = COMMERCE_TAG,
)]
pub(crate) async fn part_handler(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<Json<Part>, ApiError> {
    let slug = ResourceGuard::slug(&slug)?;
    Ok(Json(catalog::part_by_slug(&state.database, &slug).await?))
}

#[api_handler(
    post,
    path = "/api/rentals",
    request_body = RentalRequest,
    responses(
        (status = CREATED, description = "Request stored and sent to sales", body = RentalReceipt),
        (status = BAD_REQUEST, description = "Invalid request", body = ErrorBody),
    ),
    tag = COMMERCE_TAG,
)]
pub(crate) async fn rental_handler(
    State(state): State<ApiState>,
    ValidJson(body): ValidJson<RentalRequest>,
) -> Result<(StatusCode, Json<RentalReceipt>), ApiError> {
    let commerce = state.try_get_slice::<Commerce>()?;
    let receipt =
        rentals::submit(&state.database, &state.mailer, &commerce.sales_inbox, &body).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

#[api_handler(
    post,
    path = "/api/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = OK, description = "Hosted checkout page", body = CheckoutSession),
        (status = FORBIDDEN, description = "Sign in or billing permission required", body = ErrorBody),
        (status = NOT_FOUND, description = "Unknown part or course", body = ErrorBody),
    ),
    tag = COMMERCE_TAG,
)]
pub(crate) async fn checkout_handler(
    State(state): State<ApiState>,
    buyer: Option<CurrentUser>,
    ValidJson(body): ValidJson<CheckoutRequest>,
) -> Result<Json<CheckoutSession>, ApiError> {
    let commerce = state.try_get_slice::<Commerce>()?;
    Ok(Json(commerce.checkout(&state.database, buyer.as_ref(), &body).await?))
}

/// Stripe webhook endpoint; the raw body is needed for the signature.
#[api_handler(
    post,
    path = "/api/stripe/webhook",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = OK, description = "Event accepted", body = WebhookAck),
        (status = BAD_REQUEST, description = "Bad signature or body", body = ErrorBody),
    ),
    tag = COMMERCE_TAG,
)]
pub(crate) async fn webhook_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let commerce = state.try_get_slice::<Commerce>()?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| CommerceError::signature("missing Stripe-Signature header"))?;
    if let Err(err) = commerce.webhooks.verify(signature, &body, Utc::now().timestamp()) {
        warn!(error = %err, "Webhook rejected");
        return Err(err.into());
    }

    let trail = feq_audit::trail(&state);
    match fulfilment::handle_event(&state.database, &trail, &body).await? {
        Outcome::Recorded { session_id, fulfilled } => debug!(%session_id, fulfilled, "Order recorded"),
        Outcome::Replayed | Outcome::Ignored => {},
    }

    Ok(Json(WebhookAck { received: true }))
}
