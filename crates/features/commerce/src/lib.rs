//! # Commerce
//!
//! The storefront: a searchable parts catalog, equipment rental requests, Stripe
//! Checkout for parts and training seats, and the webhook that records and fulfils paid
//! orders.

mod catalog;
mod checkout;
mod error;
mod fulfilment;
mod handlers;
pub mod model;
mod rentals;
pub mod stripe;

pub use crate::error::{CommerceError, CommerceErrorExt};
pub use crate::stripe::{StripeClient, WebhookVerifier};

use feq_kernel::domain::config::ApiConfig;
use feq_kernel::domain::registry::InitializedSlice;
use feq_kernel::server::ApiState;
use std::time::Duration;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

const STRIPE_TIMEOUT: Duration = Duration::from_secs(15);

/// Commerce feature state.
#[feq_derive::feq_slice]
pub struct Commerce {
    pub stripe: StripeClient,
    pub webhooks: WebhookVerifier,
    pub success_url: String,
    pub cancel_url: String,
    /// ISO currency for ad hoc prices
    pub currency: String,
    /// Where rental requests are sent
    pub sales_inbox: String,
}

/// Initialize the commerce feature from `payments`, `site` and `mailer` settings.
///
/// # Errors
/// [`CommerceError::Http`] when the Stripe HTTP client cannot be built.
pub fn init(config: &ApiConfig) -> Result<InitializedSlice, CommerceError> {
    let payments = &config.payments;
    let site = config.site.base_url.trim_end_matches('/');
    let stripe = StripeClient::new(&payments.api_url, payments.secret_key.expose(), STRIPE_TIMEOUT)?;
    let webhooks =
        WebhookVerifier::new(payments.webhook_secret.expose(), payments.webhook_tolerance_seconds);

    tracing::info!(checkout = stripe.is_configured(), "Commerce slice initialized");
    Ok(Commerce::new(CommerceInner {
        stripe,
        webhooks,
        success_url: format!("{site}{}", payments.success_path),
        cancel_url: format!("{site}{}", payments.cancel_path),
        currency: payments.currency.to_lowercase(),
        sales_inbox: config.mailer.sales_inbox.clone(),
    })
    .into_slice())
}

/// Catalog, rental, checkout and webhook routes.
pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::parts_handler))
        .routes(routes!(handlers::part_handler))
        .routes(routes!(handlers::rental_handler))
        .routes(routes!(handlers::checkout_handler))
        .routes(routes!(handlers::webhook_handler))
}
