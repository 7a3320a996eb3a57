//! Stripe Checkout Sessions for parts and training seats.
//!
//! Everything fulfilment needs later travels in the session metadata, so the webhook
//! never has to trust anything but Stripe's own event.

use crate::CommerceInner;
use crate::catalog::parts_by_slugs;
use crate::error::{CommerceError, CommerceErrorExt};
use crate::model::{CheckoutKind, CheckoutRequest, CheckoutSession};
use feq_database::Database;
use feq_identity::CurrentUser;
use feq_kernel::domain::constants::COURSES;
use feq_kernel::domain::roles::Permission;
use feq_kernel::security::ResourceGuard;
use feq_organization::require_permission;
use serde::Deserialize;
use tracing::{info, instrument};

#[derive(Debug, Deserialize)]
struct CourseOffer {
    id: uuid::Uuid,
    title: String,
    price_cents: Option<i64>,
    stripe_price_id: Option<String>,
}

/// Form fields of a Checkout Session, in Stripe's bracket notation.
#[derive(Debug, Default)]
struct Form(Vec<(String, String)>);

impl Form {
    fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.push((key.into(), value.to_string()));
    }

    fn line_item(
        &mut self,
        index: usize,
        stripe_price_id: Option<&str>,
        name: &str,
        unit_amount: i64,
        currency: &str,
        quantity: u32,
    ) {
        let prefix = format!("line_items[{index}]");
        match stripe_price_id.filter(|id| !id.is_empty()) {
            Some(price) => self.set(format!("{prefix}[price]"), price),
            None => {
                self.set(format!("{prefix}[price_data][currency]"), currency);
                self.set(format!("{prefix}[price_data][unit_amount]"), unit_amount);
                self.set(format!("{prefix}[price_data][product_data][name]"), name);
            },
        }
        self.set(format!("{prefix}[quantity]"), quantity);
    }
}

impl CommerceInner {
    /// Opens a hosted checkout page for `request`.
    ///
    /// Training purchases need a signed-in buyer; buying seats for an organization also
    /// needs its billing permission.
    ///
    /// # Errors
    /// [`CommerceError::NotFound`] for unknown parts or courses,
    /// [`CommerceError::Forbidden`] for anonymous training purchases,
    /// [`CommerceError::Provider`] when Stripe refuses the session.
    #[instrument(skip(self, db, buyer, request), fields(kind = request.kind.as_str()))]
    pub(crate) async fn checkout(
        &self,
        db: &Database,
        buyer: Option<&CurrentUser>,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, CommerceError> {
        let mut form = Form::default();
        form.set("mode", "payment");
        form.set("success_url", format!("{}?session_id={{CHECKOUT_SESSION_ID}}", self.success_url));
        form.set("cancel_url", &self.cancel_url);
        form.set("metadata[kind]", request.kind.as_str());

        let email = request.email.as_deref().or_else(|| buyer.and_then(CurrentUser::email));
        if let Some(email) = email {
            form.set("customer_email", email.trim());
        }
        if let Some(buyer) = buyer {
            form.set("client_reference_id", buyer.id());
            form.set("metadata[user_id]", buyer.id());
        }

        match request.kind {
            CheckoutKind::Parts => self.parts_items(db, request, &mut form).await?,
            CheckoutKind::Training => self.training_items(db, buyer, request, &mut form).await?,
        }

        let session = self.stripe.create_checkout_session(&form.0).await?;
        info!(session_id = %session.id, "Checkout session created");
        Ok(session)
    }

    async fn parts_items(
        &self,
        db: &Database,
        request: &CheckoutRequest,
        form: &mut Form,
    ) -> Result<(), CommerceError> {
        let slugs = request
            .items
            .iter()
            .map(|item| ResourceGuard::slug(&item.slug))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| CommerceError::invalid(err.to_string()))?;
        let parts = parts_by_slugs(db, &slugs).await?;

        for (index, (item, slug)) in request.items.iter().zip(&slugs).enumerate() {
            let part = parts
                .iter()
                .find(|part| &part.slug == slug)
                .ok_or_else(|| CommerceError::not_found(format!("no part '{slug}'")))?;
            if !part.in_stock {
                return Err(CommerceError::invalid(format!("{} is out of stock", part.name)));
            }
            form.line_item(
                index,
                part.stripe_price_id.as_deref(),
                &part.name,
                part.price_cents,
                &self.currency,
                item.quantity,
            );
        }
        Ok(())
    }

    async fn training_items(
        &self,
        db: &Database,
        buyer: Option<&CurrentUser>,
        request: &CheckoutRequest,
        form: &mut Form,
    ) -> Result<(), CommerceError> {
        let buyer = buyer.ok_or_else(|| CommerceError::Forbidden {
            message: "sign in to buy training".into(),
            context: None,
        })?;
        if let Some(org_id) = request.org_id {
            require_permission(db, org_id, buyer.id(), Permission::MANAGE_BILLING).await?;
            form.set("metadata[org_id]", org_id);
        }

        let slug = ResourceGuard::slug(request.course_slug.as_deref().unwrap_or_default())
            .map_err(|err| CommerceError::invalid(err.to_string()))?;
        let course: Option<CourseOffer> = db
            .anon()
            .from(COURSES)
            .select("id,title,price_cents,stripe_price_id")
            .eq("slug", &slug)
            .eq("active", true)
            .fetch_optional()
            .await
            .context("Loading course")?;
        let course = course.ok_or_else(|| CommerceError::not_found(format!("no course '{slug}'")))?;
        if course.stripe_price_id.is_none() && course.price_cents.is_none() {
            return Err(CommerceError::Config {
                message: format!("course '{slug}' has no price").into(),
                context: None,
            });
        }

        let seats = request.seats.unwrap_or(1);
        form.set("metadata[course_id]", course.id);
        form.set("metadata[seats]", seats);
        form.line_item(
            0,
            course.stripe_price_id.as_deref(),
            &course.title,
            course.price_cents.unwrap_or_default(),
            &self.currency,
            seats,
        );
        Ok(())
    }
}
