//! Stripe webhook events.
//!
//! Orders are keyed by the Checkout Session id, so a replayed event finds its order
//! already stored and does nothing. Fulfilment problems are logged and the event is
//! still acknowledged; the order stays `paid` for someone to follow up.

use crate::error::{CommerceError, CommerceErrorExt};
use feq_audit::AuditTrail;
use feq_database::{Database, Returning};
use feq_kernel::domain::constants::{ENROLLMENTS, ORDERS, RPC_GRANT_SEATS};
use fxhash::FxHashMap;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, instrument};
use uuid::Uuid;

pub(crate) const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Deserialize)]
struct Event {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: Value,
}

#[derive(Debug, Deserialize)]
struct CustomerDetails {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletedSession {
    pub(crate) id: String,
    customer_email: Option<String>,
    customer_details: Option<CustomerDetails>,
    amount_total: Option<i64>,
    currency: Option<String>,
    #[serde(default)]
    pub(crate) metadata: FxHashMap<String, String>,
}

impl CompletedSession {
    fn email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|details| details.email.as_deref())
            .or(self.customer_email.as_deref())
    }

    fn kind(&self) -> &str {
        self.metadata.get("kind").map_or("parts", String::as_str)
    }

    fn uuid(&self, key: &str) -> Result<Option<Uuid>, CommerceError> {
        self.metadata
            .get(key)
            .map(|raw| raw.parse())
            .transpose()
            .map_err(|_| CommerceError::invalid(format!("metadata {key} is not a valid id")))
    }
}

/// What happened to a verified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Not an event this store acts on.
    Ignored,
    /// The order was already recorded.
    Replayed,
    /// New order recorded; `fulfilled` is false when fulfilment failed.
    Recorded { session_id: String, fulfilled: bool },
}

/// Handles the raw body of a verified event.
///
/// # Errors
/// [`CommerceError::Invalid`] for bodies that are not Stripe events, storage errors while
/// recording the order.
#[instrument(skip_all)]
pub(crate) async fn handle_event(
    db: &Database,
    trail: &AuditTrail,
    payload: &[u8],
) -> Result<Outcome, CommerceError> {
    let event: Event = serde_json::from_slice(payload)
        .map_err(|err| CommerceError::invalid(format!("malformed event: {err}")))?;
    if event.kind != CHECKOUT_COMPLETED {
        info!(event_id = %event.id, kind = %event.kind, "Webhook event acknowledged");
        return Ok(Outcome::Ignored);
    }

    let session: CompletedSession = serde_json::from_value(event.data.object)
        .map_err(|err| CommerceError::invalid(format!("malformed checkout session: {err}")))?;

    if !record_order(db, &session).await? {
        info!(session_id = %session.id, "Checkout session already recorded");
        return Ok(Outcome::Replayed);
    }

    let fulfilled = match fulfil(db, &session).await {
        Ok(()) => true,
        Err(err) => {
            error!(session_id = %session.id, error = %err, "Order fulfilment failed");
            false
        },
    };

    trail
        .record(
            session.uuid("user_id").ok().flatten(),
            "order.paid",
            ORDERS,
            Some(&session.id),
            json!({ "kind": session.kind(), "fulfilled": fulfilled, "amount_total": session.amount_total }),
        )
        .await;

    Ok(Outcome::Recorded { session_id: session.id, fulfilled })
}

/// Stores the order; `false` when it already existed.
async fn record_order(db: &Database, session: &CompletedSession) -> Result<bool, CommerceError> {
    let inserted: Vec<Value> = db
        .service()
        .from(ORDERS)
        .select("id")
        .insert_new(
            &json!({
                "stripe_session_id": session.id,
                "kind": session.kind(),
                "email": session.email(),
                "user_id": session.uuid("user_id").ok().flatten(),
                "amount_total": session.amount_total,
                "currency": session.currency,
                "status": "paid",
                "metadata": session.metadata,
            }),
            "stripe_session_id",
        )
        .await
        .context("Recording order")?;
    Ok(!inserted.is_empty())
}

async fn fulfil(db: &Database, session: &CompletedSession) -> Result<(), CommerceError> {
    if session.kind() == "training" {
        let course_id = session
            .uuid("course_id")?
            .ok_or_else(|| CommerceError::invalid("training order without a course"))?;
        let seats: u32 = session
            .metadata
            .get("seats")
            .map_or(Ok(1), |raw| raw.parse())
            .map_err(|_| CommerceError::invalid("metadata seats is not a number"))?;

        if let Some(org_id) = session.uuid("org_id")? {
            db.service()
                .rpc_void(
                    RPC_GRANT_SEATS,
                    &json!({ "p_org_id": org_id, "p_course_id": course_id, "p_quantity": seats }),
                )
                .await
                .context("Granting seats")?;
            info!(%org_id, %course_id, seats, "Seats granted");
        } else if let Some(user_id) = session.uuid("user_id")? {
            let _: Vec<Value> = db
                .service()
                .from(ENROLLMENTS)
                .insert(&json!({ "user_id": user_id, "course_id": course_id }), Returning::Minimal)
                .await
                .context("Enrolling buyer")?;
            info!(%user_id, %course_id, "Buyer enrolled");
        } else {
            return Err(CommerceError::invalid("training order without an organization or buyer"));
        }
    }

    let _: Vec<Value> = db
        .service()
        .from(ORDERS)
        .eq("stripe_session_id", &session.id)
        .update(&json!({ "status": "fulfilled" }), Returning::Minimal)
        .await
        .context("Marking order fulfilled")?;
    Ok(())
}
