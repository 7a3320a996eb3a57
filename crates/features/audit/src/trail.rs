use crate::error::{AuditError, AuditErrorExt};
use feq_database::{Database, Returning};
use feq_kernel::domain::constants::AUDIT_LOGS;
use serde::Serialize;
use serde_json::Value;
use tracing::{instrument, warn};
use uuid::Uuid;

#[derive(Serialize)]
struct AuditRow<'a> {
    actor_id: Option<Uuid>,
    action: &'a str,
    entity: &'a str,
    entity_id: Option<&'a str>,
    meta: Value,
}

/// Append-only log of who did what, written with the service role.
#[derive(Debug, Clone)]
pub struct AuditTrail {
    db: Database,
}

impl AuditTrail {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Records an action. Failures are logged and never reach the caller.
    pub async fn record(
        &self,
        actor: Option<Uuid>,
        action: &str,
        entity: &str,
        entity_id: Option<&str>,
        meta: Value,
    ) {
        if let Err(err) = self.try_record(actor, action, entity, entity_id, meta).await {
            warn!(error = %err, action, entity, "Audit entry dropped");
        }
    }

    /// Records an action, reporting storage failures.
    ///
    /// # Errors
    /// [`AuditError::Database`] when the row cannot be written.
    #[instrument(skip(self, meta))]
    pub async fn try_record(
        &self,
        actor: Option<Uuid>,
        action: &str,
        entity: &str,
        entity_id: Option<&str>,
        meta: Value,
    ) -> Result<(), AuditError> {
        let row = AuditRow { actor_id: actor, action, entity, entity_id, meta };
        self.db
            .service()
            .from(AUDIT_LOGS)
            .insert::<_, Value>(&row, Returning::Minimal)
            .await
            .context("Writing audit log")?;
        Ok(())
    }
}
