use std::borrow::Cow;

/// Errors raised by the `PostgREST`/`GoTrue` client.
///
/// Statuses follow what the upstream reported so handlers can forward them unchanged.
#[feq_derive::feq_error]
pub enum DatabaseError {
    /// The client was built with missing or malformed settings.
    #[error("Database configuration error{}: {message}", format_context(.context))]
    Config { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A single-row read matched nothing.
    #[status(404)]
    #[error("Row not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Unique or foreign key violation.
    #[status(409)]
    #[error("Conflicting write{}: {message}", format_context(.context))]
    Conflict { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Malformed filter or value rejected by Postgres.
    #[status(400)]
    #[error("Rejected request{}: {message}", format_context(.context))]
    BadRequest { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Missing, expired or invalid credentials.
    #[status(401)]
    #[error("Unauthorized{}: {message}", format_context(.context))]
    Unauthorized { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Row level security denied the operation.
    #[status(403)]
    #[error("Forbidden{}: {message}", format_context(.context))]
    Forbidden { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Any other non-success answer from the backend.
    #[error("Upstream error{} ({status}): {message}", format_context(.context))]
    Upstream { status: u16, message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Transport error{}: {source}", format_context(.context))]
    Transport { source: reqwest::Error, context: Option<Cow<'static, str>> },

    #[error("Decoding error{}: {source}", format_context(.context))]
    Decode { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Internal database error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl DatabaseError {
    /// Whether the upstream reported that the row does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
