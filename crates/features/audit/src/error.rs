use std::borrow::Cow;

/// Audit slice error type.
#[feq_derive::feq_error]
pub enum AuditError {
    #[status(source)]
    #[error("Audit write failed{}: {source}", format_context(.context))]
    Database { source: feq_database::DatabaseError, context: Option<Cow<'static, str>> },
    #[error("Audit error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
