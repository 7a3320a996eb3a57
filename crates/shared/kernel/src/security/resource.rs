use std::borrow::Cow;
use uuid::Uuid;

#[feq_derive::feq_error]
pub enum ResourceGuardError {
    #[status(400)]
    #[error("Resource validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

const MAX_SLUG_LEN: usize = 128;

/// Validation of identifiers taken from paths and bodies before they reach a query.
///
/// Values interpolated into `PostgREST` filters must never carry filter syntax
/// (`,`, `(`, `.`), so ids are parsed as UUIDs and slugs restricted to `[a-z0-9-]`.
#[derive(Debug)]
pub struct ResourceGuard;

impl ResourceGuard {
    /// Parses a row id.
    ///
    /// # Errors
    /// [`ResourceGuardError::Validation`] when `id` is not a UUID.
    pub fn id(id: impl AsRef<str>, resource: &'static str) -> Result<Uuid, ResourceGuardError> {
        Uuid::parse_str(id.as_ref().trim()).map_err(|_| ResourceGuardError::Validation {
            message: format!("Malformed {resource} id").into(),
            context: None,
        })
    }

    /// Normalizes a URL slug to lowercase.
    ///
    /// # Errors
    /// [`ResourceGuardError::Validation`] for empty, oversized or non `[a-z0-9-]` slugs.
    pub fn slug(slug: impl AsRef<str>) -> Result<String, ResourceGuardError> {
        let slug = slug.as_ref().trim().to_ascii_lowercase();
        let valid = !slug.is_empty()
            && slug.len() <= MAX_SLUG_LEN
            && slug.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');

        if valid {
            Ok(slug)
        } else {
            Err(ResourceGuardError::Validation { message: "Malformed slug".into(), context: None })
        }
    }

    /// Normalizes a human-entered code (certificate verification, seat invites).
    ///
    /// # Errors
    /// [`ResourceGuardError::Validation`] when the code is empty or not alphanumeric.
    pub fn code(code: impl AsRef<str>) -> Result<String, ResourceGuardError> {
        let code = code.as_ref().trim().to_ascii_uppercase();
        if !code.is_empty() && code.len() <= 64 && code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Ok(code)
        } else {
            Err(ResourceGuardError::Validation { message: "Malformed code".into(), context: None })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_syntax_is_rejected() {
        assert!(ResourceGuard::slug("mast-chain,id.eq.1").is_err());
        assert!(ResourceGuard::code("AB(C").is_err());
        assert!(ResourceGuard::id("1 or 1=1", "order").is_err());
    }

    #[test]
    fn values_are_normalized() {
        assert_eq!(ResourceGuard::slug(" Seat-Switch ").unwrap(), "seat-switch");
        assert_eq!(ResourceGuard::code("abc234").unwrap(), "ABC234");
    }
}
