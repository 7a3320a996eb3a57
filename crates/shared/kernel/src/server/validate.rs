//! Request body validation.

use std::borrow::Cow;

/// Checks a deserialized request beyond what its types express.
pub trait Validate {
    /// # Errors
    /// A message naming the offending field.
    fn validate(&self) -> Result<(), Cow<'static, str>>;
}

/// Rejects empty or whitespace-only values.
pub fn non_blank(field: &'static str, value: &str) -> Result<(), Cow<'static, str>> {
    if value.trim().is_empty() { Err(format!("{field} is required").into()) } else { Ok(()) }
}

/// Rejects values longer than `max` characters.
pub fn max_len(field: &'static str, value: &str, max: usize) -> Result<(), Cow<'static, str>> {
    if value.chars().count() > max {
        Err(format!("{field} must be at most {max} characters").into())
    } else {
        Ok(())
    }
}

/// A deliberately loose address check: one `@`, something on each side, a dot in the domain.
pub fn email(field: &'static str, value: &str) -> Result<(), Cow<'static, str>> {
    let value = value.trim();
    let valid = value.len() <= 254
        && !value.contains(char::is_whitespace)
        && value.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|label| !label.is_empty())
        });

    if valid { Ok(()) } else { Err(format!("{field} must be a valid email address").into()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_rules() {
        assert!(email("email", "op@example.com").is_ok());
        assert!(email("email", "op@localhost").is_err());
        assert!(email("email", "op@@example.com").is_err());
        assert!(email("email", "o p@example.com").is_err());
        assert!(email("email", "@example.com").is_err());
    }

    #[test]
    fn length_rules() {
        assert!(non_blank("name", "  ").is_err());
        assert!(max_len("zip", "123456", 5).is_err());
        assert!(max_len("zip", "12345", 5).is_ok());
    }
}
