use crate::domain::constants::LOGIN_PATH;

/// Validates a post-login redirect target.
///
/// Only same-site absolute paths are accepted. Protocol-relative URLs (`//evil.com`),
/// backslashes, control characters, anything carrying a scheme, and the login and auth
/// pages themselves (which would loop) fall back to `fallback`.
///
/// ```rust
/// use feq_kernel::security::safe_next;
///
/// assert_eq!(safe_next(Some("/training/forklift"), "/training"), "/training/forklift");
/// assert_eq!(safe_next(Some("//evil.com"), "/training"), "/training");
/// assert_eq!(safe_next(None, "/training"), "/training");
/// ```
#[must_use]
pub fn safe_next(next: Option<&str>, fallback: &str) -> String {
    next.map(str::trim)
        .filter(|candidate| is_safe(candidate))
        .unwrap_or(fallback)
        .to_owned()
}

fn is_safe(candidate: &str) -> bool {
    if !candidate.starts_with('/') || candidate.starts_with("//") {
        return false;
    }
    if candidate.contains('\\') || candidate.chars().any(char::is_control) {
        return false;
    }

    let path = candidate.split(['?', '#']).next().unwrap_or_default();
    if path.contains("://") || path.to_ascii_lowercase().contains("javascript:") {
        return false;
    }

    let lowered = path.to_ascii_lowercase();
    lowered != LOGIN_PATH
        && !lowered.starts_with("/login/")
        && lowered != "/auth"
        && !lowered.starts_with("/auth/")
}
