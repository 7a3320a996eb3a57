//! Request-facing security helpers.

pub mod codes;
pub mod redirect;
pub mod resource;

pub use codes::{CODE_ALPHABET, random_code};
pub use redirect::safe_next;
pub use resource::{ResourceGuard, ResourceGuardError};
