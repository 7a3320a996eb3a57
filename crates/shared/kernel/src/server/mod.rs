//! HTTP surface shared by the feature slices.

pub mod cookies;
pub mod error;
pub mod experiment;
pub mod extract;
mod health;
pub mod router;
pub mod state;
pub mod validate;

pub use error::{ApiError, ErrorBody};
pub use extract::{ValidJson, ValidQuery};
pub use state::{ApiState, ApiStateBuilder, ApiStateError};
pub use validate::Validate;
