//! Common imports for feature slices.

pub use crate::domain::config::ApiConfig;
pub use crate::domain::registry::InitializedSlice;
pub use crate::security::{ResourceGuard, random_code, safe_next};
pub use crate::server::validate::{self, Validate};
pub use crate::server::{ApiError, ApiState, ErrorBody, ValidJson, ValidQuery};
pub use feq_database::Database;
pub use feq_mailer::Mailer;
