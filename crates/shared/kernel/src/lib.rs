//! Kernel shared by every feature slice.
//!
//! * [`config`] - layered configuration loading (`server.toml` + `FEQ__*` environment).
//! * [`security`] - short human-friendly codes, open redirect protection, identifier guards.
//! * [`server`] - application state, the JSON error type, validated extractors, the A/B
//!   experiment cookie and the system routes.
//!
//! ## Codes
//! ```rust
//! use feq_kernel::security::codes::{CODE_ALPHABET, random_code};
//!
//! let code = random_code(10);
//! assert_eq!(code.len(), 10);
//! assert!(code.chars().all(|c| CODE_ALPHABET.contains(&c)));
//! ```

pub mod config;
pub mod prelude;
pub mod security;
pub mod server;

pub use feq_domain as domain;
