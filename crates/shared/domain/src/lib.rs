//! # Domain
//!
//! Pure data shared by every crate: typed configuration, table and route constants,
//! organization roles and the feature slice registry.
//! No I/O, networking or business logic lives here.

pub mod config;
pub mod constants;
pub mod registry;
pub mod roles;
