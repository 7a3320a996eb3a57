#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by every crate of the platform: error enums with HTTP status
//! metadata, API data models, `OpenAPI`-documented handlers, feature slice handles and the
//! runtime entry point.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! feq-derive.workspace = true
//! ```
//!
//! Examples are `ignore`d because they need the consuming crates (`feq-kernel`,
//! `feq-runtime`, `utoipa`) to expand.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, ItemStruct, parse_macro_input};

/// Attribute macro to bootstrap the platform Tokio runtime.
///
/// Transforms an `async fn main` into a standard `fn main` that builds a runtime from
/// a `feq_runtime::RuntimeConfig` profile and blocks on the body.
///
/// # Arguments
///
/// * `server` - Multi-threaded profile for the HTTP server.
/// * `default` - Worker threads detected from available parallelism.
///
/// # Examples
///
/// ```rust,ignore
/// #[feq_runtime::main(server)]
/// async fn main() -> anyhow::Result<()> {
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::runtime::expand_main(args.into(), input).into()
}

/// Defines a request/response data model.
///
/// # Injected Behaviors
///
/// * **Derives**: `Debug`, `Serialize`, `Deserialize` and `utoipa::ToSchema` when missing.
/// * **Serde Policy**: `deny_unknown_fields` by default so request bodies are validated
///   strictly; `rename_all` is only added when requested.
///
/// # Arguments
///
/// * `rename_all = "camelCase"` - Adds a Serde rename policy.
/// * `deny_unknown_fields = false` - Accepts unknown fields (use for upstream payloads).
///
/// # Example
///
/// ```rust,ignore
/// use feq_derive::api_model;
///
/// #[api_model]
/// pub struct LoginRequest {
///     pub email: String,
///     pub password: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn api_model(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::api::expand_api_model(attr.into(), input).into()
}

/// Bridges an Axum handler with its `OpenAPI` description.
///
/// Accepts standard `utoipa::path` arguments such as `get`, `post`, `path = "..."`,
/// `request_body = ...`, `responses(...)`, and `tag = "..."`.
///
/// # Example
///
/// ```rust,ignore
/// use feq_derive::api_handler;
///
/// #[api_handler(
///     get,
///     path = "/health",
///     responses((status = OK, body = HealthResponse)),
///     tag = "System"
/// )]
/// pub async fn health_handler() -> impl IntoResponse {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn api_handler(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::api::expand_api_handler(args.into(), input).into()
}

/// Defines a domain error enum.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]`.
/// * **Context Support**: Generates a companion `...Ext` trait that adds `.context()`
///   to any `Result` that can be converted into this error type.
/// * **Standard Conversions**: Implements `From<T>` for variants containing a source field,
///   enabling `?` on upstream errors.
/// * **Internal Fallback**: `From<&'static str>` and `From<String>` when an `Internal`
///   variant is present.
/// * **HTTP status**: A variant annotated with `#[status(404)]` reports that code from the
///   generated `status_code()`; unannotated variants report `500`.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with named-field variants.
/// 2. Variants that support context must include a `context: Option<Cow<'static, str>>` field.
/// 3. Variants wrapping external errors must include a `source: T` field or a field marked
///    with `#[source]`/`#[from]`, plus a context field.
///
/// # Example
///
/// ```rust,ignore
/// use feq_derive::feq_error;
/// use std::borrow::Cow;
///
/// #[feq_error]
/// pub enum TrainingError {
///     #[status(404)]
///     #[error("Not found{}: {message}", format_context(.context))]
///     NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
/// ```
#[proc_macro_attribute]
pub fn feq_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}

/// Defines a feature slice handle.
///
/// 1. Generates a thread-safe `Arc` wrapper around a `...Inner` struct.
/// 2. Implements `Deref` for transparent access to the inner state.
/// 3. Implements `FeatureSlice` and `into_slice()` for registration in the kernel.
///
/// # Example
/// ```rust,ignore
/// #[feq_derive::feq_slice]
/// pub struct Training {
///     pub exam: ExamConfig,
/// }
///
/// fn init(exam: ExamConfig) -> InitializedSlice {
///     Training::new(TrainingInner { exam }).into_slice()
/// }
/// ```
#[proc_macro_attribute]
pub fn feq_slice(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as ItemStruct);
    macros::slice::expand_slice(input).into()
}
