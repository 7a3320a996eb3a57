use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

/// Prefix of environment overrides, e.g. `FEQ__DATABASE__URL`.
pub const ENV_PREFIX: &str = "FEQ";
const DEFAULT_FILE: &str = "server";

#[feq_derive::feq_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads a configuration from a file overlaid with `FEQ__` environment variables.
///
/// Without an explicit path the optional `server.{toml,yaml,json}` of the working
/// directory is used, so a deployment may configure itself from the environment alone.
/// An explicit path must exist. Nested keys use `__` (`FEQ__EXAM__QUESTION_COUNT=25`).
///
/// # Errors
/// Fails when an explicit file is missing, a source cannot be parsed, or the merged
/// values do not match `T`.
///
/// # Example
/// ```rust
/// use feq_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let (file, required) = path.map_or_else(
        || (PathBuf::from(DEFAULT_FILE), false),
        |p| (p.as_ref().to_path_buf(), true),
    );

    info!(file = %file.display(), required, "Loading configuration");

    Config::builder()
        .add_source(File::from(file.as_path()).required(required))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")
}
