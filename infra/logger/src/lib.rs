//! # Logger
//!
//! Installs the process-wide `tracing` subscriber: a compact console layer plus an optional
//! rolling file layer (plain or JSON) written through a non-blocking worker.
//!
//! Filtering starts from the configured level, then an explicit directive string
//! (e.g. `"feq_commerce=debug,hyper=warn"`); without one `RUST_LOG` is honoured.
//!
//! ## Example
//!
//! ```rust
//! use feq_logger::{LevelFilter, Logger};
//!
//! let _logger = Logger::builder()
//!     .service("feq-server")
//!     .level(LevelFilter::DEBUG)
//!     .init()
//!     .unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use std::fs;
use std::marker::PhantomData;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_MAX_FILES: usize = 14;
const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug)]
struct Settings {
    console: bool,
    directory: Option<PathBuf>,
    level: LevelFilter,
    rotation: Rotation,
    max_files: usize,
    json: bool,
    directives: Option<String>,
    unknown_level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            console: true,
            directory: None,
            level: LevelFilter::INFO,
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
            json: false,
            directives: None,
            unknown_level: None,
        }
    }
}

/// Builder state: no service name yet.
#[derive(Debug)]
pub struct Unnamed;
/// Builder state: service name set.
#[derive(Debug)]
pub struct Named(String);
/// Builder state: console only.
#[derive(Debug)]
pub struct ConsoleOnly;
/// Builder state: file output configured.
#[derive(Debug)]
pub struct WithFiles;

mod sealed {
    pub trait State {}
}
impl sealed::State for Unnamed {}
impl sealed::State for Named {}
impl sealed::State for ConsoleOnly {}
impl sealed::State for WithFiles {}

/// Configures and installs the global subscriber.
///
/// File-only knobs (`rotation`, `max_files`, `json`) are available once a directory is set.
#[derive(Debug)]
pub struct LoggerBuilder<N: sealed::State = Unnamed, F: sealed::State = ConsoleOnly> {
    settings: Settings,
    service: N,
    files: PhantomData<F>,
}

impl<F: sealed::State> LoggerBuilder<Unnamed, F> {
    /// Names the service; also used as the log file prefix.
    pub fn service(self, name: impl Into<String>) -> LoggerBuilder<Named, F> {
        LoggerBuilder { settings: self.settings, service: Named(name.into()), files: PhantomData }
    }
}

impl LoggerBuilder<Named, WithFiles> {
    #[must_use]
    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        self.settings.rotation = rotation;
        self
    }

    #[must_use]
    pub const fn max_files(mut self, max: usize) -> Self {
        self.settings.max_files = max;
        self
    }

    /// Writes the file layer as JSON lines.
    #[must_use]
    pub const fn json(mut self, enabled: bool) -> Self {
        self.settings.json = enabled;
        self
    }
}

impl<F: sealed::State> LoggerBuilder<Named, F> {
    #[must_use]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.settings.level = level;
        self
    }

    /// Parses a level name (`"trace"`..`"error"`, `"off"`); unknown names are rejected by
    /// [`LoggerBuilder::init`].
    #[must_use]
    pub fn level_name(mut self, level: &str) -> Self {
        match level.parse::<LevelFilter>() {
            Ok(parsed) => self.settings.level = parsed,
            Err(_) => self.settings.unknown_level = Some(level.to_owned()),
        }
        self
    }

    /// Adds filter directives on top of the level. Overrides `RUST_LOG`.
    #[must_use]
    pub fn directives(mut self, directives: impl Into<String>) -> Self {
        let directives = directives.into();
        if !directives.trim().is_empty() {
            self.settings.directives = Some(directives);
        }
        self
    }

    #[must_use]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.settings.console = enabled;
        self
    }

    /// Enables the rolling file layer in `directory`.
    pub fn directory(self, directory: impl Into<PathBuf>) -> LoggerBuilder<Named, WithFiles> {
        let mut settings = self.settings;
        settings.directory = Some(directory.into());
        LoggerBuilder { settings, service: self.service, files: PhantomData }
    }

    /// Installs the subscriber.
    ///
    /// Keep the returned [`Logger`] alive until shutdown: it owns the file worker guard.
    ///
    /// # Errors
    /// [`LoggerError::InvalidConfiguration`] for bad settings, [`LoggerError::Subscriber`] when a
    /// global subscriber is already installed.
    pub fn init(self) -> Result<Logger, LoggerError> {
        let Settings {
            console,
            directory,
            level,
            rotation,
            max_files,
            json,
            directives,
            unknown_level,
        } = self.settings;
        let service = self.service.0;

        if let Some(name) = unknown_level {
            return Err(LoggerError::InvalidConfiguration {
                message: format!("unknown log level '{name}'").into(),
                context: None,
            });
        }
        if service.trim().is_empty() {
            return Err(invalid("service name cannot be empty"));
        }
        if max_files == 0 {
            return Err(invalid("max_files must be greater than zero"));
        }

        let filter = env_filter(level, directives.as_deref())?;
        let mut layers = Vec::new();

        if console {
            layers.push(layer().compact().with_target(true).boxed());
        }

        let guard = match directory {
            Some(directory) => {
                fs::create_dir_all(&directory)
                    .context(format!("creating {}", directory.display()))?;

                let appender = RollingFileAppender::builder()
                    .rotation(rotation)
                    .filename_prefix(&service)
                    .filename_suffix(LOG_FILE_SUFFIX)
                    .max_log_files(max_files)
                    .build(&directory)?;
                let (writer, guard) = tracing_appender::non_blocking(appender);

                let file_layer = layer().with_writer(writer).with_ansi(false);
                layers.push(if json { file_layer.json().boxed() } else { file_layer.boxed() });
                Some(guard)
            },
            None => None,
        };

        if layers.is_empty() {
            return Err(invalid("no output enabled; enable the console or set a log directory"));
        }

        tracing_subscriber::registry().with(filter).with(layers).try_init()?;
        tracing::debug!(%service, "Logger installed");

        Ok(Logger { guard })
    }
}

/// Handle to the installed subscriber. Dropping it flushes and stops the file worker.
#[must_use = "dropping the logger stops background file logging"]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder { settings: Settings::default(), service: Unnamed, files: PhantomData }
    }

    /// Whether a file layer with a background writer is active.
    #[must_use]
    pub const fn writes_files(&self) -> bool {
        self.guard.is_some()
    }
}

fn invalid(message: &'static str) -> LoggerError {
    LoggerError::InvalidConfiguration { message: message.into(), context: None }
}

fn env_filter(level: LevelFilter, directives: Option<&str>) -> Result<EnvFilter, LoggerError> {
    let builder = EnvFilter::builder().with_default_directive(level.into());
    match directives {
        None => Ok(builder.from_env_lossy()),
        Some(raw) => builder.parse(raw).map_err(|e| LoggerError::InvalidConfiguration {
            message: format!("invalid filter '{raw}': {e}").into(),
            context: None,
        }),
    }
}
