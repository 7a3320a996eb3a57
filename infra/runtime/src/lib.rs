//! # Runtime
//!
//! Tokio runtime profiles shared by the binaries of the workspace.
//!
//! ## Profiles
//! * **server**: multi-threaded, one worker per core, larger stacks for the HTTP server.
//! * **default**: one worker per core with the standard stack size.
//!
//! Worker counts honour `TOKIO_WORKER_THREADS` when it holds a sane value.
//!
//! ## Example
//!
//! ```rust,ignore
//! #[feq_runtime::main(server)]
//! async fn main() -> anyhow::Result<()> {
//!     Ok(())
//! }
//! ```

pub use anyhow::Result;
pub use feq_derive::main;

use anyhow::Context;
use std::num::NonZero;
use std::sync::OnceLock;
use std::thread::available_parallelism;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

const FALLBACK_WORKERS: usize = 4;
const MAX_WORKERS: usize = 1024;
const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;
const MIN_STACK_SIZE: usize = 1024 * 1024;
const MAX_STACK_SIZE: usize = 16 * 1024 * 1024;
const DEFAULT_THREAD_NAME: &str = "feq-worker";

static DETECTED_WORKERS: OnceLock<usize> = OnceLock::new();

fn detected_workers() -> usize {
    *DETECTED_WORKERS.get_or_init(|| {
        std::env::var("TOKIO_WORKER_THREADS")
            .ok()
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|&n| (1..=MAX_WORKERS).contains(&n))
            .unwrap_or_else(|| {
                available_parallelism().map(NonZero::get).unwrap_or(FALLBACK_WORKERS)
            })
    })
}

/// Tokio runtime parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
    pub stack_size: usize,
    pub thread_name: String,
    pub thread_keep_alive: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: detected_workers(),
            stack_size: DEFAULT_STACK_SIZE,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            thread_keep_alive: Duration::from_secs(60),
        }
    }
}

impl RuntimeConfig {
    /// Profile for the HTTP server.
    #[must_use]
    pub fn server() -> Self {
        Self {
            worker_threads: detected_workers(),
            stack_size: 4 * 1024 * 1024,
            thread_name: "feq-server".to_owned(),
            thread_keep_alive: Duration::from_secs(300),
        }
    }

    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.clamp(1, MAX_WORKERS);
        self
    }

    #[must_use]
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = size.clamp(MIN_STACK_SIZE, MAX_STACK_SIZE);
        self
    }

    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.thread_name = if name.trim().is_empty() { DEFAULT_THREAD_NAME.to_owned() } else { name };
        self
    }

    /// Clamps every field into its accepted range.
    fn normalized(&self) -> Self {
        self.clone()
            .with_worker_threads(self.worker_threads)
            .with_stack_size(self.stack_size)
            .with_thread_name(self.thread_name.clone())
    }
}

/// Builds a multi-threaded runtime with I/O and timers enabled.
///
/// # Errors
/// Fails when the OS refuses to spawn the worker threads.
pub fn build_runtime_with_config(config: &RuntimeConfig) -> Result<Runtime> {
    let config = config.normalized();
    debug!(?config, "Building tokio runtime");

    Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .thread_name(&config.thread_name)
        .thread_stack_size(config.stack_size)
        .thread_keep_alive(config.thread_keep_alive)
        .enable_all()
        .build()
        .context("Failed to initialize tokio runtime")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_threads_are_clamped() {
        assert_eq!(RuntimeConfig::default().with_worker_threads(0).worker_threads, 1);
        assert_eq!(RuntimeConfig::default().with_worker_threads(5000).worker_threads, MAX_WORKERS);
    }

    #[test]
    fn stack_size_is_clamped() {
        assert_eq!(RuntimeConfig::default().with_stack_size(10).stack_size, MIN_STACK_SIZE);
        assert_eq!(RuntimeConfig::default().with_stack_size(usize::MAX).stack_size, MAX_STACK_SIZE);
    }

    #[test]
    fn blank_thread_name_falls_back() {
        let config = RuntimeConfig::server().with_thread_name("  ");
        assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
    }

    #[test]
    fn runtime_builds_and_runs() {
        let rt = build_runtime_with_config(&RuntimeConfig::default().with_worker_threads(2)).unwrap();
        assert_eq!(rt.block_on(async { 40 + 2 }), 42);
    }
}
