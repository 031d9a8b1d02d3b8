//! Tracing setup for the terminal client.
//!
//! The mic control owns the terminal, so logs go only to
//! `{log_dir}/parley.{date}` (daily rotation via tracing-appender).
//! `RUST_LOG` picks the filter (default: warn); `--verbose` forces debug.

use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::CliError;

/// `{data_dir}/parley/logs`, or `./logs` when the platform has no data dir.
pub fn default_log_dir() -> PathBuf {
    dirs::data_dir().map_or_else(|| PathBuf::from("logs"), |dir| dir.join("parley").join("logs"))
}

/// Filter used when `--verbose` is set or `RUST_LOG` is absent.
pub const fn fallback_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new(fallback_directive(true));
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_directive(false)))
}

/// Install the global subscriber writing to `log_dir`.
///
/// A second call is a no-op.
pub fn init(log_dir: &Path, verbose: bool) -> Result<(), CliError> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| CliError::Io(format!("Failed to create log directory: {e}")))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "parley");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .compact(),
        )
        .try_init()
        .ok();

    // The writer must outlive every span; the process exit flushes it.
    std::mem::forget(guard);
    Ok(())
}
