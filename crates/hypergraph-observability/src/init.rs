// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output in text or JSON, plus a daily-rolling JSON file when the
//! `file-logging` feature is on and `logging.file_output` is set.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hypergraph_config::HypergraphConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

/// Keeps background log writers alive; dropping it flushes file output
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Directory holding file logs, if file output is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Map config-style level names onto `EnvFilter` levels
fn normalize_level(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        "" => "info".to_string(),
        other => other.to_string(),
    }
}

/// Filter directive for the given flags and configured base level
pub fn filter_directive(debug_flags: &CrateDebugFlags, base_level: &str) -> String {
    debug_flags.to_filter_string(&normalize_level(base_level))
}

/// Install the global tracing subscriber
///
/// # Errors
///
/// Fails if the filter directive is malformed, the log directory cannot be
/// created, or a global subscriber is already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, config: &HypergraphConfig) -> Result<LoggingGuard> {
    let directive = filter_directive(debug_flags, &config.system.log_level);
    let make_filter = || {
        EnvFilter::try_new(&directive)
            .with_context(|| format!("Invalid log filter directive '{}'", directive))
    };

    let mut layers = Vec::new();

    if config.logging.format.eq_ignore_ascii_case("json") {
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_filter(make_filter()?)
                .boxed(),
        );
    } else {
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .with_filter(make_filter()?)
                .boxed(),
        );
    }

    #[cfg(feature = "file-logging")]
    let mut file_guards = Vec::new();
    #[allow(unused_mut)]
    let mut log_dir: Option<PathBuf> = None;

    if config.logging.file_output {
        #[cfg(feature = "file-logging")]
        {
            let dir = &config.logging.log_dir;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

            let appender = tracing_appender::rolling::daily(
                dir,
                format!("{}.log", config.logging.log_file_prefix),
            );
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            file_guards.push(guard);

            layers.push(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json()
                    .with_filter(make_filter()?)
                    .boxed(),
            );
            log_dir = Some(dir.clone());
        }
    }

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    if config.logging.file_output && log_dir.is_none() {
        tracing::warn!(
            target: "config",
            "logging.file_output is set but the file-logging feature is not compiled in"
        );
    }

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
        log_dir,
    })
}

/// Initialize logging from process arguments, `HYPERGRAPH_DEBUG` and defaults
pub fn init_logging_default() -> Result<LoggingGuard> {
    init_logging(&crate::cli::parse_debug_flags(), &HypergraphConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_normalization() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-region".to_string()]);
        assert_eq!(filter_directive(&flags, "WARNING"), "region=debug,warn");
        assert_eq!(filter_directive(&CrateDebugFlags::default(), ""), "info");
    }

    #[test]
    fn test_second_init_fails() {
        let config = HypergraphConfig::default();
        let flags = CrateDebugFlags::default();
        let first = init_logging(&flags, &config);
        assert!(first.is_ok());
        assert!(first.unwrap().log_dir().is_none());
        assert!(init_logging(&flags, &config).is_err());
    }
}
