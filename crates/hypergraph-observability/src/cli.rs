// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing for per-subsystem debug flags
//!
//! Supports flags like `--debug-region`, `--debug-plasticity`, etc. Each name
//! is a tracing target, so the flag maps straight onto an `EnvFilter` directive.

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_TARGETS;

/// Parsed debug flags
///
/// # Example
/// ```rust
/// use hypergraph_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-region".to_string()]);
/// assert!(flags.is_enabled("region"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CrateDebugFlags {
    pub enabled_targets: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Parse debug flags from command-line arguments
    ///
    /// Looks for arguments matching `--debug-{target}`. `--debug-all` enables
    /// every known target.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = CrateDebugFlags::default();

        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
            } else if let Some(target) = arg.strip_prefix("--debug-") {
                if !target.is_empty() {
                    flags.enabled_targets.insert(target.to_string());
                }
            }
        }

        flags
    }

    fn enable_all(&mut self) {
        self.enabled_targets
            .extend(KNOWN_TARGETS.iter().map(|t| t.to_string()));
    }

    /// Check if debug is enabled for a specific target
    pub fn is_enabled(&self, target: &str) -> bool {
        self.enabled_targets.contains(target)
    }

    pub fn any_enabled(&self) -> bool {
        !self.enabled_targets.is_empty()
    }

    /// Log level for a target: `DEBUG` if flagged, `INFO` otherwise
    pub fn log_level(&self, target: &str) -> tracing::Level {
        if self.is_enabled(target) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Build an `EnvFilter` directive string
    ///
    /// Format: `"region=debug,plasticity=debug,<base_level>"`.
    pub fn to_filter_string(&self, base_level: &str) -> String {
        let mut filters: Vec<String> = self
            .enabled_targets
            .iter()
            .map(|t| format!("{}=debug", t))
            .collect();
        filters.push(base_level.to_ascii_lowercase());
        filters.join(",")
    }
}

/// Parse debug flags from the process arguments and `HYPERGRAPH_DEBUG`
///
/// The environment variable holds comma-separated target names or `all`.
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());

    if let Ok(env_var) = env::var("HYPERGRAPH_DEBUG") {
        merge_env_directive(&mut flags, &env_var);
    }

    flags
}

fn merge_env_directive(flags: &mut CrateDebugFlags, value: &str) {
    if value.trim() == "all" {
        flags.enable_all();
        return;
    }
    for target in value.split(',') {
        let target = target.trim();
        if !target.is_empty() {
            flags.enabled_targets.insert(target.to_string());
        }
    }
}

/// Help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all subsystems
  --debug-{{target}}               Enable debug logging for one subsystem

Available targets:
  {}

Environment Variable:
  HYPERGRAPH_DEBUG={{target}}[,{{target}}]
  HYPERGRAPH_DEBUG=all
"#,
        KNOWN_TARGETS.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_target_flag() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-region".to_string()]);
        assert!(flags.is_enabled("region"));
        assert!(!flags.is_enabled("plasticity"));
    }

    #[test]
    fn test_debug_all() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-all".to_string()]);
        for target in KNOWN_TARGETS {
            assert!(flags.is_enabled(target), "{} should be enabled", target);
        }
    }

    #[test]
    fn test_filter_string() {
        let flags = CrateDebugFlags::from_args(vec![
            "--debug-plasticity".to_string(),
            "--ignored".to_string(),
        ]);
        assert_eq!(flags.to_filter_string("INFO"), "plasticity=debug,info");
        assert_eq!(CrateDebugFlags::default().to_filter_string("warn"), "warn");
    }

    #[test]
    fn test_log_level() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-brain".to_string()]);
        assert_eq!(flags.log_level("brain"), tracing::Level::DEBUG);
        assert_eq!(flags.log_level("region"), tracing::Level::INFO);
    }

    #[test]
    fn test_env_directive() {
        let mut flags = CrateDebugFlags::default();
        merge_env_directive(&mut flags, "region, registry,");
        assert!(flags.is_enabled("region"));
        assert!(flags.is_enabled("registry"));
        assert_eq!(flags.enabled_targets.len(), 2);

        merge_env_directive(&mut flags, "all");
        assert_eq!(flags.enabled_targets.len(), KNOWN_TARGETS.len());
    }
}
