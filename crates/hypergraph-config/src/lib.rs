// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Hypergraph configuration
//!
//! Option records for brain, regions and learning, read from
//! `hypergraph.toml` and overridden by `HYPERGRAPH_*` variables and CLI
//! key/value pairs (CLI wins).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hypergraph_config::load_config;
//!
//! let config = load_config(None, None).expect("hypergraph.toml");
//! let learning = config.learning.sanitized();
//! assert!((0.0..=1.0).contains(&learning.p_gate));
//! ```
//!
//! Runtime consumers never reject a configuration: they call
//! [`LearningConfig::sanitized`] and carry on. [`validate_config`] exists for
//! tools that want to report mistakes up front.

pub mod error;
pub mod loader;
pub mod types;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config, set_override,
};
pub use types::*;
pub use validation::{validate_config, ConfigValidationError};
