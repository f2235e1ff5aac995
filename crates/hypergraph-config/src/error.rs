// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no hypergraph.toml found; searched: {0}")]
    FileNotFound(String),

    #[error("cannot read {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {}: {message}", path.display())]
    ParseError { path: PathBuf, message: String },

    #[error("validation failed: {0}")]
    ValidationError(String),

    /// Rejected override; `key` is the override name, e.g. `p_gate`
    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
