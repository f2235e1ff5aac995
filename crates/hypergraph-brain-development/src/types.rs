// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Registry error types.
*/

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown region key: {0}")]
    UnknownKey(String),

    #[error("Alias {0} would shadow a registered factory")]
    AliasConflict(String),

    #[error("Region key must not be empty")]
    EmptyKey,
}
