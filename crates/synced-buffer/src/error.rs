// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for buffer configuration.
//!
//! Configuration parsing is the only recoverable failure surface in this
//! crate. Allocation failures and contract violations inside the buffer
//! itself are unrecoverable by design and terminate with a diagnostic —
//! see the crate-level docs.

/// Errors that can occur while loading or serialising configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config '{path}': {detail}")]
    ReadError { path: String, detail: String },

    /// The configuration text is not valid TOML for [`MemoryConfig`](crate::MemoryConfig).
    #[error("TOML parse error: {0}")]
    ParseError(String),

    /// The configuration could not be serialised to TOML.
    #[error("TOML serialise error: {0}")]
    SerialiseError(String),
}
