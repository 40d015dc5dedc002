// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime-mode configuration, loaded from TOML files or constructed
//! programmatically.
//!
//! The compute mode is explicit, injected state: a buffer sees exactly the
//! runtime its creator built from this config, never a process-wide mutable
//! switch. That keeps CPU-only and accelerator behavior testable side by
//! side in one process.
//!
//! # TOML Format
//! ```toml
//! mode = "accelerator"
//! device_ordinal = 0
//! ```

use crate::ConfigError;
use accel_runtime::Accelerator;
use std::path::Path;
use std::sync::Arc;

/// Whether buffers operate host-only or against an accelerator context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComputeMode {
    /// No accelerator context; every buffer stays host-resident.
    CpuOnly,
    /// An accelerator context is active; host allocations are pinned and
    /// device-side states are reachable.
    Accelerator,
}

/// Configuration for the memory subsystem.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MemoryConfig {
    /// Compute mode: `"cpu-only"` or `"accelerator"`.
    pub mode: ComputeMode,
    /// Device ordinal to select in accelerator mode (ignored otherwise).
    #[serde(default)]
    pub device_ordinal: i32,
}

impl MemoryConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerialiseError(e.to_string()))
    }

    /// Builds the accelerator runtime this configuration describes.
    ///
    /// `cpu-only` yields a runtime whose context is never active;
    /// `accelerator` yields the in-tree emulated backend with the configured
    /// device selected.
    pub fn create_runtime(&self) -> Arc<dyn Accelerator> {
        match self.mode {
            ComputeMode::CpuOnly => {
                tracing::info!("memory subsystem in cpu-only mode");
                Arc::new(accel_runtime::CpuOnly::new())
            }
            ComputeMode::Accelerator => {
                tracing::info!(device = self.device_ordinal, "memory subsystem in accelerator mode");
                Arc::new(accel_runtime::EmulatedAccelerator::with_device(
                    self.device_ordinal,
                ))
            }
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            mode: ComputeMode::CpuOnly,
            device_ordinal: 0,
        }
    }
}
