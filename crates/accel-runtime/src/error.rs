// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the accelerator runtime seam.
//!
//! These errors exist only at the collaborator boundary. Consumers of the
//! runtime (notably `synced-buffer`) treat every `Err` from a device
//! operation as an unrecoverable environment fault — there is no degraded
//! mode below this seam.

/// Errors reported by an [`Accelerator`](crate::Accelerator) implementation.
#[derive(Debug, thiserror::Error)]
pub enum AccelError {
    /// A device operation was requested but no accelerator context is active.
    #[error("no accelerator context is active")]
    ContextInactive,

    /// Device memory allocation failed.
    #[error("device allocation of {requested_bytes} bytes failed on device {device}")]
    DeviceAllocFailed {
        device: i32,
        requested_bytes: usize,
    },

    /// Pinned (page-locked) host memory allocation failed.
    #[error("pinned host allocation of {requested_bytes} bytes failed")]
    PinnedAllocFailed { requested_bytes: usize },

    /// A host/device copy failed.
    #[error("{direction} copy of {bytes} bytes failed")]
    CopyFailed {
        direction: &'static str,
        bytes: usize,
    },
}
