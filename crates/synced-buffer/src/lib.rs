// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # synced-buffer
//!
//! A dual-location memory buffer that transparently manages a byte buffer
//! which may live on the host, on an accelerator device, or both — lazily
//! transferring between the two and tracking which copy is authoritative.
//!
//! # Key Components
//!
//! - [`SyncedBuffer`] — the buffer: a small state machine
//!   (`Uninitialized → AtHost / AtDevice → Synced`) driven entirely by the
//!   accessor API. Reads on the non-authoritative side trigger the minimal
//!   transfer; writes claim sole authority for their side.
//! - [`SyncedHead`] — which copy currently holds the trusted bytes.
//! - [`MemoryConfig`] — injected runtime-mode configuration (`cpu-only` vs
//!   `accelerator`), TOML-loadable.
//! - Host allocation picks pinned (page-locked) memory whenever an
//!   accelerator context is active, plain system allocation otherwise, and
//!   records the strategy so release is always symmetric.
//!
//! # Ownership Model
//!
//! ```text
//! host side:    Empty │ Owned { ptr, System|Pinned } │ Borrowed(ptr)
//! device side:  Empty │ Owned(ptr)                   │ Borrowed(ptr)
//! ```
//!
//! Each side's pointer slot is an ownership-tagged enum. Owned pointers are
//! released exactly once, on drop, through the allocator that produced
//! them; borrowed pointers (installed via
//! [`set_host_ptr`](SyncedBuffer::set_host_ptr) /
//! [`set_device_ptr`](SyncedBuffer::set_device_ptr)) are never released and
//! their lifetime is the caller's contract.
//!
//! # Failure Model
//!
//! This component does bookkeeping, not resilience. Allocation failures and
//! contract violations (device access with no accelerator context, async
//! push without host-authoritative data, null external pointers) terminate
//! with a panic carrying a diagnostic; there is no recoverable error
//! channel, no retry, no partial result. Only configuration parsing returns
//! [`ConfigError`].
//!
//! # Example
//! ```
//! use synced_buffer::{ComputeMode, MemoryConfig, SyncedBuffer, SyncedHead};
//!
//! let config = MemoryConfig {
//!     mode: ComputeMode::Accelerator,
//!     device_ordinal: 0,
//! };
//! let runtime = config.create_runtime();
//!
//! let mut buf = SyncedBuffer::new(1024, runtime);
//! buf.host_bytes_mut()[..4].copy_from_slice(&[1, 2, 3, 4]);
//! assert_eq!(buf.head(), SyncedHead::AtHost);
//!
//! let _dev = buf.device_ptr(); // lazy host→device transfer
//! assert_eq!(buf.head(), SyncedHead::Synced);
//! ```

mod buffer;
mod config;
mod error;
mod host;

pub use buffer::{SyncedBuffer, SyncedHead};
pub use config::{ComputeMode, MemoryConfig};
pub use error::ConfigError;

// The collaborator surface, re-exported so consumers can name streams and
// runtimes without a separate dependency.
pub use accel_runtime::{Accelerator, Stream};
