// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # accel-runtime
//!
//! The accelerator-runtime seam used by `synced-buffer`: everything a
//! dual-location memory buffer needs from a device runtime, behind one
//! trait.
//!
//! # Key Components
//!
//! - [`Accelerator`] — the collaborator trait: device memory allocate/free,
//!   pinned host allocate/free, synchronous and asynchronous host↔device
//!   copies, current-device query, context-active query.
//! - [`Stream`] — an opaque, caller-managed execution-stream handle.
//! - [`CpuOnly`] — the no-accelerator runtime. Its context is never active
//!   and every device operation fails the precondition check, so consumers
//!   need no conditional compilation for accelerator-absent builds.
//! - [`EmulatedAccelerator`] — a host-memory-backed runtime with full
//!   operation counters ([`TransferStats`]). It behaves like an active
//!   device context and doubles as the transfer-count probe and allocator
//!   spy in tests.
//! - [`AccelError`] — failure reporting at the seam. Consumers treat any
//!   device-operation failure as an unrecoverable environment fault.
//!
//! # Choosing a runtime
//!
//! ```
//! use accel_runtime::{Accelerator, CpuOnly, EmulatedAccelerator};
//! use std::sync::Arc;
//!
//! let active: Arc<dyn Accelerator> = Arc::new(EmulatedAccelerator::new());
//! let inactive: Arc<dyn Accelerator> = Arc::new(CpuOnly::new());
//! assert!(active.is_active());
//! assert!(!inactive.is_active());
//! ```

mod backend;
mod cpu;
mod emulated;
mod error;
mod stats;
mod stream;

pub use backend::Accelerator;
pub use cpu::CpuOnly;
pub use emulated::EmulatedAccelerator;
pub use error::AccelError;
pub use stats::TransferStats;
pub use stream::Stream;
