// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`Accelerator`] trait: the seam between memory bookkeeping and the
//! device runtime.
//!
//! Everything a dual-location buffer needs from an accelerator runtime is
//! captured here: device memory allocate/free, pinned host allocate/free,
//! synchronous and asynchronous host↔device copies, and the two queries
//! (context-active, current-device). Implementations wrap a native runtime;
//! builds without one supply [`CpuOnly`](crate::CpuOnly), whose every device
//! operation fails the context-active precondition — device-side state
//! transitions then collapse to unreachable without any conditional
//! compilation in the consumer.

use crate::{AccelError, Stream};
use std::ptr::NonNull;

/// Operations a dual-location memory buffer requires from the accelerator
/// runtime.
///
/// # Contract
///
/// - If [`is_active`](Accelerator::is_active) returns `false`, every
///   allocation and copy returns [`AccelError::ContextInactive`].
/// - [`alloc_device`](Accelerator::alloc_device) returns zero-initialized
///   memory, so a freshly allocated device buffer is observationally a
///   zero-filled buffer.
/// - Synchronous copies block until the transfer is complete. The async
///   variant returns once the copy is enqueued on the given stream; the
///   caller owns stream-ordered completion.
///
/// Implementations must be `Send + Sync`: a single runtime handle is shared
/// across every buffer via `Arc`.
pub trait Accelerator: Send + Sync {
    /// Whether an accelerator context is active in this process.
    fn is_active(&self) -> bool;

    /// The ordinal of the currently selected device.
    ///
    /// Only meaningful when [`is_active`](Accelerator::is_active) is `true`;
    /// inactive runtimes return `-1`.
    fn current_device(&self) -> i32;

    /// Allocates `size` bytes of zero-initialized device memory on `device`.
    ///
    /// `size` is non-zero; zero-sized requests are the caller's concern.
    fn alloc_device(&self, device: i32, size: usize) -> Result<NonNull<u8>, AccelError>;

    /// Releases device memory previously obtained from
    /// [`alloc_device`](Accelerator::alloc_device) on the same `device`.
    ///
    /// # Safety
    /// `ptr` must have been returned by `alloc_device(device, size)` on this
    /// runtime and must not be used afterwards.
    unsafe fn free_device(&self, device: i32, ptr: NonNull<u8>, size: usize);

    /// Allocates `size` bytes of zero-initialized pinned (page-locked) host
    /// memory, suitable for DMA transfers.
    fn alloc_pinned(&self, size: usize) -> Result<NonNull<u8>, AccelError>;

    /// Releases pinned host memory previously obtained from
    /// [`alloc_pinned`](Accelerator::alloc_pinned).
    ///
    /// # Safety
    /// `ptr` must have been returned by `alloc_pinned(size)` on this runtime
    /// and must not be used afterwards.
    unsafe fn free_pinned(&self, ptr: NonNull<u8>, size: usize);

    /// Copies `bytes` from host memory at `src` to device memory at `dst`,
    /// blocking until the transfer completes.
    ///
    /// # Safety
    /// `src` must be valid host memory and `dst` valid device memory for at
    /// least `bytes` bytes, and the regions must not overlap.
    unsafe fn copy_host_to_device(
        &self,
        dst: NonNull<u8>,
        src: NonNull<u8>,
        bytes: usize,
    ) -> Result<(), AccelError>;

    /// Copies `bytes` from device memory at `src` to host memory at `dst`,
    /// blocking until the transfer completes.
    ///
    /// # Safety
    /// `src` must be valid device memory and `dst` valid host memory for at
    /// least `bytes` bytes, and the regions must not overlap.
    unsafe fn copy_device_to_host(
        &self,
        dst: NonNull<u8>,
        src: NonNull<u8>,
        bytes: usize,
    ) -> Result<(), AccelError>;

    /// Enqueues a host→device copy of `bytes` on `stream` and returns
    /// without waiting for completion.
    ///
    /// # Safety
    /// Same region requirements as
    /// [`copy_host_to_device`](Accelerator::copy_host_to_device). In
    /// addition, both regions must remain valid until the stream has
    /// completed the copy — which is why the host side of an async transfer
    /// should be pinned memory.
    unsafe fn copy_host_to_device_async(
        &self,
        dst: NonNull<u8>,
        src: NonNull<u8>,
        bytes: usize,
        stream: Stream,
    ) -> Result<(), AccelError>;
}
