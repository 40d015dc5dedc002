// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A host-memory-backed accelerator runtime.
//!
//! [`EmulatedAccelerator`] implements the full [`Accelerator`] contract on
//! top of the system allocator: "device" memory is ordinary host memory,
//! "pinned" memory likewise, and copies are `memcpy`s. This is the in-tree
//! reference backend — it lets everything above the seam (state machine,
//! ownership tracking, transfer scheduling) run and be tested on machines
//! with no accelerator at all, while behaving observationally like an
//! active device context.
//!
//! Every operation is counted. The resulting [`TransferStats`] snapshot is
//! the probe tests use to assert that lazy synchronization performs the
//! minimal number of transfers and that owned memory is freed exactly once.

use crate::{AccelError, Accelerator, Stream, TransferStats};
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

/// Alignment for emulated device and pinned allocations.
const ALLOC_ALIGN: usize = 8;

/// An [`Accelerator`] backed entirely by host memory, with operation
/// counters.
///
/// # Example
/// ```
/// use accel_runtime::{Accelerator, EmulatedAccelerator};
///
/// let accel = EmulatedAccelerator::new();
/// assert!(accel.is_active());
///
/// let ptr = accel.alloc_device(0, 64).unwrap();
/// unsafe { accel.free_device(0, ptr, 64) };
/// assert_eq!(accel.stats().live_device_allocs(), 0);
/// ```
#[derive(Debug)]
pub struct EmulatedAccelerator {
    device: i32,
    device_allocs: AtomicU64,
    device_frees: AtomicU64,
    pinned_allocs: AtomicU64,
    pinned_frees: AtomicU64,
    h2d_copies: AtomicU64,
    d2h_copies: AtomicU64,
    async_h2d_copies: AtomicU64,
    bytes_transferred: AtomicU64,
    last_stream: AtomicU64,
}

impl EmulatedAccelerator {
    /// Creates an emulated runtime with device ordinal 0 selected.
    pub fn new() -> Self {
        Self::with_device(0)
    }

    /// Creates an emulated runtime with the given device ordinal selected.
    pub fn with_device(device: i32) -> Self {
        tracing::debug!(device, "emulated accelerator context created");
        Self {
            device,
            device_allocs: AtomicU64::new(0),
            device_frees: AtomicU64::new(0),
            pinned_allocs: AtomicU64::new(0),
            pinned_frees: AtomicU64::new(0),
            h2d_copies: AtomicU64::new(0),
            d2h_copies: AtomicU64::new(0),
            async_h2d_copies: AtomicU64::new(0),
            bytes_transferred: AtomicU64::new(0),
            last_stream: AtomicU64::new(u64::MAX),
        }
    }

    /// Returns a snapshot of the operation counters.
    pub fn stats(&self) -> TransferStats {
        TransferStats {
            device_allocs: self.device_allocs.load(Ordering::Acquire),
            device_frees: self.device_frees.load(Ordering::Acquire),
            pinned_allocs: self.pinned_allocs.load(Ordering::Acquire),
            pinned_frees: self.pinned_frees.load(Ordering::Acquire),
            h2d_copies: self.h2d_copies.load(Ordering::Acquire),
            d2h_copies: self.d2h_copies.load(Ordering::Acquire),
            async_h2d_copies: self.async_h2d_copies.load(Ordering::Acquire),
            bytes_transferred: self.bytes_transferred.load(Ordering::Acquire),
        }
    }

    /// The stream id of the most recent async copy, if any.
    pub fn last_async_stream(&self) -> Option<Stream> {
        match self.last_stream.load(Ordering::Acquire) {
            u64::MAX => None,
            id => Some(Stream::new(id)),
        }
    }

    fn zeroed_alloc(&self, size: usize) -> Option<NonNull<u8>> {
        let layout = Layout::from_size_align(size, ALLOC_ALIGN).ok()?;
        // SAFETY: layout is valid and non-zero sized; callers guarantee
        // size > 0.
        let raw = unsafe { alloc_zeroed(layout) };
        NonNull::new(raw)
    }

    unsafe fn release(&self, ptr: NonNull<u8>, size: usize) {
        if let Ok(layout) = Layout::from_size_align(size, ALLOC_ALIGN) {
            dealloc(ptr.as_ptr(), layout);
        }
    }
}

impl Default for EmulatedAccelerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accelerator for EmulatedAccelerator {
    fn is_active(&self) -> bool {
        true
    }

    fn current_device(&self) -> i32 {
        self.device
    }

    fn alloc_device(&self, device: i32, size: usize) -> Result<NonNull<u8>, AccelError> {
        let ptr = self
            .zeroed_alloc(size)
            .ok_or(AccelError::DeviceAllocFailed {
                device,
                requested_bytes: size,
            })?;
        self.device_allocs.fetch_add(1, Ordering::Release);
        tracing::debug!(device, size, "device allocation");
        Ok(ptr)
    }

    unsafe fn free_device(&self, _device: i32, ptr: NonNull<u8>, size: usize) {
        self.release(ptr, size);
        self.device_frees.fetch_add(1, Ordering::Release);
    }

    fn alloc_pinned(&self, size: usize) -> Result<NonNull<u8>, AccelError> {
        let ptr = self
            .zeroed_alloc(size)
            .ok_or(AccelError::PinnedAllocFailed {
                requested_bytes: size,
            })?;
        self.pinned_allocs.fetch_add(1, Ordering::Release);
        tracing::debug!(size, "pinned host allocation");
        Ok(ptr)
    }

    unsafe fn free_pinned(&self, ptr: NonNull<u8>, size: usize) {
        self.release(ptr, size);
        self.pinned_frees.fetch_add(1, Ordering::Release);
    }

    unsafe fn copy_host_to_device(
        &self,
        dst: NonNull<u8>,
        src: NonNull<u8>,
        bytes: usize,
    ) -> Result<(), AccelError> {
        std::ptr::copy_nonoverlapping(src.as_ptr(), dst.as_ptr(), bytes);
        self.h2d_copies.fetch_add(1, Ordering::Release);
        self.bytes_transferred
            .fetch_add(bytes as u64, Ordering::Release);
        Ok(())
    }

    unsafe fn copy_device_to_host(
        &self,
        dst: NonNull<u8>,
        src: NonNull<u8>,
        bytes: usize,
    ) -> Result<(), AccelError> {
        std::ptr::copy_nonoverlapping(src.as_ptr(), dst.as_ptr(), bytes);
        self.d2h_copies.fetch_add(1, Ordering::Release);
        self.bytes_transferred
            .fetch_add(bytes as u64, Ordering::Release);
        Ok(())
    }

    unsafe fn copy_host_to_device_async(
        &self,
        dst: NonNull<u8>,
        src: NonNull<u8>,
        bytes: usize,
        stream: Stream,
    ) -> Result<(), AccelError> {
        // Host memory has no queue: the copy completes immediately, which
        // trivially satisfies stream-ordered completion.
        std::ptr::copy_nonoverlapping(src.as_ptr(), dst.as_ptr(), bytes);
        self.async_h2d_copies.fetch_add(1, Ordering::Release);
        self.bytes_transferred
            .fetch_add(bytes as u64, Ordering::Release);
        self.last_stream.store(stream.id(), Ordering::Release);
        Ok(())
    }
}
