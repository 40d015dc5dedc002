// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Host-side memory acquisition with strategy tracking.
//!
//! When an accelerator context is active, host buffers are allocated pinned
//! (page-locked) through the runtime, which enables DMA transfers and avoids
//! dynamic pinning on every copy. Without a context, the system allocator is
//! used. The strategy chosen at acquisition is returned alongside the
//! pointer and must travel with it: release goes through the matching path,
//! and the [`HostStrategy`] enum makes a mismatched release unrepresentable
//! rather than guarded by a flag that can drift.
//!
//! There is deliberately no fallback from pinned to system allocation. A
//! pinned-allocation failure with an active context is an environment fault
//! and terminates the process; falling back silently would leave the
//! recorded strategy out of sync with the pointer.

use accel_runtime::Accelerator;
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

/// Alignment for system host allocations.
const HOST_ALIGN: usize = 8;

/// How a host pointer was obtained, and therefore how it must be released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStrategy {
    /// Plain system allocation (`std::alloc`).
    System,
    /// Pinned (page-locked) allocation through the accelerator runtime.
    Pinned,
}

/// Acquires `size` bytes of zero-filled host memory.
///
/// Pinned allocation is used when `accel` has an active context, system
/// allocation otherwise. Zero-sized requests allocate nothing and return a
/// dangling pointer; [`release`] is symmetric.
///
/// # Panics
/// Panics if the chosen allocation path fails — allocation failure here is
/// an unrecoverable environment fault, and silent fallback between
/// strategies is never attempted.
pub fn acquire(accel: &dyn Accelerator, size: usize) -> (NonNull<u8>, HostStrategy) {
    if size == 0 {
        return (NonNull::dangling(), HostStrategy::System);
    }

    if accel.is_active() {
        let ptr = accel
            .alloc_pinned(size)
            .unwrap_or_else(|e| panic!("pinned host allocation of {size} bytes failed: {e}"));
        return (ptr, HostStrategy::Pinned);
    }

    let layout = host_layout(size);
    // SAFETY: layout is valid and non-zero sized.
    let raw = unsafe { alloc_zeroed(layout) };
    let ptr = NonNull::new(raw)
        .unwrap_or_else(|| panic!("host allocation of {size} bytes failed"));
    (ptr, HostStrategy::System)
}

/// Releases host memory previously obtained from [`acquire`], through the
/// strategy recorded at acquisition.
///
/// # Safety
/// `ptr` must have been returned by `acquire` with the same `size` and
/// `strategy`, against the same runtime, and must not be used afterwards.
pub unsafe fn release(
    accel: &dyn Accelerator,
    ptr: NonNull<u8>,
    size: usize,
    strategy: HostStrategy,
) {
    if size == 0 {
        return;
    }
    match strategy {
        HostStrategy::System => dealloc(ptr.as_ptr(), host_layout(size)),
        HostStrategy::Pinned => accel.free_pinned(ptr, size),
    }
}

fn host_layout(size: usize) -> Layout {
    Layout::from_size_align(size, HOST_ALIGN)
        .unwrap_or_else(|e| panic!("invalid host allocation layout for {size} bytes: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use accel_runtime::{CpuOnly, EmulatedAccelerator};

    #[test]
    fn test_system_path_without_context() {
        let cpu = CpuOnly::new();
        let (ptr, strategy) = acquire(&cpu, 1024);
        assert_eq!(strategy, HostStrategy::System);

        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 1024) };
        assert!(bytes.iter().all(|&b| b == 0));

        unsafe { release(&cpu, ptr, 1024, strategy) };
    }

    #[test]
    fn test_pinned_path_with_context() {
        let accel = EmulatedAccelerator::new();
        let (ptr, strategy) = acquire(&accel, 4096);
        assert_eq!(strategy, HostStrategy::Pinned);
        assert_eq!(accel.stats().pinned_allocs, 1);

        unsafe { release(&accel, ptr, 4096, strategy) };
        assert_eq!(accel.stats().live_pinned_allocs(), 0);
    }

    #[test]
    fn test_zero_size_allocates_nothing() {
        let accel = EmulatedAccelerator::new();
        let (ptr, strategy) = acquire(&accel, 0);
        assert_eq!(strategy, HostStrategy::System);
        assert_eq!(accel.stats().pinned_allocs, 0);
        unsafe { release(&accel, ptr, 0, strategy) };
    }
}
