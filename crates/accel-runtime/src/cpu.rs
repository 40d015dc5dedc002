// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The no-accelerator runtime.
//!
//! [`CpuOnly`] stands in for the accelerator runtime in builds or
//! deployments with no device at all. Its context-active query answers
//! `false` and every allocation or copy fails with
//! [`AccelError::ContextInactive`], so a consumer that checks the
//! precondition first will never reach the device paths. Reaching a free
//! here is a caller logic error: `CpuOnly` can never have handed out device
//! or pinned memory in the first place.

use crate::{AccelError, Accelerator, Stream};
use std::ptr::NonNull;

/// An [`Accelerator`] for processes with no accelerator context.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuOnly;

impl CpuOnly {
    /// Creates the no-accelerator runtime.
    pub fn new() -> Self {
        Self
    }
}

impl Accelerator for CpuOnly {
    fn is_active(&self) -> bool {
        false
    }

    fn current_device(&self) -> i32 {
        -1
    }

    fn alloc_device(&self, _device: i32, _size: usize) -> Result<NonNull<u8>, AccelError> {
        Err(AccelError::ContextInactive)
    }

    unsafe fn free_device(&self, _device: i32, _ptr: NonNull<u8>, _size: usize) {
        // This runtime never allocates device memory, so there is nothing
        // it could legitimately be asked to free.
        unreachable!("free_device called without an accelerator context");
    }

    fn alloc_pinned(&self, _size: usize) -> Result<NonNull<u8>, AccelError> {
        Err(AccelError::ContextInactive)
    }

    unsafe fn free_pinned(&self, _ptr: NonNull<u8>, _size: usize) {
        unreachable!("free_pinned called without an accelerator context");
    }

    unsafe fn copy_host_to_device(
        &self,
        _dst: NonNull<u8>,
        _src: NonNull<u8>,
        _bytes: usize,
    ) -> Result<(), AccelError> {
        Err(AccelError::ContextInactive)
    }

    unsafe fn copy_device_to_host(
        &self,
        _dst: NonNull<u8>,
        _src: NonNull<u8>,
        _bytes: usize,
    ) -> Result<(), AccelError> {
        Err(AccelError::ContextInactive)
    }

    unsafe fn copy_host_to_device_async(
        &self,
        _dst: NonNull<u8>,
        _src: NonNull<u8>,
        _bytes: usize,
        _stream: Stream,
    ) -> Result<(), AccelError> {
        Err(AccelError::ContextInactive)
    }
}
