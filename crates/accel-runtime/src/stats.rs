// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Transfer and allocation statistics for profiling and diagnostics.
//!
//! [`TransferStats`] is a point-in-time snapshot of what an
//! [`EmulatedAccelerator`](crate::EmulatedAccelerator) has been asked to do.
//! Besides profiling, the live-allocation counters double as an allocator
//! spy in tests: a buffer that frees what it owns exactly once leaves both
//! `live_device_allocs` and `live_pinned_allocs` at zero.

/// Cumulative statistics about accelerator memory traffic.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct TransferStats {
    /// Number of device memory allocations.
    pub device_allocs: u64,
    /// Number of device memory frees.
    pub device_frees: u64,
    /// Number of pinned host memory allocations.
    pub pinned_allocs: u64,
    /// Number of pinned host memory frees.
    pub pinned_frees: u64,
    /// Number of synchronous host→device copies.
    pub h2d_copies: u64,
    /// Number of synchronous device→host copies.
    pub d2h_copies: u64,
    /// Number of asynchronous (stream-ordered) host→device copies.
    pub async_h2d_copies: u64,
    /// Total bytes moved across the host/device boundary, either direction.
    pub bytes_transferred: u64,
}

impl TransferStats {
    /// Device allocations that have not been freed yet.
    pub fn live_device_allocs(&self) -> u64 {
        self.device_allocs - self.device_frees
    }

    /// Pinned allocations that have not been freed yet.
    pub fn live_pinned_allocs(&self) -> u64 {
        self.pinned_allocs - self.pinned_frees
    }

    /// Total copies in either direction, sync and async.
    pub fn total_copies(&self) -> u64 {
        self.h2d_copies + self.d2h_copies + self.async_h2d_copies
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let mb = self.bytes_transferred as f64 / (1024.0 * 1024.0);
        format!(
            "Transfers: {} h2d, {} d2h, {} async h2d ({:.2} MB moved); \
             allocations: {} device ({} live), {} pinned ({} live)",
            self.h2d_copies,
            self.d2h_copies,
            self.async_h2d_copies,
            mb,
            self.device_allocs,
            self.live_device_allocs(),
            self.pinned_allocs,
            self.live_pinned_allocs(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_quiet() {
        let s = TransferStats::default();
        assert_eq!(s.total_copies(), 0);
        assert_eq!(s.live_device_allocs(), 0);
        assert_eq!(s.live_pinned_allocs(), 0);
    }

    #[test]
    fn test_live_counts() {
        let s = TransferStats {
            device_allocs: 3,
            device_frees: 2,
            pinned_allocs: 1,
            pinned_frees: 1,
            ..Default::default()
        };
        assert_eq!(s.live_device_allocs(), 1);
        assert_eq!(s.live_pinned_allocs(), 0);
    }

    #[test]
    fn test_summary() {
        let s = TransferStats {
            h2d_copies: 2,
            d2h_copies: 1,
            bytes_transferred: 3 * 1024 * 1024,
            device_allocs: 1,
            ..Default::default()
        };
        let summary = s.summary();
        assert!(summary.contains("2 h2d"));
        assert!(summary.contains("1 d2h"));
        assert!(summary.contains("3.00 MB"));
    }

    #[test]
    fn test_serialize() {
        let s = TransferStats::default();
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("h2d_copies"));
    }
}
