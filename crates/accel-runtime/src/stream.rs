// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Opaque execution-stream handle.
//!
//! A [`Stream`] identifies an in-order execution queue on the accelerator.
//! The runtime does not interpret the identifier — it is forwarded to the
//! backing [`Accelerator`](crate::Accelerator) implementation, which maps it
//! onto whatever native stream object it manages. Work enqueued on the same
//! stream completes in submission order; completion across streams is not
//! ordered.

/// An opaque handle to an accelerator execution stream.
///
/// Streams are caller-managed: this crate never creates, synchronizes, or
/// destroys the underlying native stream. A `Stream` is cheap to copy and
/// carries no lifetime obligations of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stream {
    id: u64,
}

impl Stream {
    /// Wraps a native stream identifier.
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    /// The default stream (id 0): the implicitly-ordered queue every
    /// accelerator runtime provides.
    pub fn default_stream() -> Self {
        Self { id: 0 }
    }

    /// Returns the native identifier.
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_identity() {
        let s = Stream::new(7);
        assert_eq!(s.id(), 7);
        assert_eq!(s, Stream::new(7));
        assert_ne!(s, Stream::default_stream());
    }

    #[test]
    fn test_default_stream_is_zero() {
        assert_eq!(Stream::default_stream().id(), 0);
    }
}
