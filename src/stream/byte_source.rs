//! Byte source abstraction for cursors.
//!
//! This module provides the [ByteSource] trait, the only boundary between the
//! cursor machinery and whatever actually produces the bytes.

use std::io;

// =#========================================================================#=
// BYTE SOURCE (Trait)
// =#========================================================================T=
/// Trait defining a sequential, read-only producer of bytes.
///
/// A byte source is consumed exactly once, front to back, and never seeks.
/// Backtracking is handled entirely by the
/// [CursorManager](crate::stream::CursorManager), which keeps the bytes still
/// needed by live cursors in its own window.
///
/// Implementations:
/// - [InMemoryByteSource](crate::stream::InMemoryByteSource) for owned bytes
/// - [BufferedByteSource](crate::stream::BufferedByteSource) for any [io::Read]
///   (files, sockets, pipes)
pub trait ByteSource: Send {
    /// Reads up to `buf.len()` bytes from the next unread position.
    ///
    /// # Arguments
    /// * `buf` - Destination for the bytes read
    ///
    /// # Returns
    /// * `Ok(0)` - End of data reached (for a non-empty `buf`)
    /// * `Ok(n)` - `n` bytes were written to the front of `buf`
    /// * `Err(io::Error)` - The underlying source failed
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).fill(buf)
    }
}
