//! Buffered reader implementation of byte source.
//!
//! This module provides [BufferedByteSource], which wraps any [Read] in a
//! [BufReader] for efficient streaming I/O. Use this for large files, sockets
//! or pipes where loading everything into memory would be impractical.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::stream::byte_source::ByteSource;

// =#========================================================================#=
// BUFFERED BYTE SOURCE
// =#========================================================================$=
/// A buffered byte source for streaming input.
///
/// Unlike an in-memory source, the input is never held completely; the
/// [CursorManager](crate::stream::CursorManager) only keeps the window that
/// live cursors still need.
pub struct BufferedByteSource<R: Read> {
    /// Underlying reader, handles getting chunks from the input
    reader: BufReader<R>,
}

impl<R: Read> BufferedByteSource<R> {
    /// Creates a new buffered byte source around a reader.
    ///
    /// # Arguments
    /// * `reader` - Any sequential reader
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Creates a new buffered byte source with a given read buffer capacity.
    ///
    /// # Arguments
    /// * `capacity` - Capacity of the internal [BufReader]
    /// * `reader` - Any sequential reader
    pub fn with_capacity(capacity: usize, reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity, reader),
        }
    }
}

impl BufferedByteSource<File> {
    /// Creates a new buffered byte source from a file path.
    ///
    /// # Arguments
    /// * `path` - Path to the file (accepting `&str`, `String`, `Path`, or `PathBuf`)
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<BufferedByteSource<File>> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read + Send> ByteSource for BufferedByteSource<R> {
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.reader.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }
}
