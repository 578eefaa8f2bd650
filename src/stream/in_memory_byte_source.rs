//! In-memory implementation of byte source.

use crate::stream::byte_source::ByteSource;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

// =#========================================================================#=
// IN MEMORY BYTE SOURCE
// =#========================================================================$=
/// An in-memory byte source that owns its data.
///
/// This is the most efficient byte source for input
/// that can fit entirely in memory.
pub struct InMemoryByteSource {
    /// The owned byte data being handed out
    input: Vec<u8>,
    /// Number of bytes already handed out
    pos: usize,
}

impl InMemoryByteSource {
    /// Creates a new in-memory byte source from a Vec of bytes.
    ///
    /// # Arguments
    /// * `bytes` - The byte vector to hand out
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            input: bytes,
            pos: 0,
        }
    }

    /// Creates a new in-memory byte source by copying a string.
    ///
    /// # Arguments
    /// * `input` - The string to hand out
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(input: &str) -> Self {
        Self::from_vec(input.as_bytes().to_vec())
    }

    /// Creates a new in-memory byte source by reading a whole file.
    ///
    /// # Arguments
    /// * `path` - Path to the file (accepting `&str`, `String`, `Path`, or `PathBuf`)
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or read.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<InMemoryByteSource> {
        let mut contents = Vec::new();
        let mut file = File::open(path)?;
        file.read_to_end(&mut contents)?;
        Ok(Self::from_vec(contents))
    }

    /// Returns the number of bytes not handed out yet.
    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }
}

impl ByteSource for InMemoryByteSource {
    #[inline]
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let end = (self.pos + buf.len()).min(self.input.len());
        let n = end - self.pos;
        buf[..n].copy_from_slice(&self.input[self.pos..end]);
        self.pos = end;
        Ok(n)
    }
}
