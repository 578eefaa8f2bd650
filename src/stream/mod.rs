//! Byte sources and backtracking cursors.
//!
//! This module provides the [ByteSource] trait with an in-memory and a
//! buffered implementation, and the [CursorManager] that lets many [Cursor]s
//! read one source at their own pace.

pub(crate) mod buffered_byte_source;
pub(crate) mod byte_source;
pub mod cursor;
pub(crate) mod in_memory_byte_source;
pub mod stream_error;

pub use buffered_byte_source::BufferedByteSource;
pub use byte_source::ByteSource;
pub use cursor::{Cursor, CursorId, CursorManager, ReadChunk, StreamOptions, WindowStats};
pub use in_memory_byte_source::InMemoryByteSource;
pub use stream_error::StreamError;
