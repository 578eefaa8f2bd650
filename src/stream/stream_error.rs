//! Error type for cursor and byte source operations.

use crate::stream::cursor::CursorId;
use std::io;
use thiserror::Error;

/// Failure of a cursor operation.
///
/// End of data is not an error; it is reported by
/// [ReadChunk::is_eof](crate::stream::ReadChunk::is_eof).
#[derive(Debug, Error)]
pub enum StreamError {
    /// The byte source failed with something other than end of data.
    #[error("byte source failed: {0}")]
    Io(#[from] io::Error),

    /// A cursor id was used after it had been disposed (or never existed).
    #[error("cursor {0} is not live")]
    UnknownCursor(CursorId),
}
