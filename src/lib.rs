//! Forkparse is a library of backtracking parser combinators over byte
//! streams.
//!
//! This crate offers recursive-descent grammars built from a small set of
//! rules, matched against any sequential byte source without requiring the
//! source to seek. Core functionality provided:
//! - Cursors: Many independent read positions over one byte source,
//!   see [crate::stream].
//!   - A [CursorManager](stream::CursorManager) keeps only the bytes between
//!     the slowest and the fastest live cursor in memory.
//!   - Cursors can be branched for speculative reads and committed or dropped
//!     afterwards; they may be used from several threads.
//! - Rules: Literal, sequence, choice, bounded repetition and placeholder,
//!   see [crate::grammar].
//!   - Choices backtrack by branching the cursor.
//!   - Failures carry the offset, the path of rule names and a message; the
//!     alternative that got furthest is the one reported.
//! - Recursive grammars: Placeholders are bound by name in a separate
//!   [resolve](grammar::resolve) pass.
//!
//! Limitations:
//! - Matching is byte based; non-ASCII bytes in diagnostics are escaped
//!   rather than decoded
//! - A parse only reports success or a diagnostic; no syntax tree is built
//!
//! # Usage patterns
//! 1. Build rules with the functions in [grammar::builders], resolve
//!    placeholders with [grammar::resolve].
//! 2. Parse with the quick API ([parse_bytes], [parse_owned], [parse_reader])
//!    or open a [Cursor](stream::Cursor) yourself and call
//!    [Rule::parse](grammar::Rule::parse) for full control, e.g. to configure
//!    the byte window via [StreamOptions](stream::StreamOptions).
//!
//! ## Example
//! ```
//! use forkparse::grammar::{literal, one_of_bytes, one_or_more, sequence};
//! use forkparse::parse_bytes;
//!
//! let number = one_or_more(one_of_bytes(b"0123456789").unwrap()).rename("Number");
//! let sum = sequence([number.clone(), literal("+"), number]).unwrap().rename("Sum");
//!
//! assert_eq!(parse_bytes(&sum, "12+345").unwrap(), 6);
//!
//! let err = parse_bytes(&sum, "12+x").unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "error at offset 3 in rule Sum>Number>{0|1|2|3|4|5|6|7|8|9}>'0'. expected '0' found 'x'"
//! );
//! ```

pub mod grammar;
pub mod stream;

use crate::grammar::{ParseFailure, Rule};
use crate::stream::{BufferedByteSource, ByteSource, Cursor, InMemoryByteSource};
use std::io::Read;

// ============================================================================
// Quick parsing API
// ============================================================================
/// Parses `rule` at the start of a byte slice.
///
/// Trailing input after the match is allowed. The input is copied once into
/// an owned source; use [parse_owned] to hand over a buffer without copying.
///
/// # Arguments
/// * `rule` - The (resolved) rule to match
/// * `input` - The bytes to parse (accepting `&str`, `String`, `&[u8]`, ...)
///
/// # Returns
/// * `usize` - Number of bytes matched
/// * [ParseFailure] - If the input does not match
pub fn parse_bytes(rule: &Rule, input: impl AsRef<[u8]>) -> Result<usize, ParseFailure> {
    parse_owned(rule, input.as_ref().to_vec())
}

/// Parses `rule` at the start of an owned buffer, which becomes the source.
///
/// # Returns
/// * `usize` - Number of bytes matched
/// * [ParseFailure] - If the input does not match
pub fn parse_owned(rule: &Rule, input: Vec<u8>) -> Result<usize, ParseFailure> {
    parse_source(rule, InMemoryByteSource::from_vec(input))
}

/// Parses `rule` at the start of a reader, streaming its content.
///
/// Only the bytes needed for backtracking are held in memory.
///
/// # Arguments
/// * `rule` - The (resolved) rule to match
/// * `reader` - Any sequential reader, e.g. a file or socket
///
/// # Returns
/// * `usize` - Number of bytes matched
/// * [ParseFailure] - If the input does not match or reading fails
pub fn parse_reader<R: Read + Send + 'static>(rule: &Rule, reader: R) -> Result<usize, ParseFailure> {
    parse_source(rule, BufferedByteSource::new(reader))
}

/// Parses `rule` at the start of any [ByteSource].
///
/// # Returns
/// * `usize` - Number of bytes matched
/// * [ParseFailure] - If the input does not match or the source fails
pub fn parse_source<S: ByteSource + 'static>(rule: &Rule, source: S) -> Result<usize, ParseFailure> {
    let mut cursor = Cursor::open(source);
    rule.parse(&mut cursor)?;
    Ok(cursor.offset()?)
}
