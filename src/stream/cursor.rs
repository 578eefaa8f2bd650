//! Independent read cursors over one shared, shrinking byte window.
//!
//! A [CursorManager] pulls bytes from a single [ByteSource] and keeps only the
//! bytes between the slowest and the fastest live [Cursor] in memory. Cursors
//! can be branched to speculatively read ahead; the branch is later either
//! committed into its origin or dropped. Neither requires the source to seek.
//!
//! All state lives behind one mutex, so cursors of the same manager may be
//! moved to and read from different threads.

use crate::stream::byte_source::ByteSource;
use crate::stream::stream_error::StreamError;
use log::{debug, trace};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Offset a root cursor starts from; the floor of every cursor table.
const ROOT_FLOOR: usize = 0;

// =#========================================================================#=
// CURSOR ID
// =#========================================================================#=
/// Identifier of a cursor within its [CursorManager].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CursorId(u64);

impl fmt::Display for CursorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =#========================================================================#=
// READ CHUNK
// =#========================================================================#=
/// Result of a single read: the bytes obtained and whether end of data was hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadChunk {
    start: usize,
    bytes: Vec<u8>,
    eof: bool,
}

impl ReadChunk {
    /// Logical offset of the first byte of this chunk.
    pub fn start(&self) -> usize {
        self.start
    }

    /// The bytes read, in stream order.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns `true` if the source ran out before the request was satisfied.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Consumes the chunk, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

// =#========================================================================#=
// WINDOW STATS
// =#========================================================================#=
/// Snapshot of a manager's memory use.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WindowStats {
    /// Logical offset of the first retained byte
    pub base: usize,
    /// Number of retained bytes
    pub buffered: usize,
    /// Number of live cursors
    pub live_cursors: usize,
}

// =#========================================================================#=
// STREAM OPTIONS
// =#========================================================================#=
/// Configuration for opening a [Cursor] over a [ByteSource].
///
/// # Example
/// ```
/// use forkparse::stream::{InMemoryByteSource, StreamOptions};
///
/// let mut cursor = StreamOptions::new()
///     .with_initial_capacity(256)
///     .with_read_ahead(64)
///     .open(InMemoryByteSource::from_str("hello"));
/// let chunk = cursor.read(5).unwrap();
/// assert_eq!(chunk.bytes(), b"hello");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOptions {
    initial_capacity: usize,
    read_ahead: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            initial_capacity: Self::DEFAULT_INITIAL_CAPACITY,
            read_ahead: 0,
        }
    }
}

impl StreamOptions {
    /// Default capacity of the byte window.
    ///
    /// Sized to accommodate typical lookahead of keyword-sized literals
    /// without reallocating.
    pub const DEFAULT_INITIAL_CAPACITY: usize = 64;

    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial allocation of the byte window.
    ///
    /// # Arguments
    /// * `capacity` - Number of bytes to reserve upfront
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Sets how many bytes beyond a request are pulled from the source per refill.
    ///
    /// With `0` (default) the window holds exactly the bytes between the
    /// slowest and the fastest live cursor. Larger values trade memory for
    /// fewer calls into the source.
    ///
    /// # Arguments
    /// * `read_ahead` - Extra bytes per refill
    pub fn with_read_ahead(mut self, read_ahead: usize) -> Self {
        self.read_ahead = read_ahead;
        self
    }

    /// Opens a root cursor over `source` with these options.
    ///
    /// # Arguments
    /// * `source` - The byte source, consumed exactly once
    ///
    /// # Returns
    /// The root [Cursor] at offset 0
    pub fn open<S: ByteSource + 'static>(self, source: S) -> Cursor {
        CursorManager::open(Box::new(source), self)
    }
}

// =#========================================================================#=
// CURSOR MANAGER
// =#========================================================================#=
/// State guarded by the manager's mutex.
struct WindowState {
    source: Box<dyn ByteSource>,
    /// Bytes pulled from the source and still needed by some live cursor
    window: Vec<u8>,
    /// Logical offset of `window[0]`
    base: usize,
    /// Logical offset of each live cursor
    offsets: HashMap<CursorId, usize>,
    next_id: u64,
    /// Set once the source reported end of data; it is not asked again
    exhausted: bool,
    /// Source failure held back because bytes were returned before it
    failure: Option<io::Error>,
    read_ahead: usize,
}

/// Owner of the shared byte window and the table of live cursor offsets.
///
/// Every operation runs in one critical section. A read blocks only on the
/// [ByteSource], never on another cursor.
///
/// The manager is shared (via [Arc]) by all cursors branched from one root and
/// dropped with the last of them. Most callers only use the [Cursor] API; the
/// id-based methods here serve callers that track cursors by [CursorId].
pub struct CursorManager {
    state: Mutex<WindowState>,
}

impl CursorManager {
    /// Opens a root cursor over a byte source.
    ///
    /// # Arguments
    /// * `source` - The byte source, consumed exactly once
    /// * `options` - Window configuration
    pub fn open(source: Box<dyn ByteSource>, options: StreamOptions) -> Cursor {
        let root = CursorId(0);
        let mut offsets = HashMap::new();
        offsets.insert(root, ROOT_FLOOR);

        let manager = Arc::new(CursorManager {
            state: Mutex::new(WindowState {
                source,
                window: Vec::with_capacity(options.initial_capacity),
                base: ROOT_FLOOR,
                offsets,
                next_id: 1,
                exhausted: false,
                failure: None,
                read_ahead: options.read_ahead,
            }),
        });
        trace!("opened cursor {root} at offset {ROOT_FLOOR}");

        Cursor { id: root, manager }
    }

    /// Locks the state; a poisoned lock is recovered since every mutation
    /// leaves window and table consistent before anything can panic.
    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new cursor at the same offset as `id`.
    ///
    /// # Errors
    /// [StreamError::UnknownCursor] if `id` is not live.
    pub fn clone_cursor(&self, id: CursorId) -> Result<CursorId, StreamError> {
        let mut state = self.lock();
        let offset = state.offset_of(id)?;
        let clone = CursorId(state.next_id);
        state.next_id += 1;
        state.offsets.insert(clone, offset);
        trace!("branched cursor {clone} from {id} at offset {offset}");
        Ok(clone)
    }

    /// Reads up to `max` bytes for cursor `id` and advances it past them.
    ///
    /// Buffered bytes are served from the window; the rest is pulled from the
    /// source. Afterwards the window is shrunk to the slowest live cursor.
    ///
    /// # Returns
    /// A [ReadChunk] with fewer than `max` bytes at end of data, or when the
    /// source failed after some bytes were available. In the latter case the
    /// failure is raised by the next read that reaches the source.
    ///
    /// # Errors
    /// * [StreamError::UnknownCursor] if `id` is not live
    /// * [StreamError::Io] if the source failed before any byte of this read
    ///   was available; the cursor does not advance
    pub fn read(&self, id: CursorId, max: usize) -> Result<ReadChunk, StreamError> {
        self.lock().read(id, max)
    }

    /// Returns the logical offset of cursor `id`.
    ///
    /// # Errors
    /// [StreamError::UnknownCursor] if `id` is not live.
    pub fn offset(&self, id: CursorId) -> Result<usize, StreamError> {
        self.lock().offset_of(id)
    }

    /// Removes cursor `id` permanently.
    ///
    /// # Errors
    /// [StreamError::UnknownCursor] if `id` is not live (e.g. disposed twice).
    pub fn dispose(&self, id: CursorId) -> Result<(), StreamError> {
        let mut state = self.lock();
        if state.offsets.remove(&id).is_none() {
            return Err(StreamError::UnknownCursor(id));
        }
        trace!("disposed cursor {id}");
        state.shrink();
        Ok(())
    }

    /// Moves cursor `target` to the offset of `branch` and disposes `branch`.
    ///
    /// # Errors
    /// [StreamError::UnknownCursor] if either cursor is not live.
    pub fn commit(&self, target: CursorId, branch: CursorId) -> Result<(), StreamError> {
        let mut state = self.lock();
        state.offset_of(target)?;
        let offset = state
            .offsets
            .remove(&branch)
            .ok_or(StreamError::UnknownCursor(branch))?;
        state.offsets.insert(target, offset);
        trace!("committed cursor {branch} into {target} at offset {offset}");
        state.shrink();
        Ok(())
    }

    /// Returns a snapshot of window and table sizes.
    pub fn stats(&self) -> WindowStats {
        let state = self.lock();
        WindowStats {
            base: state.base,
            buffered: state.window.len(),
            live_cursors: state.offsets.len(),
        }
    }

    /// Removes `id` if it is still live. Used on drop, where the id may already
    /// have been consumed by a commit.
    fn release(&self, id: CursorId) {
        let mut state = self.lock();
        if state.offsets.remove(&id).is_some() {
            trace!("released cursor {id}");
            state.shrink();
        }
    }
}

impl WindowState {
    fn offset_of(&self, id: CursorId) -> Result<usize, StreamError> {
        self.offsets
            .get(&id)
            .copied()
            .ok_or(StreamError::UnknownCursor(id))
    }

    fn read(&mut self, id: CursorId, max: usize) -> Result<ReadChunk, StreamError> {
        let offset = self.offset_of(id)?;
        let rel = offset - self.base;

        // Serve what is buffered
        let end = (rel + max).min(self.window.len());
        let mut bytes = self.window[rel..end].to_vec();

        // Pull the rest from the source
        let mut eof = false;
        let missing = max - bytes.len();
        if missing > 0 {
            let before = self.window.len();
            let pulled = self.pull(missing);
            let take = (self.window.len() - before).min(missing);
            bytes.extend_from_slice(&self.window[before..before + take]);
            match pulled {
                Ok(reached_end) => eof = reached_end,
                Err(StreamError::Io(e)) if !bytes.is_empty() => {
                    debug!("deferring source failure after {} available bytes", bytes.len());
                    self.failure = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        self.offsets.insert(id, offset + bytes.len());
        self.shrink();

        Ok(ReadChunk {
            start: offset,
            bytes,
            eof,
        })
    }

    /// Appends up to `needed` (+ read-ahead) bytes from the source to the window.
    ///
    /// Returns `true` if end of data was reached before `needed` bytes arrived.
    /// Bytes pulled before an error stay in the window, so the stream stays
    /// consistent for every other cursor.
    fn pull(&mut self, needed: usize) -> Result<bool, StreamError> {
        if let Some(e) = self.failure.take() {
            return Err(StreamError::Io(e));
        }
        if self.exhausted {
            return Ok(true);
        }

        let wanted = needed + self.read_ahead;
        let start = self.window.len();
        self.window.resize(start + wanted, 0);

        let mut filled = 0;
        let result = loop {
            if filled >= needed {
                break Ok(false);
            }
            match self.source.fill(&mut self.window[start + filled..]) {
                Ok(0) => {
                    debug!("byte source exhausted at offset {}", self.base + start + filled);
                    self.exhausted = true;
                    break Ok(true);
                }
                Ok(n) => filled += n,
                Err(e) => break Err(StreamError::Io(e)),
            }
        };

        self.window.truncate(start + filled);
        result
    }

    /// Drops every byte before the slowest live cursor.
    fn shrink(&mut self) {
        let Some(new_base) = self.offsets.values().copied().min() else {
            return;
        };
        if new_base > self.base {
            self.window.drain(..new_base - self.base);
            trace!("window shrunk from offset {} to {new_base}", self.base);
            self.base = new_base;
        }
    }
}

// =#========================================================================#=
// CURSOR
// =#========================================================================#=
/// An independent read position over a shared byte source.
///
/// Branching a cursor registers a sibling at the same offset; both advance
/// independently afterwards. A cursor is disposed when dropped (or explicitly
/// via [dispose](Cursor::dispose)), which releases its hold on the window.
///
/// # Example
/// ```
/// use forkparse::stream::{Cursor, InMemoryByteSource};
///
/// let mut root = Cursor::open(InMemoryByteSource::from_str("abcdef"));
/// assert_eq!(root.read(2).unwrap().bytes(), b"ab");
///
/// let mut branch = root.branch().unwrap();
/// assert_eq!(branch.read(3).unwrap().bytes(), b"cde");
/// assert_eq!(root.read(1).unwrap().bytes(), b"c");
///
/// root.commit(branch).unwrap();
/// assert_eq!(root.offset().unwrap(), 5);
/// ```
pub struct Cursor {
    id: CursorId,
    manager: Arc<CursorManager>,
}

impl Cursor {
    /// Opens a root cursor over `source` with default [StreamOptions].
    ///
    /// # Arguments
    /// * `source` - The byte source, consumed exactly once
    pub fn open<S: ByteSource + 'static>(source: S) -> Cursor {
        StreamOptions::default().open(source)
    }

    /// Returns the id of this cursor within its manager.
    pub fn id(&self) -> CursorId {
        self.id
    }

    /// Returns the manager shared by this cursor and all its branches.
    pub fn manager(&self) -> &Arc<CursorManager> {
        &self.manager
    }

    /// Creates a sibling cursor at the current offset. No bytes are copied.
    ///
    /// # Errors
    /// [StreamError::UnknownCursor] if this cursor was disposed through the
    /// manager behind its back.
    pub fn branch(&self) -> Result<Cursor, StreamError> {
        let id = self.manager.clone_cursor(self.id)?;
        Ok(Cursor {
            id,
            manager: Arc::clone(&self.manager),
        })
    }

    /// Reads up to `max` bytes and advances past them.
    ///
    /// See [CursorManager::read].
    pub fn read(&mut self, max: usize) -> Result<ReadChunk, StreamError> {
        self.manager.read(self.id, max)
    }

    /// Reads a single byte.
    ///
    /// # Returns
    /// * `Some(u8)` - The next byte
    /// * `None` - If at end of data
    pub fn read_byte(&mut self) -> Result<Option<u8>, StreamError> {
        Ok(self.read(1)?.bytes.first().copied())
    }

    /// Returns the logical offset of this cursor (bytes consumed since open).
    pub fn offset(&self) -> Result<usize, StreamError> {
        self.manager.offset(self.id)
    }

    /// Adopts the position of a successful `branch`, disposing the branch.
    ///
    /// # Arguments
    /// * `branch` - A cursor branched (directly or indirectly) from this one
    ///
    /// # Errors
    /// [StreamError::UnknownCursor] if `branch` belongs to another manager.
    pub fn commit(&mut self, branch: Cursor) -> Result<(), StreamError> {
        if !Arc::ptr_eq(&self.manager, &branch.manager) {
            return Err(StreamError::UnknownCursor(branch.id));
        }
        self.manager.commit(self.id, branch.id)
    }

    /// Disposes this cursor. Equivalent to dropping it.
    pub fn dispose(self) {}
}

impl Drop for Cursor {
    fn drop(&mut self) {
        self.manager.release(self.id);
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("id", &self.id)
            .field("offset", &self.offset().ok())
            .finish()
    }
}
