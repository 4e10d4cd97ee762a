//! Component F: the User-Defined Stream Cache (spec.md §4.5).
//!
//! Records operator byte sequences under a name as a list of fixed-size
//! blocks, and replays them as nestable, read-only streams. The original
//! design calls for a hash table sized to the next prime ≥ a requested
//! capacity, hashed with a PJW-style function; `next_prime`/[`PjwHasher`]
//! reproduce that shape, wired into a `std::collections::HashMap` via
//! `BuildHasherDefault` rather than a hand-rolled bucket array, since a
//! safe-Rust table has no way to expose or tune its bucket count directly.
//!
//! Single-threaded by design (spec.md §5): the cache and its live replay
//! streams share state through `Rc<RefCell<_>>`, not `Arc<Mutex<_>>`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hasher};
use std::rc::Rc;

use crate::error::{FilterError, Result};
use crate::stream::InputStream;
use crate::tagstream::embedded::EmbeddedReader;

const BLOCK_SIZE: usize = 1024;
const DEFAULT_CAPACITY: usize = 37;
const MAX_ACTIVE_REPLAYS: usize = 32;

/// Smallest prime ≥ `n`. Used only to mirror the original table-sizing
/// policy; a `HashMap`'s actual bucket count is an implementation detail we
/// don't control.
fn next_prime(n: usize) -> usize {
    fn is_prime(n: usize) -> bool {
        if n < 2 {
            return false;
        }
        let mut d = 2;
        while d * d <= n {
            if n % d == 0 {
                return false;
            }
            d += 1;
        }
        true
    }
    let mut candidate = n.max(2);
    while !is_prime(candidate) {
        candidate += 1;
    }
    candidate
}

/// A PJW-style (`hashpjw`) string hash, as described for the original
/// table.
#[derive(Default)]
pub struct PjwHasher(u64);

impl Hasher for PjwHasher {
    fn write(&mut self, bytes: &[u8]) {
        let mut h = self.0 as u32;
        for &b in bytes {
            h = (h << 4).wrapping_add(b as u32);
            let high = h & 0xf000_0000;
            if high != 0 {
                h ^= high >> 24;
            }
            h &= !high;
        }
        self.0 = h as u64;
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

type PjwBuildHasher = BuildHasherDefault<PjwHasher>;

struct Block {
    data: Box<[u8; BLOCK_SIZE]>,
    len: usize,
}

impl Block {
    fn new() -> Self {
        Block { data: Box::new([0u8; BLOCK_SIZE]), len: 0 }
    }
}

struct StreamEntry {
    blocks: Vec<Block>,
    total_len: usize,
    is_running: bool,
}

impl StreamEntry {
    fn new() -> Self {
        StreamEntry { blocks: Vec::new(), total_len: 0, is_running: false }
    }

    fn push_byte(&mut self, byte: u8) {
        if self.blocks.last().map_or(true, |b| b.len == BLOCK_SIZE) {
            self.blocks.push(Block::new());
        }
        let block = self.blocks.last_mut().expect("just pushed");
        block.data[block.len] = byte;
        block.len += 1;
        self.total_len += 1;
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push_byte(b);
        }
    }

    fn byte_at(&self, index: usize) -> u8 {
        let block = &self.blocks[index / BLOCK_SIZE];
        block.data[index % BLOCK_SIZE]
    }
}

struct Inner {
    entries: HashMap<String, StreamEntry, PjwBuildHasher>,
    defining: Option<String>,
    active_replays: usize,
    capacity: usize,
}

/// The process-- actually per-interpreter (spec.md §5) -- cache of named,
/// recorded byte sequences.
#[derive(Clone)]
pub struct StreamCache {
    inner: Rc<RefCell<Inner>>,
}

impl StreamCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let inner = Inner {
            entries: HashMap::with_hasher(PjwBuildHasher::default()),
            defining: None,
            active_replays: 0,
            capacity: next_prime(capacity),
        };
        StreamCache { inner: Rc::new(RefCell::new(inner)) }
    }

    /// The table-sizing policy's result, kept only for diagnostics.
    pub fn table_capacity(&self) -> usize {
        self.inner.borrow().capacity
    }

    /// `BeginStream(name)`: creates (or replaces) an entry and starts
    /// recording into it.
    pub fn begin_stream(&self, name: &str) {
        let mut inner = self.inner.borrow_mut();
        inner.entries.insert(name.to_string(), StreamEntry::new());
        inner.defining = Some(name.to_string());
    }

    /// `ReadStream(declared_length)`: pulls `declared_length` bytes out of
    /// the embedded-data block `source` is positioned over and appends them
    /// to the entry currently being defined. Fails with
    /// `ILLEGAL_DATA_LENGTH` if `declared_length` disagrees with the
    /// embedded block's actual length, or on a short read.
    pub fn read_stream<R: InputStream>(&self, declared_length: usize, source: &mut EmbeddedReader<R>) -> Result<()> {
        let actual = source.remaining();
        if actual != declared_length {
            return Err(FilterError::IllegalDataLength { declared: declared_length, actual });
        }
        let bytes = source.read_bytes(declared_length)?;
        let mut inner = self.inner.borrow_mut();
        let name = inner.defining.clone().ok_or(FilterError::DataSourceNotOpen)?;
        let entry = inner.entries.get_mut(&name).expect("defining name always has a live entry");
        entry.push_bytes(&bytes);
        Ok(())
    }

    /// `EndStream`: closes the current recording.
    pub fn end_stream(&self) {
        self.inner.borrow_mut().defining = None;
    }

    /// `ExecStream(name)`: opens a replay stream over `name`'s recorded
    /// bytes.
    pub fn exec_stream(&self, name: &str) -> Result<ReplayStream> {
        let mut inner = self.inner.borrow_mut();
        let entry =
            inner.entries.get_mut(name).ok_or_else(|| FilterError::StreamUndefined(name.to_string()))?;
        if entry.is_running {
            return Err(FilterError::StreamCallingItself(name.to_string()));
        }
        if inner.active_replays >= MAX_ACTIVE_REPLAYS {
            return Err(FilterError::StreamNestingFull);
        }
        entry.is_running = true;
        inner.active_replays += 1;
        Ok(ReplayStream {
            inner: Rc::clone(&self.inner),
            name: name.to_string(),
            index: 0,
            remaining: entry.total_len,
            pushback: None,
            finished: false,
        })
    }

    /// `RemoveStream(name)`: deletes the entry. Silent if unknown; logs a
    /// warning and leaves the entry in place if it is currently running.
    pub fn remove_stream(&self, name: &str) {
        let mut inner = self.inner.borrow_mut();
        match inner.entries.get(name) {
            None => {}
            Some(entry) if entry.is_running => {
                log::warn!("RemoveStream({name}): entry is running, not removed");
            }
            Some(_) => {
                inner.entries.remove(name);
            }
        }
    }
}

impl Default for StreamCache {
    fn default() -> Self {
        Self::new()
    }
}

/// A read-only replay of a recorded entry's bytes, produced by
/// [`StreamCache::exec_stream`].
pub struct ReplayStream {
    inner: Rc<RefCell<Inner>>,
    name: String,
    index: usize,
    remaining: usize,
    pushback: Option<u8>,
    finished: bool,
}

impl ReplayStream {
    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let mut inner = self.inner.borrow_mut();
        inner.active_replays = inner.active_replays.saturating_sub(1);
        if let Some(entry) = inner.entries.get_mut(&self.name) {
            entry.is_running = false;
        }
    }
}

impl InputStream for ReplayStream {
    fn getc(&mut self) -> Result<Option<u8>> {
        if let Some(b) = self.pushback.take() {
            return Ok(Some(b));
        }
        if self.remaining == 0 {
            self.finish();
            return Ok(None);
        }
        let inner = self.inner.borrow();
        let entry = inner.entries.get(&self.name).expect("entry outlives its replay stream");
        let byte = entry.byte_at(self.index);
        drop(inner);
        self.index += 1;
        self.remaining -= 1;
        Ok(Some(byte))
    }

    fn ungetc(&mut self, byte: u8) -> Result<()> {
        if self.pushback.is_some() {
            return Err(FilterError::RangeCheck("push-back slot already full".into()));
        }
        self.pushback = Some(byte);
        Ok(())
    }

    fn close(&mut self, _explicit: bool) -> Result<()> {
        self.finish();
        Ok(())
    }
}

impl Drop for ReplayStream {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::file::MemSource;
    use crate::tagstream::reader::{Endianness, TagStreamReader};

    /// A tag stream holding a single ubyte-length-prefixed embedded block.
    fn narrow_block(payload: &[u8]) -> TagStreamReader<MemSource> {
        let mut bytes = vec![payload.len() as u8];
        bytes.extend_from_slice(payload);
        TagStreamReader::new(MemSource::new(bytes))
    }

    /// A tag stream holding a single uint32-length-prefixed embedded block.
    fn wide_block(payload: &[u8]) -> TagStreamReader<MemSource> {
        let mut bytes = (payload.len() as u32).to_be_bytes().to_vec();
        bytes.extend_from_slice(payload);
        TagStreamReader::new(MemSource::new(bytes))
    }

    #[test]
    fn replay_reproduces_recorded_bytes_and_reaches_eof() {
        let cache = StreamCache::new();
        let mut stream = narrow_block(&[0x41, 0x42, 0x43]);
        let mut source = EmbeddedReader::new(&mut stream, false, Endianness::Big).unwrap();
        cache.begin_stream("foo");
        cache.read_stream(3, &mut source).unwrap();
        cache.end_stream();

        let mut replay = cache.exec_stream("foo").unwrap();
        assert_eq!(replay.read_to_vec().unwrap(), vec![0x41, 0x42, 0x43]);
    }

    #[test]
    fn declared_length_mismatch_is_illegal_data_length() {
        let cache = StreamCache::new();
        let mut stream = narrow_block(&[1, 2, 3]);
        let mut source = EmbeddedReader::new(&mut stream, false, Endianness::Big).unwrap();
        cache.begin_stream("foo");
        let err = cache.read_stream(4, &mut source).unwrap_err();
        assert!(matches!(err, FilterError::IllegalDataLength { declared: 4, actual: 3 }));
    }

    #[test]
    fn unknown_name_is_stream_undefined() {
        let cache = StreamCache::new();
        assert!(matches!(cache.exec_stream("missing"), Err(FilterError::StreamUndefined(_))));
    }

    #[test]
    fn recursive_exec_is_rejected_and_clears_on_drop() {
        let cache = StreamCache::new();
        let mut stream = narrow_block(&[7]);
        let mut source = EmbeddedReader::new(&mut stream, false, Endianness::Big).unwrap();
        cache.begin_stream("foo");
        cache.read_stream(1, &mut source).unwrap();
        cache.end_stream();

        let first = cache.exec_stream("foo").unwrap();
        assert!(matches!(cache.exec_stream("foo"), Err(FilterError::StreamCallingItself(_))));
        drop(first);
        assert!(cache.exec_stream("foo").is_ok());
    }

    #[test]
    fn exec_stream_clears_is_running_after_natural_eof() {
        let cache = StreamCache::new();
        let mut stream = narrow_block(&[7]);
        let mut source = EmbeddedReader::new(&mut stream, false, Endianness::Big).unwrap();
        cache.begin_stream("foo");
        cache.read_stream(1, &mut source).unwrap();
        cache.end_stream();

        let mut replay = cache.exec_stream("foo").unwrap();
        assert_eq!(replay.getc().unwrap(), Some(7));
        assert_eq!(replay.getc().unwrap(), None); // natural EOF clears is_running
        assert!(cache.exec_stream("foo").is_ok());
    }

    #[test]
    fn remove_stream_is_silent_on_unknown_and_refuses_while_running() {
        let cache = StreamCache::new();
        cache.remove_stream("nope"); // silent
        let mut stream = narrow_block(&[1]);
        let mut source = EmbeddedReader::new(&mut stream, false, Endianness::Big).unwrap();
        cache.begin_stream("foo");
        cache.read_stream(1, &mut source).unwrap();
        cache.end_stream();
        let _replay = cache.exec_stream("foo").unwrap();
        cache.remove_stream("foo"); // warns, does not remove
        assert!(cache.exec_stream("foo").is_err()); // still running
    }

    #[test]
    fn large_recording_spans_multiple_blocks() {
        let cache = StreamCache::new();
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let mut stream = wide_block(&data);
        let mut source = EmbeddedReader::new(&mut stream, true, Endianness::Big).unwrap();
        cache.begin_stream("big");
        cache.read_stream(data.len(), &mut source).unwrap();
        cache.end_stream();

        let mut replay = cache.exec_stream("big").unwrap();
        assert_eq!(replay.read_to_vec().unwrap(), data);
    }
}
