use super::StreamState;

/// The reusable half of component A: a fixed-capacity byte buffer with a
/// cursor, a one-byte push-back slot, and the monotonically-advancing
/// position counter required by invariant (P2).
///
/// `BufferedStream` does not know how to refill or drain itself -- that is
/// codec-specific (the spec's `fill_buffer`/`flush_buffer`). Callers drain
/// bytes with [`BufferedStream::take`] and refill the backing buffer with
/// [`BufferedStream::load`] (decode side) or drain it for writing with
/// [`BufferedStream::drain`] (encode side).
pub struct BufferedStream {
    buffer: Vec<u8>,
    ptr: usize,
    count: usize,
    state: StreamState,
    filter_state: i64,
    pushback: Option<u8>,
    position: u64,
}

impl BufferedStream {
    /// `capacity` is the codec's declared buffer size (1024 bytes unless the
    /// codec documents otherwise).
    pub fn with_capacity(capacity: usize) -> Self {
        BufferedStream {
            buffer: vec![0u8; capacity],
            ptr: 0,
            count: 0,
            state: StreamState::Init,
            filter_state: 0,
            pushback: None,
            position: 0,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn set_state(&mut self, state: StreamState) {
        self.state = state;
    }

    pub fn filter_state(&self) -> i64 {
        self.filter_state
    }

    pub fn set_filter_state(&mut self, value: i64) {
        self.filter_state = value;
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// True if a byte is available without triggering a refill.
    pub fn has_buffered(&self) -> bool {
        self.pushback.is_some() || self.count > 0
    }

    /// Pops one byte out of push-back or the current buffer. Returns `None`
    /// if both are empty -- the caller must refill and try again.
    pub fn take(&mut self) -> Option<u8> {
        if let Some(b) = self.pushback.take() {
            self.position += 1;
            return Some(b);
        }
        if self.count > 0 {
            let b = self.buffer[self.ptr];
            self.ptr += 1;
            self.count -= 1;
            self.position += 1;
            return Some(b);
        }
        None
    }

    /// Retracts exactly one byte. Only a single slot of push-back is
    /// guaranteed, matching the reserved slack byte ahead of `buffer[0]` in
    /// the spec.
    pub fn push_back(&mut self, byte: u8) -> bool {
        if self.pushback.is_some() {
            return false;
        }
        self.pushback = Some(byte);
        self.position = self.position.saturating_sub(1);
        true
    }

    /// Replaces the buffer's contents with freshly produced bytes and resets
    /// the read cursor to the start.
    pub fn load(&mut self, data: &[u8]) {
        if self.buffer.len() < data.len() {
            self.buffer.resize(data.len(), 0);
        }
        self.buffer[..data.len()].copy_from_slice(data);
        self.ptr = 0;
        self.count = data.len();
    }

    /// Declared capacity (buffer size) of this stream.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// A scratch buffer a codec can write its next chunk of decoded/encoded
    /// output into before calling [`BufferedStream::load`].
    pub fn scratch(&self) -> Vec<u8> {
        Vec::with_capacity(self.buffer.len())
    }
}
