//! Null (spec.md §4.3.5): writable passthrough, not readable.
//!
//! `NullEncoder` copies bytes verbatim to its underlying sink. There is no
//! `NullDecoder` -- the descriptor registers this filter with only the
//! `WRITABLE` flag, and a decode-side `filter-init` on it is a
//! `FilterError::TypeCheck` at the registry level (spec.md §4.4).

use crate::error::Result;
use crate::stream::OutputStream;

pub struct NullEncoder<U> {
    underlying: U,
}

impl<U: OutputStream> NullEncoder<U> {
    pub fn new(underlying: U) -> Self {
        NullEncoder { underlying }
    }
}

impl<U: OutputStream> OutputStream for NullEncoder<U> {
    fn putc(&mut self, byte: u8) -> Result<()> {
        self.underlying.putc(byte)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.underlying.write_all(bytes)
    }

    fn flush_file(&mut self) -> Result<()> {
        self.underlying.flush_file()
    }

    fn close(&mut self, explicit: bool) -> Result<()> {
        self.underlying.flush_file()?;
        self.underlying.close(explicit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::file::MemSink;

    #[test]
    fn passes_bytes_through_unchanged() {
        let mut enc = NullEncoder::new(MemSink::new());
        enc.write_all(b"unchanged").unwrap();
        enc.close(true).unwrap();
        assert_eq!(enc.underlying.into_inner(), b"unchanged");
    }
}
