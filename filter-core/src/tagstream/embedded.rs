//! Component H: the embedded-data reader (spec.md §4.6-4.7).
//!
//! Wraps a [`TagStreamReader`] for the duration of one length-bounded
//! payload. Its endianness is independent of the tag stream's -- embedded
//! payloads are sometimes big-endian regardless of the stream's current
//! byte order -- so every multi-byte read here honours `self.endianness`,
//! never the tag stream's.

use crate::error::{FilterError, Result};
use crate::stream::InputStream;
use crate::tagstream::reader::{Endianness, TagStreamReader, Warning};

pub struct EmbeddedReader<'a, R> {
    stream: &'a mut TagStreamReader<R>,
    remaining: usize,
    endianness: Endianness,
    insufficient: bool,
}

impl<'a, R: InputStream> EmbeddedReader<'a, R> {
    /// Reads the length tag (`ubyte` or `uint32`, in the *tag stream's*
    /// current endianness) and opens a reader bounded to that many bytes.
    pub fn new(stream: &'a mut TagStreamReader<R>, length_is_wide: bool, endianness: Endianness) -> Result<Self> {
        let remaining = if length_is_wide { stream.read_u32()? as usize } else { stream.read_u8()? as usize };
        Ok(EmbeddedReader { stream, remaining, endianness, insufficient: false })
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn insufficient(&self) -> bool {
        self.insufficient
    }

    /// Warnings accumulated so far on the tag stream this payload is nested
    /// in (lenient-mode tag/version anomalies encountered before or between
    /// embedded reads).
    pub fn warnings(&self) -> &[Warning] {
        self.stream.warnings()
    }

    fn raw_byte(&mut self) -> Result<u8> {
        self.stream
            .raw_getc()?
            .ok_or_else(|| FilterError::io_error("embedded payload truncated before its declared length"))
    }

    /// Reads `n` raw bytes. If `n` exceeds what remains, sets
    /// `insufficient` and fails *without* consuming any bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        if n > self.remaining {
            self.insufficient = true;
            return Err(FilterError::IllegalDataLength { declared: n, actual: self.remaining });
        }
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.raw_byte()?);
        }
        self.remaining -= n;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(match self.endianness {
            Endianness::Big => u16::from_be_bytes([b[0], b[1]]),
            Endianness::Little => u16::from_le_bytes([b[0], b[1]]),
        })
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    /// Drains any residual bytes, typically called on an error unwind path
    /// so the tag stream is left positioned after the embedded block
    /// regardless of how much of it was actually consumed.
    pub fn flush(&mut self) -> Result<()> {
        while self.remaining > 0 {
            self.raw_byte()?;
            self.remaining -= 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::file::MemSource;

    #[test]
    fn reads_declared_length_and_tracks_remaining() {
        let mut stream = TagStreamReader::new(MemSource::new(vec![3, 0x41, 0x42, 0x43]));
        let mut embedded = EmbeddedReader::new(&mut stream, false, Endianness::Big).unwrap();
        assert_eq!(embedded.remaining(), 3);
        assert_eq!(embedded.read_bytes(3).unwrap(), vec![0x41, 0x42, 0x43]);
        assert_eq!(embedded.remaining(), 0);
    }

    #[test]
    fn over_read_sets_insufficient_without_consuming() {
        let mut stream = TagStreamReader::new(MemSource::new(vec![2, 0x41, 0x42]));
        let mut embedded = EmbeddedReader::new(&mut stream, false, Endianness::Big).unwrap();
        assert!(embedded.read_bytes(3).is_err());
        assert!(embedded.insufficient());
        assert_eq!(embedded.remaining(), 2);
        assert_eq!(embedded.read_bytes(2).unwrap(), vec![0x41, 0x42]);
    }

    #[test]
    fn independent_endianness_from_tag_stream() {
        // Tag stream defaults to Big; embedded reader is explicitly Little.
        let mut stream = TagStreamReader::new(MemSource::new(vec![2, 0x01, 0x02]));
        let mut embedded = EmbeddedReader::new(&mut stream, false, Endianness::Little).unwrap();
        assert_eq!(embedded.read_u16().unwrap(), 0x0201);
    }

    #[test]
    fn flush_drains_residual_bytes() {
        let mut stream = TagStreamReader::new(MemSource::new(vec![3, 1, 2, 3, 0x41]));
        let mut embedded = EmbeddedReader::new(&mut stream, false, Endianness::Big).unwrap();
        embedded.flush().unwrap();
        assert_eq!(embedded.remaining(), 0);
        assert_eq!(stream.next_tag().unwrap(), Some(crate::tagstream::reader::Tag::Operator(0x41)));
    }
}
