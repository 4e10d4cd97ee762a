//! ASCII85 (spec.md §4.3.1).

use crate::error::{FilterError, Result};
use crate::stream::{BufferedStream, InputStream, OutputStream, StreamState};

const BUFFER_SIZE: usize = 1024;
const LINE_WRAP: usize = 65;

/// Encodes 4-byte groups as 5 characters in `'!'..'u'`, with `'z'` shorthand
/// for four zero bytes, wrapping output every 65 characters and emitting the
/// `~>` trailer on an explicit close.
pub struct Ascii85Encoder<U> {
    underlying: U,
    pending: Vec<u8>,
    column: usize,
    state: StreamState,
}

impl<U: OutputStream> Ascii85Encoder<U> {
    pub fn new(underlying: U) -> Self {
        Ascii85Encoder { underlying, pending: Vec::with_capacity(4), column: 0, state: StreamState::Open }
    }

    /// Unwraps the encoder, recovering its sink. Callers typically `close`
    /// first so any trailing group and trailer have already been emitted.
    pub fn into_inner(self) -> U {
        self.underlying
    }

    fn emit(&mut self, byte: u8) -> Result<()> {
        self.underlying.putc(byte)?;
        self.column += 1;
        if self.column == LINE_WRAP {
            self.underlying.putc(b'\n')?;
            self.column = 0;
        }
        Ok(())
    }

    /// Encodes exactly one group. `bytes.len()` is 4 for a full group or
    /// 1..=3 for the final, padded group emitted on close.
    fn encode_group(&mut self, bytes: &[u8]) -> Result<()> {
        let mut padded = [0u8; 4];
        padded[..bytes.len()].copy_from_slice(bytes);
        let value = u32::from_be_bytes(padded);

        if bytes.len() == 4 && value == 0 {
            return self.emit(b'z');
        }

        let mut digits = [0u8; 5];
        let mut v = value;
        for d in digits.iter_mut().rev() {
            *d = (v % 85) as u8;
            v /= 85;
        }

        let count = if bytes.len() == 4 { 5 } else { bytes.len() + 1 };
        for &d in &digits[..count] {
            self.emit(d + b'!')?;
        }
        Ok(())
    }
}

impl<U: OutputStream> OutputStream for Ascii85Encoder<U> {
    fn putc(&mut self, byte: u8) -> Result<()> {
        self.pending.push(byte);
        if self.pending.len() == 4 {
            let group = std::mem::take(&mut self.pending);
            self.encode_group(&group)?;
        }
        Ok(())
    }

    fn flush_file(&mut self) -> Result<()> {
        self.underlying.flush_file()
    }

    fn close(&mut self, explicit: bool) -> Result<()> {
        if explicit {
            self.state = StreamState::Closing;
            if !self.pending.is_empty() {
                let group = std::mem::take(&mut self.pending);
                self.encode_group(&group)?;
            }
            self.underlying.putc(b'~')?;
            self.underlying.putc(b'>')?;
        }
        self.underlying.flush_file()?;
        self.underlying.close(explicit)
    }
}

/// Decodes an ASCII85 stream. Skips whitespace and NUL; a partial final
/// tuple of length 1 is invalid but the error is *deferred*: bytes already
/// produced are returned first, and the error surfaces on the next call
/// (spec.md §4.3.1, §8 P3).
pub struct Ascii85Decoder<U> {
    underlying: U,
    buf: BufferedStream,
    acc: u64,
    digit_count: u8,
    deferred_error: Option<&'static str>,
}

impl<U: InputStream> Ascii85Decoder<U> {
    pub fn new(underlying: U) -> Self {
        Ascii85Decoder {
            underlying,
            buf: BufferedStream::with_capacity(BUFFER_SIZE),
            acc: 0,
            digit_count: 0,
            deferred_error: None,
        }
    }

    /// Pads the current partial group with digit 84 (`'u'`) out to five
    /// digits and returns the leading `digit_count - 1` decoded bytes. This
    /// mirrors the encoder's zero-padding: zero-padding plus floor digit
    /// extraction on encode, paired with max-padding on decode, is the
    /// standard ASCII85 round-trip identity for partial groups.
    fn finish_partial_group(&mut self) -> Result<Vec<u8>> {
        let mut acc = self.acc;
        for _ in self.digit_count..5 {
            acc = acc * 85 + 84;
        }
        if acc > u32::MAX as u64 {
            return Err(FilterError::io_error("ascii85 partial tuple overflow"));
        }
        let full = (acc as u32).to_be_bytes();
        let keep = (self.digit_count - 1) as usize;
        self.acc = 0;
        self.digit_count = 0;
        Ok(full[..keep].to_vec())
    }

    fn expect_eod_terminator(&mut self) -> Result<()> {
        loop {
            match self.underlying.getc()? {
                Some(b) if matches!(b, 9..=13 | 32) => continue,
                Some(b'>') => return Ok(()),
                _ => return Err(FilterError::io_error("malformed ascii85 EOD marker, expected '>'")),
            }
        }
    }

    /// Runs the decode transform until the internal buffer has fresh bytes,
    /// the underlying stream is exhausted, or an error occurs.
    fn decode_fill(&mut self) -> Result<()> {
        let mut produced = Vec::new();
        loop {
            let c = match self.underlying.getc()? {
                Some(c) => c,
                None => {
                    if self.digit_count == 1 {
                        self.buf.load(&produced);
                        self.deferred_error = Some("ascii85 partial final tuple of length 1");
                        return Ok(());
                    } else if self.digit_count >= 2 {
                        let tail = self.finish_partial_group()?;
                        produced.extend_from_slice(&tail);
                    }
                    self.buf.load(&produced);
                    self.buf.set_state(StreamState::Eof);
                    return Ok(());
                }
            };

            match c {
                0 | 9..=13 | 32 => continue,
                b'z' => {
                    if self.digit_count != 0 {
                        return Err(FilterError::io_error("'z' shorthand inside a partial ascii85 group"));
                    }
                    produced.extend_from_slice(&[0, 0, 0, 0]);
                }
                b'~' => {
                    self.expect_eod_terminator()?;
                    if self.digit_count == 1 {
                        self.buf.load(&produced);
                        self.deferred_error = Some("ascii85 partial final tuple of length 1");
                        return Ok(());
                    } else if self.digit_count >= 2 {
                        let tail = self.finish_partial_group()?;
                        produced.extend_from_slice(&tail);
                    }
                    self.buf.load(&produced);
                    self.buf.set_state(StreamState::Eof);
                    return Ok(());
                }
                33..=117 => {
                    self.acc = self.acc * 85 + (c - 33) as u64;
                    self.digit_count += 1;
                    if self.digit_count == 5 {
                        if self.acc > u32::MAX as u64 {
                            return Err(FilterError::io_error("ascii85 tuple overflow"));
                        }
                        produced.extend_from_slice(&(self.acc as u32).to_be_bytes());
                        self.acc = 0;
                        self.digit_count = 0;
                    }
                }
                other => {
                    return Err(FilterError::io_error(format!("illegal ascii85 byte {other:#x}")));
                }
            }

            if produced.len() >= self.buf.capacity() {
                self.buf.load(&produced);
                return Ok(());
            }
        }
    }
}

impl<U: InputStream> InputStream for Ascii85Decoder<U> {
    fn getc(&mut self) -> Result<Option<u8>> {
        if let Some(b) = self.buf.take() {
            return Ok(Some(b));
        }
        if let Some(msg) = self.deferred_error.take() {
            self.buf.set_state(StreamState::IoError);
            return Err(FilterError::io_error(msg));
        }
        match self.buf.state() {
            StreamState::Eof | StreamState::IoError => return Ok(None),
            _ => {}
        }
        if let Err(e) = self.decode_fill() {
            self.buf.set_state(StreamState::IoError);
            return Err(e);
        }
        // A malformed trailing group may have set `deferred_error` above while
        // leaving `produced` (and thus `buf`) empty; that error surfaces on
        // the *next* call instead of this one, so good bytes are never lost.
        Ok(self.buf.take())
    }

    fn ungetc(&mut self, byte: u8) -> Result<()> {
        if self.buf.push_back(byte) {
            Ok(())
        } else {
            Err(FilterError::RangeCheck("push-back slot already full".into()))
        }
    }

    fn close(&mut self, explicit: bool) -> Result<()> {
        self.underlying.close(explicit)
    }

    fn last_error(&self) -> Option<&'static str> {
        (self.buf.state() == StreamState::IoError).then_some("ascii85 decode error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::file::{MemSink, MemSource};

    fn encode(bytes: &[u8]) -> Vec<u8> {
        let mut enc = Ascii85Encoder::new(MemSink::new());
        enc.write_all(bytes).unwrap();
        enc.close(true).unwrap();
        enc.underlying.into_inner()
    }

    fn decode(bytes: &[u8]) -> Result<Vec<u8>> {
        let mut dec = Ascii85Decoder::new(MemSource::new(bytes.to_vec()));
        dec.read_to_vec()
    }

    #[test]
    fn zero_bytes_round_trip() {
        let encoded = encode(&[0, 0, 0, 0]);
        assert_eq!(encoded, b"z~>");
        assert_eq!(decode(b"z~>").unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn full_tuple_round_trip() {
        let encoded = encode(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(encoded, b"s8W-!~>");
        assert_eq!(decode(b"s8W-!~>").unwrap(), vec![0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn deferred_error_on_partial_single_digit() {
        let mut dec = Ascii85Decoder::new(MemSource::new(b"!~>".to_vec()));
        assert_eq!(dec.getc().unwrap(), None);
        assert!(dec.getc().is_err());
    }

    #[test]
    fn overflow_is_rejected() {
        // 'u' 'u' 'u' 'u' 'u' would encode a tuple of 85^5-1 > u32::MAX.
        assert!(decode(b"uuuuu~>").is_err());
    }

    #[test]
    fn arbitrary_bytes_round_trip() {
        let data: Vec<u8> = (0..=255u16).map(|v| v as u8).collect();
        let encoded = encode(&data);
        assert_eq!(decode(&encoded).unwrap(), data);
    }
}
