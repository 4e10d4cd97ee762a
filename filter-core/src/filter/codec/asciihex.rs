//! ASCIIHex (spec.md §4.3.2).

use crate::error::{FilterError, Result};
use crate::stream::{BufferedStream, InputStream, OutputStream, StreamState};

const BUFFER_SIZE: usize = 1024;
const LINE_WRAP: usize = 80;

fn hex_digit(value: u8) -> u8 {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    DIGITS[(value & 0x0f) as usize]
}

fn from_hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Encodes each byte as two hex digits, wrapping output every 80 characters
/// and emitting a `>` trailer on explicit close.
pub struct AsciiHexEncoder<U> {
    underlying: U,
    column: usize,
}

impl<U: OutputStream> AsciiHexEncoder<U> {
    pub fn new(underlying: U) -> Self {
        AsciiHexEncoder { underlying, column: 0 }
    }

    /// Unwraps the encoder, recovering its sink.
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
}

impl<U: OutputStream> OutputStream for AsciiHexEncoder<U> {
    fn putc(&mut self, byte: u8) -> Result<()> {
        self.emit(hex_digit(byte >> 4))?;
        self.emit(hex_digit(byte))
    }

    fn flush_file(&mut self) -> Result<()> {
        self.underlying.flush_file()
    }

    fn close(&mut self, explicit: bool) -> Result<()> {
        if explicit {
            self.underlying.putc(b'>')?;
        }
        self.underlying.flush_file()?;
        self.underlying.close(explicit)
    }
}

/// Decodes a stream of hex digit pairs. Whitespace between digits is
/// skipped; a lone trailing digit before `>` or EOF is completed with an
/// implicit trailing zero nibble (spec.md §4.3.2). Any other non-hex,
/// non-whitespace byte is a deferred error: bytes already decoded are
/// delivered first.
pub struct AsciiHexDecoder<U> {
    underlying: U,
    buf: BufferedStream,
    high_nibble: Option<u8>,
    deferred_error: Option<&'static str>,
}

impl<U: InputStream> AsciiHexDecoder<U> {
    pub fn new(underlying: U) -> Self {
        AsciiHexDecoder {
            underlying,
            buf: BufferedStream::with_capacity(BUFFER_SIZE),
            high_nibble: None,
            deferred_error: None,
        }
    }

    fn decode_fill(&mut self) -> Result<()> {
        let mut produced = Vec::new();
        loop {
            let c = match self.underlying.getc()? {
                Some(c) => c,
                None => {
                    if let Some(h) = self.high_nibble.take() {
                        produced.push(h << 4);
                    }
                    self.buf.load(&produced);
                    self.buf.set_state(StreamState::Eof);
                    return Ok(());
                }
            };

            match c {
                9..=13 | 32 => continue,
                b'>' => {
                    if let Some(h) = self.high_nibble.take() {
                        produced.push(h << 4);
                    }
                    self.buf.load(&produced);
                    self.buf.set_state(StreamState::Eof);
                    return Ok(());
                }
                _ => match from_hex_digit(c) {
                    Some(d) => match self.high_nibble.take() {
                        Some(h) => produced.push((h << 4) | d),
                        None => self.high_nibble = Some(d),
                    },
                    None => {
                        self.buf.load(&produced);
                        self.deferred_error = Some("illegal non-hex byte in ASCIIHex stream");
                        return Ok(());
                    }
                },
            }

            if produced.len() >= self.buf.capacity() {
                self.buf.load(&produced);
                return Ok(());
            }
        }
    }
}

impl<U: InputStream> InputStream for AsciiHexDecoder<U> {
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
        if let Some(b) = self.buf.take() {
            return Ok(Some(b));
        }
        if let Some(msg) = self.deferred_error.take() {
            self.buf.set_state(StreamState::IoError);
            return Err(FilterError::io_error(msg));
        }
        Ok(None)
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
        (self.buf.state() == StreamState::IoError).then_some("asciihex decode error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::file::{MemSink, MemSource};

    fn encode(bytes: &[u8]) -> Vec<u8> {
        let mut enc = AsciiHexEncoder::new(MemSink::new());
        enc.write_all(bytes).unwrap();
        enc.close(true).unwrap();
        enc.underlying.into_inner()
    }

    fn decode(bytes: &[u8]) -> Result<Vec<u8>> {
        let mut dec = AsciiHexDecoder::new(MemSource::new(bytes.to_vec()));
        dec.read_to_vec()
    }

    #[test]
    fn round_trip() {
        let data = b"Hello, world!";
        let encoded = encode(data);
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn odd_digit_count_pads_low_nibble() {
        assert_eq!(decode(b"4").unwrap(), vec![0x40]);
        assert_eq!(decode(b"4>").unwrap(), vec![0x40]);
    }

    #[test]
    fn whitespace_between_digits_is_ignored() {
        assert_eq!(decode(b"48 65 6c 6c 6f>").unwrap(), b"Hello");
    }

    #[test]
    fn illegal_byte_is_deferred_error() {
        let mut dec = AsciiHexDecoder::new(MemSource::new(b"48gg".to_vec()));
        assert_eq!(dec.getc().unwrap(), Some(b'H'));
        assert!(dec.getc().is_err());
    }
}
