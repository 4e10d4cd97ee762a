//! eexec (spec.md §4.3.3): Type-1 font decryption.
//!
//! Both the encryption and decryption transforms use the same running
//! cipher: `plain = cipher ^ (state >> 8)`, `state = (cipher + state) *
//! MULT + ADD` (mod 65536), seeded with a fixed constant. The first `LENIV`
//! decrypted bytes are lookahead padding and are discarded rather than
//! delivered to the caller.

use crate::error::{FilterError, Result};
use crate::stream::{BufferedStream, InputStream, OutputStream, StreamState};

const SEED: u16 = 55665;
const MULT: u16 = 52845;
const ADD: u16 = 22719;
const LENIV: usize = 4;
const BUFFER_SIZE: usize = 1024;

struct Cipher {
    state: u16,
}

impl Cipher {
    fn new() -> Self {
        Cipher { state: SEED }
    }

    fn decrypt(&mut self, cipher: u8) -> u8 {
        let plain = cipher ^ (self.state >> 8) as u8;
        self.state = (cipher as u16).wrapping_add(self.state).wrapping_mul(MULT).wrapping_add(ADD);
        plain
    }

    fn encrypt(&mut self, plain: u8) -> u8 {
        let cipher = plain ^ (self.state >> 8) as u8;
        self.state = (cipher as u16).wrapping_add(self.state).wrapping_mul(MULT).wrapping_add(ADD);
        cipher
    }
}

fn from_hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn is_hex_byte(c: u8) -> bool {
    from_hex_digit(c).is_some() || matches!(c, 9..=13 | 32)
}

/// Encrypts plaintext into raw binary ciphertext, leading with `LENIV`
/// zero-plaintext lookahead bytes so a matching decoder's discard count
/// lines up. Always emits binary; the ASCII-hex-or-binary probe only
/// applies on decode.
pub struct EexecEncoder<U> {
    underlying: U,
    cipher: Cipher,
    leniv_written: bool,
}

impl<U: OutputStream> EexecEncoder<U> {
    pub fn new(underlying: U) -> Self {
        EexecEncoder { underlying, cipher: Cipher::new(), leniv_written: false }
    }

    /// Unwraps the encoder, recovering its sink.
    pub fn into_inner(self) -> U {
        self.underlying
    }

    fn write_leniv_once(&mut self) -> Result<()> {
        for _ in 0..LENIV {
            let c = self.cipher.encrypt(0);
            self.underlying.putc(c)?;
        }
        Ok(())
    }
}

impl<U: OutputStream> OutputStream for EexecEncoder<U> {
    fn putc(&mut self, byte: u8) -> Result<()> {
        if !self.leniv_written {
            self.leniv_written = true;
            self.write_leniv_once()?;
        }
        let c = self.cipher.encrypt(byte);
        self.underlying.putc(c)
    }

    fn flush_file(&mut self) -> Result<()> {
        self.underlying.flush_file()
    }

    fn close(&mut self, explicit: bool) -> Result<()> {
        self.underlying.flush_file()?;
        self.underlying.close(explicit)
    }
}

/// Decodes an eexec-encrypted stream. The first 4 input bytes are probed:
/// if all four are ASCII hex digits (or whitespace), the whole stream is
/// treated as ASCII-hex-encoded ciphertext and hex-decoded before running
/// the cipher; otherwise the input is treated as raw binary ciphertext. The
/// first `LENIV` decrypted bytes are discarded lookahead (spec.md §4.3.3).
pub struct EexecDecoder<U> {
    underlying: U,
    buf: BufferedStream,
    cipher: Cipher,
    leniv_remaining: usize,
    probed: bool,
    hex_mode: bool,
    hex_high: Option<u8>,
    replay: Vec<u8>,
}

impl<U: InputStream> EexecDecoder<U> {
    pub fn new(underlying: U) -> Self {
        EexecDecoder {
            underlying,
            buf: BufferedStream::with_capacity(BUFFER_SIZE),
            cipher: Cipher::new(),
            leniv_remaining: LENIV,
            probed: false,
            hex_mode: false,
            hex_high: None,
            replay: Vec::new(),
        }
    }

    fn raw_getc(&mut self) -> Result<Option<u8>> {
        if let Some(b) = self.replay.pop() {
            return Ok(Some(b));
        }
        self.underlying.getc()
    }

    /// Probes the first four raw bytes to decide hex-vs-binary mode, then
    /// queues them back up for normal consumption. `ungetc` only guarantees
    /// one byte of push-back, so bytes 2..4 are held in a small local replay
    /// buffer instead.
    fn probe(&mut self) -> Result<()> {
        let mut peeked = Vec::with_capacity(4);
        while peeked.len() < 4 {
            match self.underlying.getc()? {
                Some(b) => peeked.push(b),
                None => break,
            }
        }
        self.hex_mode = !peeked.is_empty() && peeked.iter().all(|&b| is_hex_byte(b));
        self.replay = peeked.into_iter().rev().collect();
        self.probed = true;
        Ok(())
    }

    /// Reads the next raw ciphertext byte, transparently hex-decoding pairs
    /// if the stream probed as hex-mode. Returns `None` at end of input.
    fn next_cipher_byte(&mut self) -> Result<Option<u8>> {
        if !self.hex_mode {
            return self.raw_getc();
        }
        loop {
            let c = match self.raw_getc()? {
                Some(c) => c,
                None => return Ok(None),
            };
            if matches!(c, 9..=13 | 32) {
                continue;
            }
            let digit = from_hex_digit(c)
                .ok_or_else(|| FilterError::io_error("illegal non-hex byte in eexec hex stream"))?;
            match self.hex_high.take() {
                Some(h) => return Ok(Some((h << 4) | digit)),
                None => {
                    self.hex_high = Some(digit);
                    continue;
                }
            }
        }
    }

    fn decode_fill(&mut self) -> Result<()> {
        if !self.probed {
            self.probe()?;
        }
        let mut produced = Vec::new();
        loop {
            let c = match self.next_cipher_byte()? {
                Some(c) => c,
                None => {
                    self.buf.load(&produced);
                    self.buf.set_state(StreamState::Eof);
                    return Ok(());
                }
            };
            let plain = self.cipher.decrypt(c);
            if self.leniv_remaining > 0 {
                self.leniv_remaining -= 1;
            } else {
                produced.push(plain);
            }
            if produced.len() >= self.buf.capacity() {
                self.buf.load(&produced);
                return Ok(());
            }
        }
    }
}

impl<U: InputStream> InputStream for EexecDecoder<U> {
    fn getc(&mut self) -> Result<Option<u8>> {
        if let Some(b) = self.buf.take() {
            return Ok(Some(b));
        }
        match self.buf.state() {
            StreamState::Eof | StreamState::IoError => return Ok(None),
            _ => {}
        }
        if let Err(e) = self.decode_fill() {
            self.buf.set_state(StreamState::IoError);
            return Err(e);
        }
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
        (self.buf.state() == StreamState::IoError).then_some("eexec decode error")
    }
}
