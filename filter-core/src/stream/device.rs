//! Component E: the Generic/transform-device filter.
//!
//! `Generic` does not transform bytes itself. It delegates buffer fill/flush
//! to an opaque [`Device`] -- the plugin point where LZW/Flate/DCT/CCITT and
//! similar codecs would be wired in by an external implementation. Those
//! codecs' transform bodies are out of scope here (spec.md §1, §4.3.6); only
//! the device-backed plumbing is implemented.

use super::{BufferedStream, InputStream, OutputStream, StreamState};
use crate::error::{FilterError, Result};

/// An opaque external transform device: `open_file`/`read_file`/
/// `write_file`/`close_file`/`abort_file`/`get_buffer_size`/`dismount`, as
/// specified. Device-backed codecs implement this trait instead of the
/// decode/encode buffer transform directly.
pub trait Device {
    /// Declared I/O buffer size this device would like its host stream to
    /// use, not counting the 4-byte alignment prefix.
    fn buffer_size(&self) -> usize {
        1024
    }

    fn open_file(&mut self) -> Result<()> {
        Ok(())
    }

    /// Reads up to `out.len()` bytes, returning the number actually read
    /// (`0` signals EOF).
    fn read_file(&mut self, out: &mut [u8]) -> Result<usize>;

    /// Writes `data`, returning the number of bytes accepted.
    fn write_file(&mut self, data: &[u8]) -> Result<usize>;

    fn close_file(&mut self) -> Result<()> {
        Ok(())
    }

    fn abort_file(&mut self) -> Result<()> {
        Ok(())
    }

    /// Releases any resources the device holds outside the stream's own
    /// buffer (the 4-byte alignment prefix lives with the stream's
    /// allocation and is not part of this).
    fn dismount(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A read-only stream backed by a [`Device`] instead of a codec transform.
pub struct GenericInput {
    device: Box<dyn Device>,
    buf: BufferedStream,
}

impl GenericInput {
    pub fn new(mut device: Box<dyn Device>) -> Result<Self> {
        device.open_file()?;
        let capacity = device.buffer_size() + 4; // 4-byte alignment prefix
        Ok(GenericInput { device, buf: BufferedStream::with_capacity(capacity) })
    }
}

impl InputStream for GenericInput {
    fn getc(&mut self) -> Result<Option<u8>> {
        if let Some(b) = self.buf.take() {
            return Ok(Some(b));
        }
        if self.buf.state() == StreamState::Eof {
            return Ok(None);
        }
        let mut chunk = vec![0u8; self.buf.capacity()];
        let n = self.device.read_file(&mut chunk).map_err(|e| {
            self.buf.set_state(StreamState::IoError);
            e
        })?;
        if n == 0 {
            self.buf.set_state(StreamState::Eof);
            return Ok(None);
        }
        self.buf.load(&chunk[..n]);
        Ok(self.buf.take())
    }

    fn ungetc(&mut self, byte: u8) -> Result<()> {
        if self.buf.push_back(byte) {
            Ok(())
        } else {
            Err(FilterError::RangeCheck("push-back slot already full".into()))
        }
    }

    fn close(&mut self, _explicit: bool) -> Result<()> {
        self.device.close_file()?;
        self.device.dismount()?;
        self.buf.set_state(StreamState::Eof);
        Ok(())
    }

    fn last_error(&self) -> Option<&'static str> {
        (self.buf.state() == StreamState::IoError).then_some("device read failed")
    }
}

/// A write-only stream backed by a [`Device`] instead of a codec transform.
pub struct GenericOutput {
    device: Box<dyn Device>,
}

impl GenericOutput {
    pub fn new(mut device: Box<dyn Device>) -> Result<Self> {
        device.open_file()?;
        Ok(GenericOutput { device })
    }
}

impl OutputStream for GenericOutput {
    fn putc(&mut self, byte: u8) -> Result<()> {
        let n = self.device.write_file(&[byte])?;
        if n == 0 {
            return Err(FilterError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "device accepted zero bytes",
            )));
        }
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0;
        while offset < bytes.len() {
            let n = self.device.write_file(&bytes[offset..])?;
            if n == 0 {
                return Err(FilterError::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "device accepted zero bytes",
                )));
            }
            offset += n;
        }
        Ok(())
    }

    fn flush_file(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self, _explicit: bool) -> Result<()> {
        self.device.close_file()?;
        self.device.dismount()
    }
}
