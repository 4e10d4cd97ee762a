//! Component §4.8: the bounded stream stack.
//!
//! A parser keeps at most 33 tag streams active at once; the top of the
//! stack is always the stream currently being read. `exec_stream` pushes a
//! replay of a recorded user-defined stream; EOF of a replay naturally pops
//! it back to whatever was reading before.

use super::reader::{Tag, TagStreamReader};
use crate::error::{FilterError, Result};
use crate::stream::InputStream;
use crate::user_stream::StreamCache;

const MAX_DEPTH: usize = 33;

pub struct StreamStack {
    frames: Vec<TagStreamReader<Box<dyn InputStream>>>,
}

impl StreamStack {
    pub fn new() -> Self {
        StreamStack { frames: Vec::new() }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push_stream(&mut self, source: Box<dyn InputStream>) -> Result<()> {
        if self.frames.len() >= MAX_DEPTH {
            return Err(FilterError::StreamNestingFull);
        }
        self.frames.push(TagStreamReader::new(source));
        Ok(())
    }

    /// Closes and removes the top frame.
    pub fn pop_stream(&mut self) -> Result<()> {
        let mut frame = self.frames.pop().ok_or(FilterError::DataSourceNotOpen)?;
        frame.close(true)
    }

    /// Pushes a replay of `name` from `cache` onto the stack.
    pub fn exec_stream(&mut self, cache: &StreamCache, name: &str) -> Result<()> {
        let replay = cache.exec_stream(name)?;
        self.push_stream(Box::new(replay))
    }

    pub fn top_mut(&mut self) -> Option<&mut TagStreamReader<Box<dyn InputStream>>> {
        self.frames.last_mut()
    }

    /// Reads the next tag from the active stream, transparently popping
    /// exhausted replay frames and resuming whatever was reading below
    /// them. Returns `Ok(None)` only when the bottom-most frame itself is
    /// exhausted.
    pub fn next_tag(&mut self) -> Result<Option<Tag>> {
        loop {
            let frame = self.frames.last_mut().ok_or(FilterError::DataSourceNotOpen)?;
            match frame.next_tag()? {
                Some(tag) => return Ok(Some(tag)),
                None => {
                    if self.frames.len() == 1 {
                        return Ok(None);
                    }
                    self.frames.pop();
                }
            }
        }
    }
}

impl Default for StreamStack {
    fn default() -> Self {
        Self::new()
    }
}
