//! Components G/H and the stream stack: tag-structured binary consumption,
//! independent of the byte-stream codecs in [`crate::filter`].

pub mod embedded;
pub mod reader;
pub mod stack;

pub use embedded::EmbeddedReader;
pub use reader::{Endianness, Tag, TagStreamReader, Warning};
pub use stack::StreamStack;
