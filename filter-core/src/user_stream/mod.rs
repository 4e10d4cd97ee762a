//! Component F: the user-defined stream cache.

mod cache;

pub use cache::{ReplayStream, StreamCache};
