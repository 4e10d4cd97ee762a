//! Composable byte-stream filter pipeline: buffered streams, codecs
//! (ASCII85, ASCIIHex, eexec, RunLength, Null, Generic), a filter registry,
//! a user-defined-stream cache, and a tag-structured stream reader.
//!
//! Call [`init`] once per process before wiring any filters, and [`finish`]
//! when the interpreter shuts down (spec.md §9).

pub mod error;
pub mod filter;
pub mod stream;
pub mod tagstream;
pub mod user_stream;

pub use error::{FilterError, Result};
pub use filter::{FilterDescriptor, FilterFlags, FilterName, FilterRegistry, ParamDict, ParamValue};
pub use stream::{InputStream, OutputStream, StreamState};
pub use tagstream::{Endianness, StreamStack, Tag, TagStreamReader, Warning};
pub use user_stream::{ReplayStream, StreamCache};

/// Process-wide state: the filter registry (populated once, read-only
/// afterward) and the per-interpreter stream cache.
pub struct Runtime {
    registry: FilterRegistry,
    cache: StreamCache,
}

impl Runtime {
    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &StreamCache {
        &self.cache
    }
}

/// Registers the six implemented codecs and allocates the stream cache.
/// Mirrors the original `swstart` lifecycle call (spec.md §9).
pub fn init() -> Runtime {
    log::info!("filter-core: initializing registry and stream cache");
    Runtime { registry: FilterRegistry::new(), cache: StreamCache::new() }
}

/// Drops the cache (releasing recorded entries) and the registry. There is
/// presently nothing else process-wide to dismount; devices are owned by
/// whichever `Generic` stream mounted them and are dismounted on that
/// stream's `close`.
pub fn finish(runtime: Runtime) {
    log::info!("filter-core: shutting down ({} cached table capacity)", runtime.cache.table_capacity());
    drop(runtime);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_populates_the_six_implemented_codecs() {
        let runtime = init();
        for name in [
            FilterName::Ascii85,
            FilterName::AsciiHex,
            FilterName::Eexec,
            FilterName::RunLength,
            FilterName::Null,
            FilterName::Generic,
        ] {
            let descriptor = runtime.registry().lookup(name).unwrap();
            assert!(descriptor.implemented);
        }
        finish(runtime);
    }
}
