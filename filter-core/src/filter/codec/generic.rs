//! Generic (spec.md §4.3.6): the device-backed filter. The actual transform
//! lives behind a [`crate::stream::device::Device`]; this module only
//! re-exports the stream-level plumbing under the codec-facing names the
//! registry expects.

pub use crate::stream::device::{Device, GenericInput as GenericDecoder, GenericOutput as GenericEncoder};
