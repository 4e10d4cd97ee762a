//! Components B-D: filter descriptors, the codec implementations, and the
//! process-wide registry that ties a [`descriptor::FilterName`] to a
//! constructible stream.

pub mod codec;
pub mod descriptor;
pub mod registry;

pub use descriptor::{FilterDescriptor, FilterFlags, FilterName, ParamDict, ParamValue};
pub use registry::FilterRegistry;
