use thiserror::Error;

/// The closed set of error kinds a filter pipeline operation can surface.
///
/// Every kind here corresponds 1:1 to an error name in the specification this
/// crate implements; nothing is added or removed from that set.
#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("io error")]
    Io(#[from] std::io::Error),

    #[error("allocation failed")]
    Vm,

    #[error("unknown stream or codec: {0}")]
    Undefined(String),

    #[error("wrong operand type in init")]
    TypeCheck,

    #[error("value out of range: {0}")]
    RangeCheck(String),

    #[error("missing operand")]
    StackUnderflow,

    #[error("parameter dictionary not readable")]
    InvalidAccess,

    #[error("unsupported stream-header binding byte {0:#x}")]
    UnsupportedBinding(u8),

    #[error("unsupported protocol version {major}.{minor}")]
    UnsupportedProtocolVersion { major: u8, minor: u8 },

    #[error("illegal stream header")]
    IllegalStreamHeader,

    #[error("illegal tag byte {0:#x}")]
    IllegalTag(u8),

    #[error("stream undefined: {0}")]
    StreamUndefined(String),

    #[error("stream calling itself: {0}")]
    StreamCallingItself(String),

    #[error("stream nesting full")]
    StreamNestingFull,

    #[error("illegal data length: declared {declared}, actual {actual}")]
    IllegalDataLength { declared: usize, actual: usize },

    #[error("data source not open")]
    DataSourceNotOpen,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FilterError>;

impl FilterError {
    /// Builds the generic `IOERROR` kind spec.md uses for "malformed byte in
    /// the encoded stream" -- there is no dedicated enum variant for it
    /// because the spec treats it as a plain IO failure, just one raised by
    /// a codec instead of the OS.
    pub fn io_error(message: impl Into<String>) -> FilterError {
        FilterError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, message.into()))
    }
}
