//! Component B: the Filter Descriptor.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The closed set of filter names the registry knows about. Not all of
/// these have an implemented transform; see `spec.md` §4.4 -- CCITTFax, DCT,
/// Flate, LZW, AES, and RC4 are registered so that `inverse_name` and
/// registry lookups are total, but their `fill_buffer`/`flush_buffer`
/// return `FilterError::Undefined` (their algorithms are out of scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterName {
    Ascii85,
    AsciiHex,
    Eexec,
    RunLength,
    Null,
    Generic,
    CcittFax,
    Dct,
    Flate,
    Lzw,
    Aes,
    Rc4,
    Stream,
}

impl FilterName {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterName::Ascii85 => "ASCII85",
            FilterName::AsciiHex => "ASCIIHex",
            FilterName::Eexec => "eexec",
            FilterName::RunLength => "RunLength",
            FilterName::Null => "Null",
            FilterName::Generic => "Generic",
            FilterName::CcittFax => "CCITTFax",
            FilterName::Dct => "DCT",
            FilterName::Flate => "Flate",
            FilterName::Lzw => "LZW",
            FilterName::Aes => "AES",
            FilterName::Rc4 => "RC4",
            FilterName::Stream => "Stream",
        }
    }

    pub fn from_str(name: &str) -> Option<Self> {
        Some(match name {
            "ASCII85" => FilterName::Ascii85,
            "ASCIIHex" => FilterName::AsciiHex,
            "eexec" => FilterName::Eexec,
            "RunLength" => FilterName::RunLength,
            "Null" => FilterName::Null,
            "Generic" => FilterName::Generic,
            "CCITTFax" => FilterName::CcittFax,
            "DCT" => FilterName::Dct,
            "Flate" => FilterName::Flate,
            "LZW" => FilterName::Lzw,
            "AES" => FilterName::Aes,
            "RC4" => FilterName::Rc4,
            "Stream" => FilterName::Stream,
            _ => return None,
        })
    }
}

/// Readable/writable/expands flags recorded on a Filter Descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterFlags(u8);

impl FilterFlags {
    pub const READABLE: FilterFlags = FilterFlags(0b001);
    pub const WRITABLE: FilterFlags = FilterFlags(0b010);
    pub const EXPANDS: FilterFlags = FilterFlags(0b100);

    pub const fn union(self, other: FilterFlags) -> FilterFlags {
        FilterFlags(self.0 | other.0)
    }

    pub const fn contains(self, other: FilterFlags) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for FilterFlags {
    type Output = FilterFlags;
    fn bitor(self, rhs: FilterFlags) -> FilterFlags {
        self.union(rhs)
    }
}

/// Immutable per-codec metadata, recorded once at registration and never
/// mutated afterward (the registry itself is process-wide and read-only
/// after `init`).
#[derive(Debug, Clone)]
pub struct FilterDescriptor {
    pub name: FilterName,
    pub flags: FilterFlags,
    pub implemented: bool,
}

impl FilterDescriptor {
    pub fn new(name: FilterName, flags: FilterFlags, implemented: bool) -> Self {
        FilterDescriptor { name, flags, implemented }
    }
}

/// A codec-specific parameter value as accepted from a parameter dictionary
/// passed to `filter-init`. `serde`-derived so a `ParamDict` can round-trip
/// through an on-disk test-fixture format (`bincode`), the same pairing
/// `adder-codec-core` uses for its metadata types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(i64),
    Name(String),
    Bool(bool),
}

impl ParamValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

/// A parameter dictionary, as passed to `filter-init` (spec.md §4.2, §6).
pub type ParamDict = HashMap<String, ParamValue>;
