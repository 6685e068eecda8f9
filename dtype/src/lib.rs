//! Canonical element types shared by native buffers and their array views.
//!
//! [`DType`] is the normalized scalar-kind key used everywhere a buffer type
//! has to be named: allocation dispatch, handle classification, and the
//! `typestr` of the interchange descriptor. Twelve kinds are *native* (a
//! buffer class exists for them); the remaining kinds are recognised so that
//! requests for them fail with a precise error instead of a parse failure.

use std::fmt;
use std::str::FromStr;

use enumset::{EnumSet, enum_set};

pub mod cast;
pub mod error;
pub mod ext;

pub use cast::{CastScalar, Scalar};
pub use error::{Error, Result};
pub use ext::{Char, HasDType};


/// Canonical element type identity.
#[derive(Debug, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::VariantArray, strum::FromRepr)]
#[derive(enumset::EnumSetType)]
#[cfg_attr(any(test, feature = "proptest"), derive(proptest_derive::Arbitrary))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[enumset(repr = "u32")]
pub enum DType {
    Bool = 0,

    Int8 = 1,
    UInt8 = 2,
    /// Single-byte character (`S1`).
    Char = 3,
    Int16 = 4,
    UInt16 = 5,
    Int32 = 6,
    UInt32 = 7,
    Int64 = 8,
    UInt64 = 9,

    /// Platform `long`: 4 or 8 bytes depending on the target.
    CLong = 10,
    /// Platform `unsigned long`.
    CULong = 11,

    Float16 = 12,
    Float32 = 13,
    Float64 = 14,
}

impl DType {
    /// Kinds with a registered buffer class.
    ///
    /// `CLong`/`CULong` are excluded because their width differs between
    /// platforms, `Bool` because no native buffer class stores it.
    pub const NATIVE: EnumSet<DType> = enum_set!(
        DType::Int8
            | DType::UInt8
            | DType::Char
            | DType::Int16
            | DType::UInt16
            | DType::Int32
            | DType::UInt32
            | DType::Int64
            | DType::UInt64
            | DType::Float16
            | DType::Float32
            | DType::Float64
    );

    pub const fn bytes(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 | Self::Char => 1,
            Self::Int16 | Self::UInt16 | Self::Float16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
            Self::CLong | Self::CULong => std::mem::size_of::<std::os::raw::c_long>(),
        }
    }

    pub fn is_native(&self) -> bool {
        Self::NATIVE.contains(*self)
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 | Self::CLong)
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64 | Self::CULong)
    }

    pub const fn is_int(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }

    /// Single-character typecode of the host array module (`f`, `d`, `e`, ...).
    pub const fn typecode(&self) -> char {
        match self {
            Self::Bool => '?',
            Self::Int8 => 'b',
            Self::UInt8 => 'B',
            Self::Char => 'c',
            Self::Int16 => 'h',
            Self::UInt16 => 'H',
            Self::Int32 => 'i',
            Self::UInt32 => 'I',
            Self::Int64 => 'q',
            Self::UInt64 => 'Q',
            Self::CLong => 'l',
            Self::CULong => 'L',
            Self::Float16 => 'e',
            Self::Float32 => 'f',
            Self::Float64 => 'd',
        }
    }

    /// Canonical lowercase name (`float32`, `S1`, ...).
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Char => "S1",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::CLong => "long",
            Self::CULong => "ulong",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    const fn kind(&self) -> char {
        match self {
            Self::Bool => 'b',
            Self::Char => 'S',
            Self::Float16 | Self::Float32 | Self::Float64 => 'f',
            _ if self.is_unsigned() => 'u',
            _ => 'i',
        }
    }

    /// Array-interface type string: byte order, kind, and byte width.
    ///
    /// Single-byte kinds use `|` (byte order not applicable); wider kinds use
    /// the target's native order.
    pub fn typestr(&self) -> String {
        let order = match self.bytes() {
            1 => '|',
            _ if cfg!(target_endian = "little") => '<',
            _ => '>',
        };
        format!("{order}{}{}", self.kind(), self.bytes())
    }

    /// Accepts `|`, `=` and the native byte-order marker; foreign byte order is not representable.
    fn from_typestr(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        let order = chars.next()?;
        let native = if cfg!(target_endian = "little") { '<' } else { '>' };
        if order != '|' && order != '=' && order != native {
            return None;
        }
        let kind = chars.next()?;
        let width: usize = chars.as_str().parse().ok()?;
        let dtype = match (kind, width) {
            ('b', 1) => Self::Bool,
            ('S', 1) => Self::Char,
            ('i', 1) => Self::Int8,
            ('i', 2) => Self::Int16,
            ('i', 4) => Self::Int32,
            ('i', 8) => Self::Int64,
            ('u', 1) => Self::UInt8,
            ('u', 2) => Self::UInt16,
            ('u', 4) => Self::UInt32,
            ('u', 8) => Self::UInt64,
            ('f', 2) => Self::Float16,
            ('f', 4) => Self::Float32,
            ('f', 8) => Self::Float64,
            _ => return None,
        };
        Some(dtype)
    }

    fn from_typecode(c: char) -> Option<Self> {
        use strum::VariantArray;
        Self::VARIANTS.iter().copied().find(|dtype| dtype.typecode() == c)
    }
}

impl Default for DType {
    fn default() -> Self {
        Self::Float32
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let dtype = match s {
            "bool" | "bool_" => Some(Self::Bool),
            "int8" | "i1" | "byte" => Some(Self::Int8),
            "uint8" | "u1" | "ubyte" => Some(Self::UInt8),
            "S1" | "char" | "bytes8" => Some(Self::Char),
            "int16" | "i2" | "short" => Some(Self::Int16),
            "uint16" | "u2" | "ushort" => Some(Self::UInt16),
            "int32" | "i4" | "intc" => Some(Self::Int32),
            "uint32" | "u4" | "uintc" => Some(Self::UInt32),
            "int64" | "i8" | "longlong" => Some(Self::Int64),
            "uint64" | "u8" | "ulonglong" => Some(Self::UInt64),
            "long" => Some(Self::CLong),
            "ulong" => Some(Self::CULong),
            "float16" | "f2" | "half" => Some(Self::Float16),
            "float32" | "f4" | "single" | "float" => Some(Self::Float32),
            "float64" | "f8" | "double" => Some(Self::Float64),
            _ => None,
        };

        let mut chars = s.chars();
        let single = match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        };

        dtype
            .or_else(|| single.and_then(Self::from_typecode))
            .or_else(|| Self::from_typestr(s))
            .ok_or_else(|| error::UnknownDTypeSnafu { name: s }.build())
    }
}

impl TryFrom<&str> for DType {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}
