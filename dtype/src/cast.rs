use super::*;
use enumset::EnumSet;
use half::f16;

/// An element value in transit between two dtypes.
///
/// Conversions follow unsafe-cast semantics: integer narrowing wraps,
/// float-to-integer truncates toward zero (saturating at the bounds,
/// NaN becomes zero), integer-to-float rounds to nearest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Scalar {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Bool(b) => b as i64,
            Self::Int(i) => i,
            Self::UInt(u) => u as i64,
            Self::Float(f) => f as i64,
        }
    }

    pub fn as_u64(self) -> u64 {
        match self {
            Self::Bool(b) => b as u64,
            Self::Int(i) => i as u64,
            Self::UInt(u) => u,
            Self::Float(f) => f as u64,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Bool(b) => b as u8 as f64,
            Self::Int(i) => i as f64,
            Self::UInt(u) => u as f64,
            Self::Float(f) => f,
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Int(i) => i != 0,
            Self::UInt(u) => u != 0,
            Self::Float(f) => f != 0.0,
        }
    }
}

/// Conversion of a Rust scalar to and from [`Scalar`].
pub trait CastScalar: Copy {
    fn to_scalar(self) -> Scalar;
    fn from_scalar(value: Scalar) -> Self;

    fn cast<U: CastScalar>(self) -> U {
        U::from_scalar(self.to_scalar())
    }
}

macro_rules! impl_cast_int {
    ($variant:ident, $wide:ident, $($ty:ty),*) => {
        $(impl CastScalar for $ty {
            fn to_scalar(self) -> Scalar {
                Scalar::$variant(self as _)
            }

            fn from_scalar(value: Scalar) -> Self {
                match value {
                    // Saturating float conversion, then wrap like any other integer.
                    Scalar::Float(f) => f as $ty,
                    other => other.$wide() as $ty,
                }
            }
        })*
    };
}

impl_cast_int!(Int, as_i64, i8, i16, i32, i64);
impl_cast_int!(UInt, as_u64, u8, u16, u32, u64);

impl CastScalar for bool {
    fn to_scalar(self) -> Scalar {
        Scalar::Bool(self)
    }

    fn from_scalar(value: Scalar) -> Self {
        value.as_bool()
    }
}

impl CastScalar for Char {
    fn to_scalar(self) -> Scalar {
        Scalar::UInt(self.0 as u64)
    }

    fn from_scalar(value: Scalar) -> Self {
        Char(u8::from_scalar(value))
    }
}

impl CastScalar for f16 {
    fn to_scalar(self) -> Scalar {
        Scalar::Float(self.to_f64())
    }

    fn from_scalar(value: Scalar) -> Self {
        f16::from_f64(value.as_f64())
    }
}

impl CastScalar for f32 {
    fn to_scalar(self) -> Scalar {
        Scalar::Float(self as f64)
    }

    fn from_scalar(value: Scalar) -> Self {
        value.as_f64() as f32
    }
}

impl CastScalar for f64 {
    fn to_scalar(self) -> Scalar {
        Scalar::Float(self)
    }

    fn from_scalar(value: Scalar) -> Self {
        value.as_f64()
    }
}

impl DType {
    const fn promotion_lattice(self) -> &'static [Self] {
        use DType::*;
        match self {
            Bool => &[Int8, UInt8],
            Char => &[UInt8],
            Int8 => &[Int16],
            Int16 => &[Int32],
            Int32 => &[Int64],
            Int64 | CLong => &[Float64],
            UInt8 => &[Int16, UInt16],
            UInt16 => &[Int32, UInt32],
            UInt32 => &[Int64, UInt64],
            UInt64 | CULong => &[Float64],
            Float16 => &[Float32],
            Float32 => &[Float64],
            Float64 => &[],
        }
    }

    fn get_recursive_parents(self) -> EnumSet<Self> {
        self.promotion_lattice()
            .iter()
            .fold(EnumSet::only(self), |dtypes, &parent| dtypes.union(parent.get_recursive_parents()))
    }

    /// Check whether every value of `self` is representable in `to`.
    ///
    /// Platform-width kinds are compared by byte width against the fixed
    /// width kind of the same signedness.
    pub fn can_safe_cast(self, to: Self) -> bool {
        if self == to {
            return true;
        }
        match (self, to) {
            (Self::CLong, Self::Int32 | Self::Int64) | (Self::CULong, Self::UInt32 | Self::UInt64) => {
                self.bytes() <= to.bytes()
            }
            (Self::Int32 | Self::Int64, Self::CLong) | (Self::UInt32 | Self::UInt64, Self::CULong) => {
                self.bytes() <= to.bytes()
            }
            _ => self.get_recursive_parents().contains(to),
        }
    }
}
