use crate::DType;
use proptest::prelude::*;

pub fn int_dtype() -> impl Strategy<Value = DType> {
    prop_oneof![
        Just(DType::Int8),
        Just(DType::Int16),
        Just(DType::Int32),
        Just(DType::Int64),
        Just(DType::UInt8),
        Just(DType::UInt16),
        Just(DType::UInt32),
        Just(DType::UInt64),
    ]
}

pub fn float_dtype() -> impl Strategy<Value = DType> {
    prop_oneof![Just(DType::Float16), Just(DType::Float32), Just(DType::Float64)]
}

/// Any of the kinds with a registered buffer class.
pub fn native_dtype() -> impl Strategy<Value = DType> {
    prop_oneof![Just(DType::Char), int_dtype(), float_dtype()]
}

/// Kinds that parse but have no buffer class.
pub fn foreign_dtype() -> impl Strategy<Value = DType> {
    prop_oneof![Just(DType::Bool), Just(DType::CLong), Just(DType::CULong)]
}

/// Shapes of 0 to 4 dimensions with small positive extents.
pub fn shape(max_dim: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1..=max_dim, 0..=4)
}
