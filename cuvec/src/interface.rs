//! Array interchange descriptor (array interface protocol, version 3).

use std::str::FromStr;

use cuvec_dtype::DType;
use snafu::ResultExt;

use crate::error::{DTypeSnafu, Result};

/// What another numeric library needs to wrap a view's memory without copying.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArrayInterface {
    pub shape: Vec<usize>,
    /// Byte order, kind and item size, e.g. `<f4`.
    pub typestr: String,
    /// Address of the first element and the read-only flag.
    pub data: (usize, bool),
    /// Byte strides. `None` means C-contiguous.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub strides: Option<Vec<isize>>,
    pub version: u32,
}

impl ArrayInterface {
    pub const VERSION: u32 = 3;

    pub fn new(shape: Vec<usize>, typestr: String, address: usize, readonly: bool) -> Self {
        Self { shape, typestr, data: (address, readonly), strides: None, version: Self::VERSION }
    }

    pub fn with_strides(mut self, strides: Vec<isize>) -> Self {
        self.strides = Some(strides);
        self
    }

    pub fn address(&self) -> usize {
        self.data.0
    }

    pub fn is_readonly(&self) -> bool {
        self.data.1
    }

    pub fn dtype(&self) -> Result<DType> {
        DType::from_str(&self.typestr).context(DTypeSnafu)
    }
}
