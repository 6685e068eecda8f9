use std::mem::ManuallyDrop;
use std::ptr::NonNull;
use std::sync::Arc;

use cuvec_dtype::DType;
use snafu::{OptionExt, ensure};
use tracing::trace;

use crate::allocator::{Allocator, BufferOptions, RawBuffer};
use crate::error::{IndexOutOfBoundsSnafu, InvalidShapeSnafu, Result};

/// One allocation, shared by every handle that references it.
///
/// Handles hold it through `Rc`; when the last one is dropped the memory is
/// returned to the allocator that produced it, exactly once.
#[derive(Debug)]
pub struct Allocation {
    raw: ManuallyDrop<RawBuffer>,
    allocator: Arc<dyn Allocator>,
    options: BufferOptions,
}

impl Allocation {
    pub fn new(allocator: Arc<dyn Allocator>, size: usize, options: BufferOptions) -> Result<Self> {
        let raw = allocator.alloc(size, &options)?;
        Ok(Self { raw: ManuallyDrop::new(raw), allocator, options })
    }

    /// Host-addressable base address, stable for the allocation's lifetime.
    pub fn as_ptr(&self) -> NonNull<u8> {
        self.raw.as_ptr()
    }

    /// Size of the allocation in bytes.
    pub fn size(&self) -> usize {
        self.raw.size()
    }

    pub fn options(&self) -> &BufferOptions {
        &self.options
    }

    /// Get the allocator used by this allocation.
    pub fn allocator(&self) -> &dyn Allocator {
        &*self.allocator
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        // SAFETY: `raw` is never touched again after this point.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        trace!(size = raw.size(), allocator = self.allocator.name(), "freeing allocation");
        self.allocator.free(raw);
    }
}

/// Byte size of a `dtype` buffer with `shape`.
///
/// Every extent must be positive; a 0-d shape holds one element.
pub fn byte_size(dtype: DType, shape: &[usize]) -> Result<usize> {
    ensure!(shape.iter().all(|&dim| dim > 0), InvalidShapeSnafu { shape: shape.to_vec(), dtype });
    shape
        .iter()
        .try_fold(dtype.bytes(), |acc, &dim| acc.checked_mul(dim))
        .filter(|&size| size <= isize::MAX as usize)
        .context(InvalidShapeSnafu { shape: shape.to_vec(), dtype })
}

/// Row-major flat position of a multi-dimensional `index`.
pub fn flat_index(shape: &[usize], index: &[usize]) -> Result<usize> {
    ensure!(
        index.len() == shape.len() && index.iter().zip(shape).all(|(i, dim)| i < dim),
        IndexOutOfBoundsSnafu { index: index.to_vec(), shape: shape.to_vec() }
    );
    Ok(index.iter().zip(shape).fold(0, |flat, (i, dim)| flat * dim + i))
}
