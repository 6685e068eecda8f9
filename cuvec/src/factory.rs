//! Allocation and adoption entry points.

use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use cuvec_device::{Allocator, RawHandle, default_allocator, registry};
use cuvec_dtype::DType;
use snafu::{OptionExt, ResultExt};
use tracing::debug;

use crate::error::*;
use crate::host::{self, NumericArray};
use crate::layout::Order;
use crate::view::{Construction, DualView};

/// Creates views over fresh native buffers from one allocator.
#[derive(Clone)]
pub struct Factory {
    allocator: Arc<dyn Allocator>,
}

impl Default for Factory {
    fn default() -> Self {
        Self::new(default_allocator())
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory").field("allocator", &self.allocator.name()).finish()
    }
}

impl Factory {
    pub fn new(allocator: Arc<dyn Allocator>) -> Self {
        Self { allocator }
    }

    pub fn allocator(&self) -> &Arc<dyn Allocator> {
        &self.allocator
    }

    /// Zero-filled native buffer of `shape` and `dtype`, wrapped in a view.
    pub fn zeros(&self, shape: &[usize], dtype: DType) -> Result<DualView> {
        let handle = registry::allocate_in(self.allocator.clone(), shape, dtype).context(DeviceSnafu)?;
        DualView::construct(Construction::WrapRaw(handle))
    }

    /// Fresh C-ordered copy of `source` with its own dtype.
    pub fn copy(&self, source: &dyn NumericArray) -> Result<DualView> {
        self.copy_as(source, source.dtype(), Order::C)
    }

    /// [`Factory::copy`], returning the native buffer handle of the copy.
    pub fn copy_raw(&self, source: &dyn NumericArray) -> Result<Rc<dyn RawHandle>> {
        self.copy(source)?.handle().cloned().context(MissingBufferSnafu)
    }

    /// Returns a view of `source`, copying only when it is not already a
    /// native buffer (or attached view) of the requested dtype and order.
    ///
    /// Numeric arrays and plain element vectors are always copied.
    pub fn asarray(&self, source: &dyn Any, dtype: Option<DType>, order: Option<Order>) -> Result<DualView> {
        match Construction::classify(source) {
            Construction::WrapRaw(handle) => self.adopt(DualView::wrap_raw(handle)?, dtype, order),
            Construction::WrapView(view) => self.adopt(view.clone(), dtype, order),
            Construction::CopyFromArray(array) => self.copy_converted(array, dtype, order),
            Construction::Invalid => match host::sequence_of(source) {
                Some(sequence) => self.copy_converted(sequence, dtype, order),
                None => InvalidConstructionSnafu.fail(),
            },
        }
    }

    /// [`Factory::asarray`] for a typed host array, which may borrow its data.
    ///
    /// Host arrays are never native buffers, so this always copies.
    pub fn asarray_from(&self, source: &dyn NumericArray, dtype: Option<DType>, order: Option<Order>) -> Result<DualView> {
        self.copy_converted(source, dtype, order)
    }

    fn adopt(&self, view: DualView, dtype: Option<DType>, order: Option<Order>) -> Result<DualView> {
        let dtype = dtype.unwrap_or(view.dtype());
        let layout_ok =
            order.is_none_or(|order| order.is_satisfied_by(view.is_c_contiguous(), view.is_f_contiguous()));
        if dtype == view.dtype() && layout_ok {
            debug!(%dtype, shape = ?view.shape(), "new view");
            return Ok(view);
        }
        self.copy_converted(&view, Some(dtype), order)
    }

    fn copy_converted(&self, source: &dyn NumericArray, dtype: Option<DType>, order: Option<Order>) -> Result<DualView> {
        let order = Order::resolve(order, source.is_c_contiguous(), source.is_f_contiguous());
        self.copy_as(source, dtype.unwrap_or(source.dtype()), order)
    }

    /// Column-major copies are the transpose of a C-ordered buffer holding
    /// the reversed shape.
    fn copy_as(&self, source: &dyn NumericArray, dtype: DType, order: Order) -> Result<DualView> {
        let shape = source.shape();
        if !source.dtype().can_safe_cast(dtype) {
            debug!(from = %source.dtype(), to = %dtype, "lossy conversion");
        }
        debug!(%dtype, ?shape, %order, "copy");

        let mut view = match order {
            Order::F => {
                let reversed: Vec<usize> = shape.iter().rev().copied().collect();
                self.zeros(&reversed, dtype)?.transpose()
            }
            _ => self.zeros(&shape, dtype)?,
        };
        source.copy_into(&mut view)?;
        Ok(view)
    }
}

/// [`Factory::zeros`] with the default allocator.
pub fn zeros(shape: &[usize], dtype: DType) -> Result<DualView> {
    Factory::default().zeros(shape, dtype)
}

/// [`Factory::copy`] with the default allocator.
pub fn copy(source: &dyn NumericArray) -> Result<DualView> {
    Factory::default().copy(source)
}

/// [`Factory::copy_raw`] with the default allocator.
pub fn copy_raw(source: &dyn NumericArray) -> Result<Rc<dyn RawHandle>> {
    Factory::default().copy_raw(source)
}

/// [`Factory::asarray_from`] with the default allocator.
pub fn asarray_from(source: &dyn NumericArray, dtype: Option<DType>, order: Option<Order>) -> Result<DualView> {
    Factory::default().asarray_from(source, dtype, order)
}

/// [`Factory::asarray`] with the default allocator.
pub fn asarray(source: &dyn Any, dtype: Option<DType>, order: Option<Order>) -> Result<DualView> {
    Factory::default().asarray(source, dtype, order)
}
