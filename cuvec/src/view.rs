//! [`DualView`]: a host numeric-array view over a native buffer.
//!
//! A view never owns memory on its own. It holds a shared reference to the
//! native buffer handle it was built from (or, for detached views, to a plain
//! host allocation), so the memory outlives every view of it.

use std::any::Any;
use std::fmt;
use std::ops::Range;
use std::ptr::NonNull;
use std::rc::Rc;
use std::sync::Arc;

use cuvec_device::error::UnsupportedTypeSnafu;
use cuvec_device::{Allocation, BufferOptions, Element, HostAllocator, RawHandle, Vector, byte_size, classify, with_element};
use cuvec_dtype::{CastScalar, DType, Scalar};
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, IxDyn, ShapeBuilder};
use smallvec::SmallVec;
use snafu::{OptionExt, ResultExt, ensure};
use tracing::debug;

use crate::error::*;
use crate::factory::Factory;
use crate::host::{self, NumericArray};
use crate::interface::ArrayInterface;
use crate::layout::{self, Dims, Offsets, Strides};

#[derive(Clone)]
enum Storage {
    /// Native buffer handle. The view keeps it alive.
    Attached(Rc<dyn RawHandle>),
    /// Host memory with no buffer handle.
    Detached(Rc<Allocation>),
}

impl Storage {
    fn base(&self) -> NonNull<u8> {
        match self {
            Storage::Attached(handle) => handle.as_ptr(),
            Storage::Detached(allocation) => allocation.as_ptr(),
        }
    }

    fn is_readonly(&self) -> bool {
        match self {
            Storage::Attached(handle) => handle.is_readonly(),
            Storage::Detached(_) => false,
        }
    }
}

/// The construction paths of [`DualView`], decided from the input value.
pub enum Construction<'a> {
    /// A native buffer handle, wrapped without copying.
    WrapRaw(Rc<dyn RawHandle>),
    /// An existing view with an attached buffer, aliased.
    WrapView(&'a DualView),
    /// Any other numeric array, copied into a fresh buffer.
    CopyFromArray(&'a dyn NumericArray),
    Invalid,
}

impl<'a> Construction<'a> {
    pub fn classify(value: &'a dyn Any) -> Self {
        if let Some(handle) = classify::raw_handle_of(value) {
            return Self::WrapRaw(handle);
        }
        if let Some(view) = value.downcast_ref::<DualView>() {
            return if view.has_buffer() { Self::WrapView(view) } else { Self::CopyFromArray(view) };
        }
        match host::numeric_array_of(value) {
            Some(array) => Self::CopyFromArray(array),
            None => Self::Invalid,
        }
    }
}

impl fmt::Debug for Construction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrapRaw(handle) => f.debug_tuple("WrapRaw").field(&handle.class_name()).finish(),
            Self::WrapView(view) => f.debug_tuple("WrapView").field(view).finish(),
            Self::CopyFromArray(array) => f
                .debug_struct("CopyFromArray")
                .field("dtype", &array.dtype())
                .field("shape", &array.shape())
                .finish(),
            Self::Invalid => f.write_str("Invalid"),
        }
    }
}

/// Strided view over a native buffer, readable and writable from host code.
///
/// Cloning a view is cheap and aliases the same memory.
#[derive(Clone)]
pub struct DualView {
    storage: Storage,
    dtype: DType,
    shape: Dims,
    /// In elements.
    strides: Strides,
    /// First element, in elements from the buffer start.
    offset: usize,
}

impl DualView {
    /// Builds a view from a native buffer handle, another view, or a numeric
    /// array. Everything else is rejected with [`Error::InvalidConstruction`].
    pub fn new(value: &dyn Any) -> Result<Self> {
        Self::construct(Construction::classify(value))
    }

    pub fn construct(construction: Construction<'_>) -> Result<Self> {
        match construction {
            Construction::WrapRaw(handle) => Self::wrap_raw(handle),
            Construction::WrapView(view) => {
                debug!(dtype = %view.dtype, shape = ?view.shape, "new view");
                Ok(view.clone())
            }
            Construction::CopyFromArray(array) => Factory::default().copy(array),
            Construction::Invalid => InvalidConstructionSnafu.fail(),
        }
    }

    pub fn wrap_raw(handle: Rc<dyn RawHandle>) -> Result<Self> {
        let dtype = handle.dtype();
        if !dtype.is_native() {
            return unsupported(dtype);
        }
        let address = handle.as_ptr().as_ptr() as usize;
        ensure!(address % dtype.bytes() == 0, MisalignedSnafu { address, dtype });
        let shape: Dims = SmallVec::from_slice(handle.shape());
        debug!(class = handle.class_name(), %dtype, ?shape, "wrap raw");
        Ok(Self {
            strides: layout::c_strides(&shape),
            shape,
            dtype,
            offset: 0,
            storage: Storage::Attached(handle),
        })
    }

    /// Copies `array` into plain host memory. The result has no native buffer,
    /// so it cannot produce an interchange descriptor.
    pub fn from_host(array: &dyn NumericArray) -> Result<Self> {
        let dtype = array.dtype();
        let shape = array.shape();
        let size = byte_size(dtype, &shape).context(DeviceSnafu)?;
        let allocation = Allocation::new(Arc::new(HostAllocator), size, BufferOptions::zeroed()).context(DeviceSnafu)?;
        let mut view = Self {
            storage: Storage::Detached(Rc::new(allocation)),
            dtype,
            strides: layout::c_strides(&shape),
            shape,
            offset: 0,
        };
        array.copy_into(&mut view)?;
        debug!(%dtype, shape = ?view.shape, "detached copy");
        Ok(view)
    }

    /// The attached native buffer handle.
    pub fn handle(&self) -> Option<&Rc<dyn RawHandle>> {
        match &self.storage {
            Storage::Attached(handle) => Some(handle),
            Storage::Detached(_) => None,
        }
    }

    pub fn has_buffer(&self) -> bool {
        self.handle().is_some()
    }

    /// The attached handle as a typed buffer, when it is one of this crate's classes.
    pub fn vector<T: Element>(&self) -> Option<Vector<T>> {
        self.handle()?.as_any().downcast_ref::<Vector<T>>().cloned()
    }

    /// Whether both views read and write the same memory.
    pub fn shares_buffer(&self, other: &DualView) -> bool {
        self.storage.base() == other.storage.base()
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn byte_strides(&self) -> Strides {
        let itemsize = self.dtype.bytes() as isize;
        self.strides.iter().map(|&stride| stride * itemsize).collect()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Always false: zero extents are rejected at allocation.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn nbytes(&self) -> usize {
        self.len() * self.dtype.bytes()
    }

    pub fn is_readonly(&self) -> bool {
        self.storage.is_readonly()
    }

    pub fn is_c_contiguous(&self) -> bool {
        layout::is_c_contiguous(&self.shape, &self.strides)
    }

    pub fn is_f_contiguous(&self) -> bool {
        layout::is_f_contiguous(&self.shape, &self.strides)
    }

    /// Address of the first element of the view.
    pub fn as_ptr(&self) -> *const u8 {
        self.first().cast_const()
    }

    fn base<T>(&self) -> *mut T {
        self.storage.base().as_ptr().cast::<T>()
    }

    fn first(&self) -> *mut u8 {
        self.storage.base().as_ptr().wrapping_add(self.offset * self.dtype.bytes())
    }

    fn check_dtype<T: Element>(&self) -> Result<()> {
        ensure!(T::DTYPE == self.dtype, DTypeMismatchSnafu { expected: T::DTYPE, actual: self.dtype });
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        ensure!(!self.is_readonly(), ReadOnlySnafu);
        Ok(())
    }

    fn offset_of(&self, index: &[usize]) -> Result<usize> {
        ensure!(
            index.len() == self.ndim() && index.iter().zip(&self.shape).all(|(i, dim)| i < dim),
            IndexOutOfBoundsSnafu { index: index.to_vec(), shape: self.shape.to_vec() }
        );
        let offset = index
            .iter()
            .zip(&self.strides)
            .fold(self.offset as isize, |acc, (&i, &stride)| acc + i as isize * stride);
        Ok(offset as usize)
    }

    fn values<T: Element>(&self) -> impl Iterator<Item = T> + '_ {
        let base = self.base::<T>();
        // SAFETY: every offset addresses an element inside the storage, which
        // the borrow of `self` keeps alive.
        Offsets::new(&self.shape, &self.strides, self.offset).map(move |offset| unsafe { base.add(offset).read() })
    }

    fn boxed_scalars<T: Element>(&self) -> Box<dyn Iterator<Item = Scalar> + '_> {
        Box::new(self.values::<T>().map(CastScalar::to_scalar))
    }

    pub fn get<T: Element>(&self, index: &[usize]) -> Result<T> {
        self.check_dtype::<T>()?;
        let offset = self.offset_of(index)?;
        // SAFETY: `offset_of` checked the index against the view's shape.
        Ok(unsafe { self.base::<T>().add(offset).read() })
    }

    pub fn set<T: Element>(&mut self, index: &[usize], value: T) -> Result<()> {
        self.check_dtype::<T>()?;
        self.check_writable()?;
        let offset = self.offset_of(index)?;
        // SAFETY: as in `get`.
        unsafe { self.base::<T>().add(offset).write(value) };
        Ok(())
    }

    /// Element at `index`, whatever the view's dtype.
    pub fn get_scalar(&self, index: &[usize]) -> Result<Scalar> {
        with_element!(self.dtype, T => self.get::<T>(index).map(CastScalar::to_scalar))
            .unwrap_or_else(|| unsupported(self.dtype))
    }

    /// Elements in logical row-major order.
    pub fn iter<T: Element>(&self) -> Result<impl Iterator<Item = T> + '_> {
        self.check_dtype::<T>()?;
        Ok(self.values::<T>())
    }

    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        Ok(self.iter::<T>()?.collect())
    }

    /// Owned host copy with the view's logical shape.
    pub fn to_ndarray<T: Element>(&self) -> Result<ArrayD<T>> {
        let values = self.to_vec::<T>()?;
        ArrayD::from_shape_vec(IxDyn(&self.shape), values)
            .ok()
            .context(ShapeMismatchSnafu { expected: self.shape.to_vec(), actual: vec![self.len()] })
    }

    pub fn fill<T: Element>(&mut self, value: T) -> Result<()> {
        self.assign_iter(self.len(), std::iter::repeat(value))
    }

    /// Element-wise copy from `source` in logical order, converting dtypes.
    pub fn assign(&mut self, source: &dyn NumericArray) -> Result<()> {
        ensure!(
            source.len() == self.len(),
            ShapeMismatchSnafu { expected: self.shape.to_vec(), actual: source.shape().to_vec() }
        );
        source.copy_into(self)
    }

    /// Writes `len` values of the view's own element type in logical order.
    pub fn assign_iter<T: Element>(&mut self, len: usize, values: impl Iterator<Item = T>) -> Result<()> {
        self.check_dtype::<T>()?;
        self.check_writable()?;
        ensure!(len == self.len(), ShapeMismatchSnafu { expected: self.shape.to_vec(), actual: vec![len] });

        let base = self.base::<T>();
        for (offset, value) in Offsets::new(&self.shape, &self.strides, self.offset).zip(values) {
            // SAFETY: as in `values`.
            unsafe { base.add(offset).write(value) };
        }
        Ok(())
    }

    /// Writes `len` scalars in logical order, converting each to the view's dtype.
    pub fn assign_scalars(&mut self, len: usize, values: impl Iterator<Item = Scalar>) -> Result<()> {
        let dtype = self.dtype;
        with_element!(dtype, T => self.assign_iter(len, values.map(T::from_scalar))).unwrap_or_else(|| unsupported(dtype))
    }

    /// Borrows the elements as an `ndarray` view.
    ///
    /// # Safety
    ///
    /// No other view of the same buffer may be written while the returned
    /// array view is alive.
    pub unsafe fn as_array<T: Element>(&self) -> Result<ArrayViewD<'_, T>> {
        self.check_dtype::<T>()?;
        let shape = IxDyn(&self.shape).strides(IxDyn(&self.unsigned_strides()));
        // SAFETY: shape and strides stay inside the storage, which `self` keeps alive.
        Ok(unsafe { ArrayViewD::from_shape_ptr(shape, self.first().cast::<T>()) })
    }

    /// Mutably borrows the elements as an `ndarray` view.
    ///
    /// # Safety
    ///
    /// No other view of the same buffer may be read or written while the
    /// returned array view is alive.
    pub unsafe fn as_array_mut<T: Element>(&mut self) -> Result<ArrayViewMutD<'_, T>> {
        self.check_dtype::<T>()?;
        self.check_writable()?;
        let shape = IxDyn(&self.shape).strides(IxDyn(&self.unsigned_strides()));
        // SAFETY: as in `as_array`.
        Ok(unsafe { ArrayViewMutD::from_shape_ptr(shape, self.first().cast::<T>()) })
    }

    fn unsigned_strides(&self) -> Vec<usize> {
        self.strides.iter().map(|&stride| stride as usize).collect()
    }

    /// Same elements under a new shape. Only C-contiguous views can be reshaped.
    pub fn reshape(&self, shape: &[usize]) -> Result<Self> {
        let len = shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim));
        ensure!(
            len == Some(self.len()),
            ReshapeSizeMismatchSnafu { from: self.shape.to_vec(), to: shape.to_vec() }
        );
        ensure!(self.is_c_contiguous(), NotContiguousSnafu { operation: "reshape" });
        Ok(Self { shape: SmallVec::from_slice(shape), strides: layout::c_strides(shape), ..self.clone() })
    }

    /// Elements `range` of `axis`, taking every `step`-th one.
    pub fn slice_axis(&self, axis: usize, range: Range<usize>, step: usize) -> Result<Self> {
        ensure!(axis < self.ndim(), AxisOutOfRangeSnafu { axis, ndim: self.ndim() });
        let dim = self.shape[axis];
        ensure!(
            step > 0 && range.start < range.end && range.end <= dim,
            InvalidSliceSnafu { axis, start: range.start, end: range.end, step, dim }
        );

        let mut view = self.clone();
        view.offset = (self.offset as isize + range.start as isize * self.strides[axis]) as usize;
        view.shape[axis] = (range.end - range.start).div_ceil(step);
        view.strides[axis] *= step as isize;
        Ok(view)
    }

    /// Reverses the axis order without moving data.
    pub fn transpose(&self) -> Self {
        let mut view = self.clone();
        view.shape.reverse();
        view.strides.reverse();
        view
    }

    /// Interchange descriptor for other numeric libraries. Requires an
    /// attached native buffer.
    pub fn interchange(&self) -> Result<ArrayInterface> {
        ensure!(self.has_buffer(), MissingBufferSnafu);
        Ok(self.array_interface())
    }

    /// Interchange descriptor of the view's memory, attached or not.
    pub fn array_interface(&self) -> ArrayInterface {
        let interface =
            ArrayInterface::new(self.shape.to_vec(), self.dtype.typestr(), self.as_ptr() as usize, self.is_readonly());
        if self.is_c_contiguous() { interface } else { interface.with_strides(self.byte_strides().to_vec()) }
    }
}

impl NumericArray for DualView {
    fn dtype(&self) -> DType {
        self.dtype
    }

    fn shape(&self) -> Dims {
        self.shape.clone()
    }

    fn is_c_contiguous(&self) -> bool {
        DualView::is_c_contiguous(self)
    }

    fn is_f_contiguous(&self) -> bool {
        DualView::is_f_contiguous(self)
    }

    fn scalars(&self) -> Box<dyn Iterator<Item = Scalar> + '_> {
        with_element!(self.dtype, T => self.boxed_scalars::<T>()).unwrap_or_else(|| Box::new(std::iter::empty()))
    }

    fn copy_into(&self, dst: &mut DualView) -> Result<()> {
        let len = DualView::len(self);
        if dst.dtype == self.dtype {
            return with_element!(self.dtype, T => dst.assign_iter(len, self.values::<T>()))
                .unwrap_or_else(|| unsupported(self.dtype));
        }
        dst.assign_scalars(len, NumericArray::scalars(self))
    }
}

impl fmt::Debug for DualView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DualView")
            .field("dtype", &self.dtype)
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .field("handle", &self.handle().map(|handle| handle.class_name()))
            .finish()
    }
}

fn unsupported<T>(dtype: DType) -> Result<T> {
    UnsupportedTypeSnafu { dtype }.fail().context(DeviceSnafu)
}
