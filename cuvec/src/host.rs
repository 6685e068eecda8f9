//! Host numeric arrays as copy sources.

use std::any::Any;

use cuvec_device::{Element, f16};
use cuvec_dtype::{Char, DType, Scalar};
use ndarray::{ArcArray, Array, ArrayBase, ArrayView, Data, Dimension, Ix0, Ix1, Ix2, Ix3, Ix4, Ix5, Ix6, IxDyn};
use smallvec::SmallVec;

use crate::error::Result;
use crate::layout::Dims;
use crate::view::DualView;

/// A host-side array whose elements can be read in logical row-major order.
pub trait NumericArray {
    fn dtype(&self) -> DType;

    fn shape(&self) -> Dims;

    fn len(&self) -> usize {
        self.shape().iter().product()
    }

    fn is_c_contiguous(&self) -> bool {
        true
    }

    fn is_f_contiguous(&self) -> bool {
        self.shape().iter().filter(|&&dim| dim != 1).count() <= 1
    }

    /// Element values in logical row-major order.
    fn scalars(&self) -> Box<dyn Iterator<Item = Scalar> + '_>;

    /// Writes every element into `dst` in logical order, converting to its dtype.
    fn copy_into(&self, dst: &mut DualView) -> Result<()> {
        dst.assign_scalars(self.len(), self.scalars())
    }
}

impl<S, D, T> NumericArray for ArrayBase<S, D>
where
    S: Data<Elem = T>,
    D: Dimension,
    T: Element,
{
    fn dtype(&self) -> DType {
        T::DTYPE
    }

    fn shape(&self) -> Dims {
        SmallVec::from_slice(ArrayBase::shape(self))
    }

    fn is_c_contiguous(&self) -> bool {
        self.is_standard_layout()
    }

    fn is_f_contiguous(&self) -> bool {
        self.t().is_standard_layout()
    }

    fn scalars(&self) -> Box<dyn Iterator<Item = Scalar> + '_> {
        Box::new(self.iter().map(|value| value.to_scalar()))
    }

    fn copy_into(&self, dst: &mut DualView) -> Result<()> {
        if dst.dtype() == T::DTYPE {
            return dst.assign_iter(self.len(), self.iter().copied());
        }
        dst.assign_scalars(self.len(), self.scalars())
    }
}

fn copy_slice<T: Element>(values: &[T], dst: &mut DualView) -> Result<()> {
    if dst.dtype() == T::DTYPE {
        return dst.assign_iter(values.len(), values.iter().copied());
    }
    dst.assign_scalars(values.len(), values.iter().map(|value| value.to_scalar()))
}

impl<T: Element> NumericArray for Vec<T> {
    fn dtype(&self) -> DType {
        T::DTYPE
    }

    fn shape(&self) -> Dims {
        smallvec::smallvec![self.as_slice().len()]
    }

    fn scalars(&self) -> Box<dyn Iterator<Item = Scalar> + '_> {
        Box::new(self.iter().map(|value| value.to_scalar()))
    }

    fn copy_into(&self, dst: &mut DualView) -> Result<()> {
        copy_slice(self, dst)
    }
}

impl<T: Element> NumericArray for &[T] {
    fn dtype(&self) -> DType {
        T::DTYPE
    }

    fn shape(&self) -> Dims {
        smallvec::smallvec![<[T]>::len(self)]
    }

    fn scalars(&self) -> Box<dyn Iterator<Item = Scalar> + '_> {
        Box::new(self.iter().map(|value| value.to_scalar()))
    }

    fn copy_into(&self, dst: &mut DualView) -> Result<()> {
        copy_slice(self, dst)
    }
}

macro_rules! downcast_arrays {
    (@dims $value:expr, $ty:ty; $($dim:ty),*) => {
        $(
            if let Some(array) = $value.downcast_ref::<Array<$ty, $dim>>() {
                return Some(array);
            }
            if let Some(array) = $value.downcast_ref::<ArcArray<$ty, $dim>>() {
                return Some(array);
            }
            if let Some(array) = $value.downcast_ref::<ArrayView<'static, $ty, $dim>>() {
                return Some(array);
            }
        )*
    };
    ($value:expr; $($ty:ty),*) => {
        $(downcast_arrays!(@dims $value, $ty; IxDyn, Ix0, Ix1, Ix2, Ix3, Ix4, Ix5, Ix6);)*
    };
}

/// Recognises `ndarray` arrays of every native element kind: owned, shared
/// and `'static` views, dynamic rank or rank 0 to 6.
///
/// Borrowed arrays cannot travel as `&dyn Any`; pass them as
/// `&dyn NumericArray` to [`copy`](crate::copy) or
/// [`asarray_from`](crate::asarray_from) instead.
pub fn numeric_array_of(value: &dyn Any) -> Option<&dyn NumericArray> {
    downcast_arrays!(value; i8, u8, Char, i16, u16, i32, u32, i64, u64, f16, f32, f64);
    None
}

/// Plain element vectors and static slices. Only adopting operations accept these.
pub fn sequence_of(value: &dyn Any) -> Option<&dyn NumericArray> {
    macro_rules! downcast_vec {
        ($($ty:ty),*) => {
            $(
                if let Some(values) = value.downcast_ref::<Vec<$ty>>() {
                    return Some(values);
                }
                if let Some(values) = value.downcast_ref::<&'static [$ty]>() {
                    return Some(values);
                }
            )*
        };
    }
    downcast_vec!(i8, u8, Char, i16, u16, i32, u32, i64, u64, f16, f32, f64);
    None
}
