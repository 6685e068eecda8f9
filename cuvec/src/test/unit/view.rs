use std::rc::Rc;
use std::sync::Arc;

use ndarray::{Array2, ArrayD, IxDyn, array};

use crate::test::{CountingAllocator, ForeignVector};
use crate::{Construction, DType, DualView, Error, Factory, RawHandle, Scalar, Vector};

fn iota(shape: &[usize]) -> DualView {
    let len = shape.iter().product::<usize>();
    let values = ArrayD::from_shape_vec(IxDyn(shape), (0..len).map(|i| i as f32).collect()).unwrap();
    DualView::new(&values).unwrap()
}

#[test]
fn test_wrapping_a_buffer_does_not_copy() {
    let mut vector = Vector::<f32>::zeros(&[2, 3]).unwrap();
    let mut view = DualView::new(&vector).unwrap();

    assert!(view.has_buffer());
    assert_eq!(view.as_ptr(), vector.as_ptr() as *const u8);

    view.set(&[1, 2], 7.5f32).unwrap();
    assert_eq!(vector.get(5).unwrap(), 7.5);

    vector.set(0, -1.0).unwrap();
    assert_eq!(view.get::<f32>(&[0, 0]).unwrap(), -1.0);
}

#[test]
fn test_view_keeps_buffer_alive() {
    let allocator = Arc::new(CountingAllocator::default());
    let vector = Vector::<i32>::zeros_in(allocator.clone(), &[8]).unwrap();
    let mut view = DualView::new(&vector).unwrap();
    drop(vector);

    assert_eq!(allocator.live(), 1);
    view.fill(3i32).unwrap();
    assert_eq!(view.to_vec::<i32>().unwrap(), vec![3; 8]);

    let alias = view.clone();
    drop(view);
    assert_eq!(allocator.live(), 1);
    drop(alias);
    assert_eq!(allocator.live(), 0);
}

#[test]
fn test_wrapping_a_view_aliases() {
    let view = iota(&[4]);
    let alias = DualView::new(&view).unwrap();

    assert!(alias.shares_buffer(&view));
    assert!(Rc::ptr_eq(alias.handle().unwrap(), view.handle().unwrap()));
}

#[test]
fn test_numeric_array_is_copied() {
    let mut array: Array2<f64> = array![[1.0, 2.0], [3.0, 4.0]];
    let mut view = DualView::new(&array).unwrap();

    view.set(&[1, 1], -4.0f64).unwrap();
    assert_eq!(array[[1, 1]], 4.0);

    array[[0, 0]] = 100.0;
    assert_eq!(view.shape(), &[2, 2]);
    assert_eq!(view.dtype(), DType::Float64);
    assert_eq!(view.to_vec::<f64>().unwrap(), vec![1.0, 2.0, 3.0, -4.0]);
    assert!(view.has_buffer());
}

#[test]
fn test_detached_view_is_copied_into_a_buffer() {
    let detached = DualView::from_host(&array![1u8, 2, 3]).unwrap();
    assert!(!detached.has_buffer());
    assert!(matches!(Construction::classify(&detached), Construction::CopyFromArray(_)));

    let view = DualView::new(&detached).unwrap();
    assert!(view.has_buffer());
    assert!(!view.shares_buffer(&detached));
    assert_eq!(view.to_vec::<u8>().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_arbitrary_values_are_rejected() {
    assert!(matches!(DualView::new(&42i32), Err(Error::InvalidConstruction)));
    assert!(matches!(DualView::new(&"data"), Err(Error::InvalidConstruction)));
    assert!(matches!(DualView::new(&vec![1.0f32, 2.0]), Err(Error::InvalidConstruction)));

    let message = DualView::new(&()).unwrap_err().to_string();
    assert!(message.contains("zeros"), "{message}");
}

#[test]
fn test_classify_paths() {
    let vector = Vector::<u16>::zeros(&[3]).unwrap();
    assert!(matches!(Construction::classify(&vector), Construction::WrapRaw(_)));

    let view = DualView::new(&vector).unwrap();
    assert!(matches!(Construction::classify(&view), Construction::WrapView(_)));

    assert!(matches!(Construction::classify(&array![[1i8]]), Construction::CopyFromArray(_)));
    assert!(matches!(Construction::classify(&1.0f64), Construction::Invalid));
}

#[test]
fn test_foreign_handle_is_wrapped_by_name() {
    let foreign: Rc<dyn RawHandle> = Rc::new(ForeignVector::new(&[2, 2]));
    let mut view = DualView::new(&foreign).unwrap();

    view.set(&[1, 1], 2.0f32).unwrap();
    let inner = &foreign.as_any().downcast_ref::<ForeignVector>().unwrap().inner;
    assert_eq!(inner.get(3).unwrap(), 2.0);
    assert!(view.vector::<f32>().is_none());
}

#[test]
fn test_readonly_handle_rejects_writes() {
    let mut handle = ForeignVector::new(&[3]);
    handle.readonly = true;
    let foreign: Rc<dyn RawHandle> = Rc::new(handle);
    let mut view = DualView::new(&foreign).unwrap();

    assert!(view.is_readonly());
    assert!(matches!(view.set(&[0], 1.0f32), Err(Error::ReadOnly)));
    assert!(matches!(view.fill(1.0f32), Err(Error::ReadOnly)));
    assert_eq!(view.get::<f32>(&[0]).unwrap(), 0.0);
}

#[test]
fn test_foreign_handle_without_native_dtype_is_unsupported() {
    let mut handle = ForeignVector::new(&[3]);
    handle.dtype = DType::CLong;
    let foreign: Rc<dyn RawHandle> = Rc::new(handle);

    let err = DualView::new(&foreign).unwrap_err();
    assert!(matches!(
        err,
        Error::Device { source: cuvec_device::Error::UnsupportedType { dtype: DType::CLong } }
    ));
}

#[test]
fn test_misaligned_foreign_handle_is_rejected() {
    let mut handle = ForeignVector::new(&[4]);
    handle.byte_offset = 1;
    let address = handle.as_ptr().as_ptr() as usize;
    let foreign: Rc<dyn RawHandle> = Rc::new(handle);

    let err = DualView::new(&foreign).unwrap_err();
    assert!(matches!(err, Error::Misaligned { address: a, dtype: DType::Float32 } if a == address));
    assert!(crate::asarray(&foreign, None, None).is_err());
}

#[test]
fn test_typed_handle_round_trip() {
    let view = crate::zeros(&[5], DType::Int64).unwrap();
    let vector = view.vector::<i64>().unwrap();
    assert_eq!(vector.as_ptr() as *const u8, view.as_ptr());
    assert!(view.vector::<i32>().is_none());
}

#[test]
fn test_element_access_errors() {
    let mut view = iota(&[2, 3]);

    assert!(matches!(view.get::<f64>(&[0, 0]), Err(Error::DTypeMismatch { .. })));
    assert!(matches!(view.get::<f32>(&[2, 0]), Err(Error::IndexOutOfBounds { .. })));
    assert!(matches!(view.get::<f32>(&[0]), Err(Error::IndexOutOfBounds { .. })));
    assert!(matches!(view.set(&[0, 3], 1.0f32), Err(Error::IndexOutOfBounds { .. })));
    assert_eq!(view.get_scalar(&[1, 1]).unwrap(), Scalar::Float(4.0));
}

#[test]
fn test_slice_axis_shares_memory() {
    let view = iota(&[4, 3]);
    let mut rows = view.slice_axis(0, 1..4, 2).unwrap();

    assert_eq!(rows.shape(), &[2, 3]);
    assert_eq!(rows.to_vec::<f32>().unwrap(), vec![3.0, 4.0, 5.0, 9.0, 10.0, 11.0]);
    assert!(rows.shares_buffer(&view));
    assert!(!rows.is_c_contiguous());

    rows.set(&[1, 0], -9.0f32).unwrap();
    assert_eq!(view.get::<f32>(&[3, 0]).unwrap(), -9.0);

    let column = view.slice_axis(1, 2..3, 1).unwrap();
    assert_eq!(column.to_vec::<f32>().unwrap(), vec![2.0, 5.0, 8.0, 11.0]);
}

#[test]
fn test_slice_axis_errors() {
    let view = iota(&[4, 3]);
    assert!(matches!(view.slice_axis(2, 0..1, 1), Err(Error::AxisOutOfRange { axis: 2, ndim: 2 })));
    assert!(matches!(view.slice_axis(0, 0..5, 1), Err(Error::InvalidSlice { .. })));
    assert!(matches!(view.slice_axis(0, 2..2, 1), Err(Error::InvalidSlice { .. })));
    assert!(matches!(view.slice_axis(0, 0..2, 0), Err(Error::InvalidSlice { .. })));
}

#[test]
fn test_transpose_is_column_major() {
    let view = iota(&[2, 3]);
    let transposed = view.transpose();

    assert_eq!(transposed.shape(), &[3, 2]);
    assert!(transposed.is_f_contiguous());
    assert!(!transposed.is_c_contiguous());
    assert_eq!(transposed.to_vec::<f32>().unwrap(), vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
}

#[test]
fn test_reshape() {
    let view = iota(&[2, 3]);
    let flat = view.reshape(&[6]).unwrap();
    assert!(flat.shares_buffer(&view));
    assert_eq!(flat.to_vec::<f32>().unwrap(), view.to_vec::<f32>().unwrap());

    assert!(matches!(view.reshape(&[4]), Err(Error::ReshapeSizeMismatch { .. })));
    assert!(matches!(view.reshape(&[usize::MAX, 2]), Err(Error::ReshapeSizeMismatch { .. })));
    assert!(matches!(view.transpose().reshape(&[6]), Err(Error::NotContiguous { .. })));
}

#[test]
fn test_assign_converts_in_logical_order() {
    let mut view = crate::zeros(&[2, 2], DType::Int16).unwrap();
    view.assign(&array![[1.9f64, -2.5], [300.0, 4.0]].reversed_axes()).unwrap();
    assert_eq!(view.to_vec::<i16>().unwrap(), vec![1, 300, -2, 4]);

    assert!(matches!(view.assign(&array![1.0f64, 2.0]), Err(Error::ShapeMismatch { .. })));
}

#[test]
fn test_assign_from_strided_view() {
    let source = iota(&[3, 2]).transpose();
    let mut target = crate::zeros(&[2, 3], DType::Float64).unwrap();
    target.assign(&source).unwrap();
    assert_eq!(target.to_vec::<f64>().unwrap(), vec![0.0, 2.0, 4.0, 1.0, 3.0, 5.0]);
}

#[test]
fn test_ndarray_views() {
    let mut view = iota(&[2, 3]).transpose();

    // SAFETY: no other view of the buffer is used while the array views live.
    let host = unsafe { view.as_array::<f32>() }.unwrap();
    assert_eq!(host.shape(), &[3, 2]);
    assert_eq!(host[[2, 1]], 5.0);

    // SAFETY: as above.
    let mut host = unsafe { view.as_array_mut::<f32>() }.unwrap();
    host[[0, 1]] = 42.0;
    assert_eq!(view.get::<f32>(&[0, 1]).unwrap(), 42.0);

    assert_eq!(view.to_ndarray::<f32>().unwrap().shape(), &[3, 2]);
}

#[test]
fn test_scalar_view() {
    let view = crate::zeros(&[], DType::UInt32).unwrap();
    assert_eq!(view.ndim(), 0);
    assert_eq!(view.len(), 1);
    assert_eq!(view.get::<u32>(&[]).unwrap(), 0);
}

#[test]
fn test_copy_uses_factory_allocator() {
    let allocator = Arc::new(CountingAllocator::default());
    let factory = Factory::new(allocator.clone());

    let view = factory.copy(&array![1i32, 2, 3]).unwrap();
    assert_eq!(allocator.allocs(), 1);
    drop(view);
    assert_eq!(allocator.live(), 0);
}
