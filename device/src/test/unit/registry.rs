use std::sync::Arc;

use strum::VariantArray;
use test_case::test_case;

use crate::registry::{self, type_mapping};
use crate::test::CountingAllocator;
use crate::{DType, Error, classify};

#[test]
fn test_registry_holds_the_native_kinds() {
    let supported = registry::supported();
    assert_eq!(supported.len(), 12);
    assert!(supported.iter().all(|dtype| dtype.is_native()));
    assert!(supported.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_every_native_kind_allocates_its_class() {
    for &dtype in DType::VARIANTS.iter().filter(|d| d.is_native()) {
        let handle = registry::allocate(&[3, 2], dtype).unwrap();
        assert_eq!(handle.dtype(), dtype);
        assert_eq!(handle.shape(), &[3, 2]);
        assert_eq!(handle.nbytes(), 6 * dtype.bytes());
        assert_eq!(handle.class_name(), classify::class_of(dtype).unwrap().name);
    }
}

#[test_case(DType::Bool; "bool")]
#[test_case(DType::CLong; "platform_long")]
#[test_case(DType::CULong; "platform_ulong")]
fn test_unregistered_kind_is_unsupported(dtype: DType) {
    assert!(!type_mapping().contains(dtype));
    let err = registry::allocate(&[2], dtype).unwrap_err();
    assert!(matches!(err, Error::UnsupportedType { dtype: d } if d == dtype));
}

#[test]
fn test_allocate_in_uses_the_given_allocator() {
    let allocator = Arc::new(CountingAllocator::default());
    let handle = registry::allocate_in(allocator.clone(), &[5], DType::UInt32).unwrap();
    assert_eq!(allocator.allocs(), 1);
    drop(handle);
    assert_eq!(allocator.frees(), 1);
}

#[test]
fn test_unsupported_kind_does_not_allocate() {
    let allocator = Arc::new(CountingAllocator::default());
    assert!(registry::allocate_in(allocator.clone(), &[5], DType::Bool).is_err());
    assert_eq!(allocator.allocs(), 0);
}
