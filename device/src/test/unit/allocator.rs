use std::sync::Arc;

use crate::{Allocator, BufferOptions, HostAllocator, default_allocator, install_default_allocator};

#[test]
fn test_default_allocator_is_fixed_after_first_use() {
    let first = default_allocator();
    let rejected = install_default_allocator(Arc::new(HostAllocator)).unwrap_err();

    assert_eq!(rejected.name(), "host");
    assert!(Arc::ptr_eq(&first, &default_allocator()));
}

#[test]
fn test_unzeroed_host_allocation_is_usable() {
    let raw = HostAllocator.alloc(24, &BufferOptions::default()).unwrap();
    assert_eq!(raw.size(), 24);
    assert_eq!(raw.as_ptr().as_ptr() as usize % crate::ALIGNMENT, 0);
    assert!(!BufferOptions::default().zero_init);
    assert!(BufferOptions::zeroed().zero_init);
}
