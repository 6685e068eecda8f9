use std::any::Any;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use cuvec_device::{BufferOptions, HostAllocator, RawBuffer};

use crate::{Allocator, DType, RawHandle, Vector};

mod unit;

/// Host allocator that records how often it allocates and frees.
#[derive(Debug, Default)]
pub struct CountingAllocator {
    inner: HostAllocator,
    allocs: AtomicUsize,
    frees: AtomicUsize,
}

impl CountingAllocator {
    pub fn allocs(&self) -> usize {
        self.allocs.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.allocs() - self.frees.load(Ordering::SeqCst)
    }
}

impl Allocator for CountingAllocator {
    fn alloc(&self, size: usize, options: &BufferOptions) -> cuvec_device::Result<RawBuffer> {
        let raw = self.inner.alloc(size, options)?;
        self.allocs.fetch_add(1, Ordering::SeqCst);
        Ok(raw)
    }

    fn free(&self, buffer: RawBuffer) {
        self.frees.fetch_add(1, Ordering::SeqCst);
        self.inner.free(buffer);
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Buffer handle of a class compiled elsewhere: equivalent by class name only.
#[derive(Debug)]
pub struct ForeignVector {
    pub inner: Vector<f32>,
    pub class_name: &'static str,
    pub readonly: bool,
    pub dtype: DType,
    pub byte_offset: usize,
}

impl ForeignVector {
    pub fn new(shape: &[usize]) -> Self {
        Self {
            inner: Vector::zeros(shape).unwrap(),
            class_name: <f32 as cuvec_device::Element>::CLASS_NAME,
            readonly: false,
            dtype: DType::Float32,
            byte_offset: 0,
        }
    }
}

// SAFETY: tests only report a dtype or offset that differs from `inner` to
// check that the view rejects the handle before touching memory.
unsafe impl RawHandle for ForeignVector {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn class_name(&self) -> &str {
        self.class_name
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn shape(&self) -> &[usize] {
        self.inner.shape()
    }

    fn as_ptr(&self) -> NonNull<u8> {
        let base = RawHandle::as_ptr(&self.inner);
        // `inner` is non-empty whenever an offset is set.
        unsafe { base.add(self.byte_offset) }
    }

    fn is_readonly(&self) -> bool {
        self.readonly
    }
}
