use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::rc::Rc;
use std::sync::Arc;

use cuvec_dtype::{CastScalar, Char, DType, HasDType};
use half::f16;
use smallvec::SmallVec;
use snafu::ensure;

use crate::allocator::{Allocator, BufferOptions, default_allocator};
use crate::buffer::{Allocation, byte_size, flat_index};
use crate::error::{IndexOutOfBoundsSnafu, Result};

/// A Rust scalar type with a registered native buffer class.
///
/// Implemented for exactly the twelve native kinds.
pub trait Element: HasDType + CastScalar + Default + PartialEq + fmt::Debug + 'static {
    /// Textual name of the buffer class, identical across independently
    /// compiled copies of this crate.
    const CLASS_NAME: &'static str;
}

macro_rules! impl_element {
    ($($ty:ty => $code:literal),* $(,)?) => {
        $(impl Element for $ty {
            const CLASS_NAME: &'static str = concat!(env!("CARGO_CRATE_NAME"), "::Vector_", $code);
        })*
    };
}

impl_element! {
    i8 => "b", u8 => "B", Char => "c",
    i16 => "h", u16 => "H", i32 => "i", u32 => "I", i64 => "q", u64 => "Q",
    f16 => "e", f32 => "f", f64 => "d",
}

/// Structural interface of a native buffer handle.
///
/// This is what a view needs to alias a buffer without copying: element type,
/// shape, a stable base address, and a runtime class identity. Handles defined
/// by an independently compiled copy of the native module implement it with
/// the same [`class_name`](RawHandle::class_name) but a different type
/// identity.
///
/// # Safety
///
/// Views read and write through [`as_ptr`](RawHandle::as_ptr) without further
/// checks, so implementors must guarantee that:
///
/// - `as_ptr()` is aligned for `dtype()`;
/// - it points to at least `shape().iter().product::<usize>() * dtype().bytes()`
///   live, initialized bytes;
/// - the pointer, shape and dtype stay unchanged and valid for as long as the
///   handle lives.
pub unsafe trait RawHandle: fmt::Debug + 'static {
    fn as_any(&self) -> &dyn Any;

    /// Fully qualified name of the handle's runtime class.
    fn class_name(&self) -> &str;

    fn dtype(&self) -> DType;

    fn shape(&self) -> &[usize];

    /// Base address of the first element, valid while the handle lives.
    fn as_ptr(&self) -> NonNull<u8>;

    fn is_readonly(&self) -> bool {
        false
    }

    fn len(&self) -> usize {
        self.shape().iter().product()
    }

    fn nbytes(&self) -> usize {
        self.len() * self.dtype().bytes()
    }
}

/// Typed native buffer: a fixed-shape allocation of `T` in unified memory.
///
/// Clones share the allocation. The type is `!Send + !Sync`; reference
/// counting is thread-confined.
pub struct Vector<T: Element> {
    data: Rc<Allocation>,
    shape: SmallVec<[usize; 4]>,
    _marker: PhantomData<T>,
}

impl<T: Element> Vector<T> {
    /// Allocate a zero-filled buffer with the default allocator.
    pub fn zeros(shape: &[usize]) -> Result<Self> {
        Self::zeros_in(default_allocator(), shape)
    }

    pub fn zeros_in(allocator: Arc<dyn Allocator>, shape: &[usize]) -> Result<Self> {
        let size = byte_size(T::DTYPE, shape)?;
        let data = Allocation::new(allocator, size, BufferOptions::zeroed())?;
        Ok(Self { data: Rc::new(data), shape: SmallVec::from_slice(shape), _marker: PhantomData })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_ptr(&self) -> *mut T {
        self.data.as_ptr().as_ptr().cast()
    }

    /// Number of handles sharing this allocation.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.data)
    }

    pub fn allocation(&self) -> &Allocation {
        &self.data
    }

    /// Read the element at row-major position `flat`.
    pub fn get(&self, flat: usize) -> Result<T> {
        self.check_flat(flat)?;
        // SAFETY: in bounds of a live, aligned, initialized allocation of `T`.
        Ok(unsafe { self.as_ptr().add(flat).read() })
    }

    pub fn set(&mut self, flat: usize, value: T) -> Result<()> {
        self.check_flat(flat)?;
        // SAFETY: see `get`; no reference into the allocation is outstanding.
        unsafe { self.as_ptr().add(flat).write(value) };
        Ok(())
    }

    pub fn get_at(&self, index: &[usize]) -> Result<T> {
        self.get(flat_index(&self.shape, index)?)
    }

    pub fn set_at(&mut self, index: &[usize], value: T) -> Result<()> {
        let flat = flat_index(&self.shape, index)?;
        self.set(flat, value)
    }

    pub fn to_vec(&self) -> Vec<T> {
        // SAFETY: the allocation holds `len` initialized elements.
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.len()) }.to_vec()
    }

    fn check_flat(&self, flat: usize) -> Result<()> {
        ensure!(flat < self.len(), IndexOutOfBoundsSnafu { index: vec![flat], shape: vec![self.len()] });
        Ok(())
    }
}

impl<T: Element> Clone for Vector<T> {
    fn clone(&self) -> Self {
        Self { data: Rc::clone(&self.data), shape: self.shape.clone(), _marker: PhantomData }
    }
}

impl<T: Element> fmt::Debug for Vector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(T::CLASS_NAME)
            .field("shape", &self.shape.as_slice())
            .field("ptr", &self.data.as_ptr())
            .finish()
    }
}

// SAFETY: the allocation is 64-byte aligned, holds `len()` elements of `T`,
// and is kept alive by the `Rc` in `data`; the shape is immutable.
unsafe impl<T: Element> RawHandle for Vector<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn class_name(&self) -> &str {
        T::CLASS_NAME
    }

    fn dtype(&self) -> DType {
        T::DTYPE
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn as_ptr(&self) -> NonNull<u8> {
        self.data.as_ptr()
    }
}

/// Evaluate `$body` with `$T` bound to the Rust type of a native `$dtype`.
///
/// Yields `Some(body)` for the twelve native kinds and `None` otherwise.
#[macro_export]
macro_rules! with_element {
    ($dtype:expr, $T:ident => $body:expr) => {
        match $dtype {
            $crate::DType::Int8 => Some({ type $T = i8; $body }),
            $crate::DType::UInt8 => Some({ type $T = u8; $body }),
            $crate::DType::Char => Some({ type $T = $crate::Char; $body }),
            $crate::DType::Int16 => Some({ type $T = i16; $body }),
            $crate::DType::UInt16 => Some({ type $T = u16; $body }),
            $crate::DType::Int32 => Some({ type $T = i32; $body }),
            $crate::DType::UInt32 => Some({ type $T = u32; $body }),
            $crate::DType::Int64 => Some({ type $T = i64; $body }),
            $crate::DType::UInt64 => Some({ type $T = u64; $body }),
            $crate::DType::Float16 => Some({ type $T = $crate::f16; $body }),
            $crate::DType::Float32 => Some({ type $T = f32; $body }),
            $crate::DType::Float64 => Some({ type $T = f64; $body }),
            $crate::DType::Bool | $crate::DType::CLong | $crate::DType::CULong => None,
        }
    };
}

/// Invoke `$mac!` once with the full list of native element types.
#[macro_export]
macro_rules! for_each_element {
    ($mac:ident) => {
        $mac!(i8, u8, $crate::Char, i16, u16, i32, u32, i64, u64, $crate::f16, f32, f64)
    };
}
