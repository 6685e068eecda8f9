//! Typed native buffers in unified memory.
//!
//! - [`allocator`]: the memory collaborator (host memory, or CUDA managed
//!   memory with the `cuda` feature) and the process-wide default.
//! - [`Vector`]: the twelve typed buffer classes, one per native element kind.
//! - [`registry`]: element type → buffer constructor dispatch.
//! - [`classify`]: recognition of buffer handles, including equivalent
//!   handles from independently compiled copies of this crate.

pub mod allocator;
pub mod buffer;
pub mod classify;
pub mod error;
pub mod registry;
pub mod vector;

pub use allocator::{
    ALIGNMENT, Allocator, BufferOptions, HostAllocator, RawBuffer, default_allocator, install_default_allocator,
};
#[cfg(feature = "cuda")]
pub use allocator::UnifiedAllocator;
pub use buffer::{Allocation, byte_size, flat_index};
pub use classify::{HandleClass, is_raw_buffer, is_raw_value, raw_handle_of};
pub use error::{Error, Result};
pub use registry::{allocate, allocate_in};
pub use vector::{Element, RawHandle, Vector};

pub use cuvec_dtype::{Char, DType};
pub use half::f16;
