use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

#[cfg(feature = "cuda")]
use cudarc::driver::{CudaContext, UnifiedSlice};
use once_cell::sync::OnceCell;
use snafu::OptionExt;
use tracing::{debug, trace};

#[cfg(feature = "cuda")]
use crate::error::CudaSnafu;
use crate::error::{OutOfMemorySnafu, Result};
#[cfg(feature = "cuda")]
use snafu::ResultExt;

/// Base alignment of every allocation, enough for any element kind and for
/// vectorized access.
pub const ALIGNMENT: usize = 64;

/// Memory handed out by an [`Allocator`].
///
/// The buffer owns its memory and releases it when dropped, so
/// [`Allocator::free`] only needs to observe the release.
pub enum RawBuffer {
    Host {
        ptr: NonNull<u8>,
        layout: Layout,
    },
    #[cfg(feature = "cuda")]
    Unified {
        data: UnifiedSlice<u8>,
        ptr: NonNull<u8>,
        size: usize,
    },
}

impl RawBuffer {
    /// Get the size of the buffer in bytes.
    pub fn size(&self) -> usize {
        match self {
            RawBuffer::Host { layout, .. } => layout.size(),
            #[cfg(feature = "cuda")]
            RawBuffer::Unified { size, .. } => *size,
        }
    }

    /// Host-addressable base pointer.
    pub fn as_ptr(&self) -> NonNull<u8> {
        match self {
            RawBuffer::Host { ptr, .. } => *ptr,
            #[cfg(feature = "cuda")]
            RawBuffer::Unified { ptr, .. } => *ptr,
        }
    }
}

impl fmt::Debug for RawBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            RawBuffer::Host { .. } => "Host",
            #[cfg(feature = "cuda")]
            RawBuffer::Unified { .. } => "Unified",
        };
        f.debug_struct(kind).field("ptr", &self.as_ptr()).field("size", &self.size()).finish()
    }
}

impl Drop for RawBuffer {
    fn drop(&mut self) {
        match self {
            // SAFETY: `ptr` came from `alloc::alloc`/`alloc::alloc_zeroed` with exactly this layout.
            RawBuffer::Host { ptr, layout } => unsafe { alloc::dealloc(ptr.as_ptr(), *layout) },
            // `UnifiedSlice` frees itself.
            #[cfg(feature = "cuda")]
            RawBuffer::Unified { .. } => {}
        }
    }
}

/// Options for buffer allocation.
#[derive(Debug, Clone, Default)]
pub struct BufferOptions {
    /// Whether to zero-initialize the buffer.
    pub zero_init: bool,
}

impl BufferOptions {
    /// Zero-filled, as every typed buffer requires.
    pub const fn zeroed() -> Self {
        Self { zero_init: true }
    }
}

pub trait Allocator: Send + Sync + fmt::Debug {
    fn alloc(&self, size: usize, options: &BufferOptions) -> Result<RawBuffer>;
    fn free(&self, buffer: RawBuffer) {
        drop(buffer);
    }
    fn synchronize(&self) -> Result<()> {
        Ok(())
    }
    fn name(&self) -> &str;
}

/// Host memory from the global allocator, aligned to [`ALIGNMENT`].
#[derive(Debug, Clone, Default)]
pub struct HostAllocator;

impl Allocator for HostAllocator {
    fn alloc(&self, size: usize, options: &BufferOptions) -> Result<RawBuffer> {
        let layout = Layout::from_size_align(size.max(1), ALIGNMENT)
            .ok()
            .context(OutOfMemorySnafu { allocator: self.name(), size })?;

        // SAFETY: `layout` has a non-zero size.
        let ptr = unsafe { if options.zero_init { alloc::alloc_zeroed(layout) } else { alloc::alloc(layout) } };
        let ptr = NonNull::new(ptr).context(OutOfMemorySnafu { allocator: self.name(), size })?;

        trace!(size, allocator = self.name(), "allocated");
        Ok(RawBuffer::Host { ptr, layout })
    }

    fn name(&self) -> &str {
        "host"
    }
}

/// CUDA managed memory, addressable from both host and device.
#[cfg(feature = "cuda")]
#[derive(Debug, Clone)]
pub struct UnifiedAllocator {
    context: Arc<CudaContext>,
    device_id: usize,
}

#[cfg(feature = "cuda")]
impl UnifiedAllocator {
    pub fn new(device_id: usize) -> Result<Self> {
        let context = CudaContext::new(device_id).context(CudaSnafu)?;
        Ok(Self { context, device_id })
    }

    pub fn device_id(&self) -> usize {
        self.device_id
    }
}

#[cfg(feature = "cuda")]
impl Allocator for UnifiedAllocator {
    fn alloc(&self, size: usize, options: &BufferOptions) -> Result<RawBuffer> {
        // SAFETY: the contents are zero-filled below before any typed read when requested.
        let mut data = unsafe { self.context.alloc_unified::<u8>(size.max(1), true) }.context(CudaSnafu)?;
        let slice = data.as_mut_slice().context(CudaSnafu)?;
        if options.zero_init {
            slice.fill(0);
        }
        let ptr = NonNull::new(slice.as_mut_ptr()).context(OutOfMemorySnafu { allocator: "CUDA", size })?;

        trace!(size, allocator = "CUDA", device_id = self.device_id, "allocated");
        Ok(RawBuffer::Unified { data, ptr, size: size.max(1) })
    }

    fn synchronize(&self) -> Result<()> {
        self.context.synchronize().context(CudaSnafu)
    }

    fn name(&self) -> &str {
        "CUDA"
    }
}

static DEFAULT_ALLOCATOR: OnceCell<Arc<dyn Allocator>> = OnceCell::new();

/// The process-wide allocator used when none is given explicitly.
///
/// Selected on first use: unified memory on device 0 when the `cuda` feature
/// is enabled and a context can be created, host memory otherwise.
pub fn default_allocator() -> Arc<dyn Allocator> {
    Arc::clone(DEFAULT_ALLOCATOR.get_or_init(select_default))
}

/// Install the default allocator before anything has been allocated.
///
/// Returns the rejected allocator when a default is already in place.
pub fn install_default_allocator(allocator: Arc<dyn Allocator>) -> Result<(), Arc<dyn Allocator>> {
    debug!(allocator = allocator.name(), "installing default allocator");
    DEFAULT_ALLOCATOR.set(allocator)
}

fn select_default() -> Arc<dyn Allocator> {
    #[cfg(feature = "cuda")]
    match UnifiedAllocator::new(0) {
        Ok(allocator) => {
            debug!(allocator = "CUDA", device_id = 0, "default allocator selected");
            return Arc::new(allocator);
        }
        Err(error) => tracing::warn!(%error, "unified memory unavailable, falling back to host memory"),
    }

    debug!(allocator = "host", "default allocator selected");
    Arc::new(HostAllocator)
}
