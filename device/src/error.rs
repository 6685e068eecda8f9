use cuvec_dtype::DType;
use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Element kind has no registered buffer class.
    #[snafu(display("unsupported dtype '{dtype}': no native buffer class is registered for it"))]
    UnsupportedType { dtype: DType },

    /// Shape has a zero extent or its byte size overflows.
    #[snafu(display("invalid shape {shape:?} for dtype '{dtype}'"))]
    InvalidShape { shape: Vec<usize>, dtype: DType },

    /// The allocator could not provide memory.
    #[snafu(display("{allocator} allocator could not provide {size} bytes"))]
    OutOfMemory { allocator: String, size: usize },

    #[snafu(display("index {index:?} is out of bounds for shape {shape:?}"))]
    IndexOutOfBounds { index: Vec<usize>, shape: Vec<usize> },

    #[snafu(display("dtype mismatch: buffer holds '{actual}', requested '{expected}'"))]
    DTypeMismatch { expected: DType, actual: DType },

    #[cfg(feature = "cuda")]
    /// CUDA-specific errors.
    #[snafu(display("CUDA error: {source}"))]
    Cuda { source: cudarc::driver::DriverError },
}
