use cuvec_dtype::DType;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Input is neither a native buffer, an attached view, nor a numeric array.
    #[snafu(display(
        "DualView is not intended for explicit construction from arbitrary data; \
         wrap a native buffer, an existing view, or a numeric array, \
         or allocate with `cuvec::zeros(&[42, 137], DType::Float32)`"
    ))]
    InvalidConstruction,

    /// Interchange descriptor requested on a view with no native buffer.
    #[snafu(display("view has no attached native buffer: try `cuvec::asarray` first"))]
    MissingBuffer,

    /// Foreign handle whose base address is not aligned for its element kind.
    #[snafu(display("buffer at {address:#x} is not aligned for dtype '{dtype}'"))]
    Misaligned { address: usize, dtype: DType },

    /// Error raised by the buffer layer (allocation, unsupported dtype, ...).
    #[snafu(display("native buffer error: {source}"))]
    Device { source: cuvec_device::Error },

    #[snafu(display("dtype mismatch: view holds '{actual}', requested '{expected}'"))]
    DTypeMismatch { expected: DType, actual: DType },

    #[snafu(display("invalid dtype: {source}"))]
    DType { source: cuvec_dtype::Error },

    #[snafu(display("index {index:?} is out of bounds for shape {shape:?}"))]
    IndexOutOfBounds { index: Vec<usize>, shape: Vec<usize> },

    #[snafu(display("Axis {axis} is out of range for view with {ndim} dimensions"))]
    AxisOutOfRange { axis: usize, ndim: usize },

    #[snafu(display("invalid slice {start}..{end} step {step} of axis {axis} with extent {dim}"))]
    InvalidSlice { axis: usize, start: usize, end: usize, step: usize, dim: usize },

    #[snafu(display("cannot reshape {from:?} into {to:?}: element counts differ"))]
    ReshapeSizeMismatch { from: Vec<usize>, to: Vec<usize> },

    #[snafu(display("'{operation}' needs a C-contiguous view"))]
    NotContiguous { operation: &'static str },

    /// Source and destination element counts differ.
    #[snafu(display("shape mismatch: expected {expected:?}, got {actual:?}"))]
    ShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },

    /// Write through a view of a read-only foreign buffer.
    #[snafu(display("view is read-only"))]
    ReadOnly,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
