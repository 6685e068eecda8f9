//! Host numeric-array views over unified-memory buffers.
//!
//! A [`DualView`] wraps a typed native buffer from [`cuvec_device`] so host
//! code can read and write it in place while the same memory stays usable by
//! device code through the buffer handle. Views are built by:
//!
//! - [`zeros`]: allocate a zero-filled native buffer and view it.
//! - [`copy`]: copy a host numeric array into a fresh native buffer.
//! - [`asarray`]: view the input if it already is a native buffer (or a view
//!   of one) with the requested dtype and order, copy otherwise.
//!
//! ```
//! use cuvec::DType;
//!
//! # fn main() -> cuvec::Result<()> {
//! let mut view = cuvec::zeros(&[2, 3], DType::Float32)?;
//! view.set(&[1, 2], 4.5f32)?;
//!
//! let alias = cuvec::asarray(&view, None, None)?;
//! assert!(alias.shares_buffer(&view));
//! assert_eq!(alias.interchange()?.typestr, "<f4");
//! assert_eq!(view.get::<f32>(&[1, 2])?, 4.5);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod factory;
pub mod host;
pub mod interface;
pub mod layout;
pub mod view;

pub use error::{Error, Result};
pub use factory::{Factory, asarray, asarray_from, copy, copy_raw, zeros};
pub use host::NumericArray;
pub use interface::ArrayInterface;
pub use layout::Order;
pub use view::{Construction, DualView};

pub use cuvec_device::{Allocator, Element, RawHandle, Vector, default_allocator, install_default_allocator};
pub use cuvec_dtype::{Char, DType, Scalar};

#[cfg(test)]
mod test;
