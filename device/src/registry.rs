//! Element type → buffer constructor dispatch.
//!
//! The table is built once, on first use, and is read-only afterwards. It
//! holds exactly the twelve native kinds; every other [`DType`] is rejected
//! with [`Error::UnsupportedType`](crate::Error::UnsupportedType).

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use cuvec_dtype::DType;
use once_cell::sync::Lazy;
use snafu::OptionExt;
use tracing::debug;

use crate::allocator::{Allocator, default_allocator};
use crate::error::{Result, UnsupportedTypeSnafu};
use crate::vector::{Element, RawHandle, Vector};

/// Allocates a zero-filled native buffer of one fixed element kind.
pub type Constructor = fn(Arc<dyn Allocator>, &[usize]) -> Result<Rc<dyn RawHandle>>;

pub struct TypeMapping {
    constructors: HashMap<DType, Constructor>,
}

fn construct<T: Element>(allocator: Arc<dyn Allocator>, shape: &[usize]) -> Result<Rc<dyn RawHandle>> {
    Ok(Rc::new(Vector::<T>::zeros_in(allocator, shape)?))
}

impl TypeMapping {
    fn new() -> Self {
        let mut constructors: HashMap<DType, Constructor> = HashMap::new();
        macro_rules! register {
            ($($ty:ty),*) => {
                $(constructors.insert(<$ty as cuvec_dtype::HasDType>::DTYPE, construct::<$ty>);)*
            };
        }
        crate::for_each_element!(register);

        debug!(kinds = constructors.len(), "type mapping built");
        Self { constructors }
    }

    /// Look up the constructor registered for `dtype`.
    pub fn get(&self, dtype: DType) -> Result<Constructor> {
        self.constructors.get(&dtype).copied().context(UnsupportedTypeSnafu { dtype })
    }

    pub fn contains(&self, dtype: DType) -> bool {
        self.constructors.contains_key(&dtype)
    }

    /// Registered kinds in canonical order.
    pub fn supported(&self) -> Vec<DType> {
        let mut kinds: Vec<_> = self.constructors.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn allocate_in(&self, allocator: Arc<dyn Allocator>, shape: &[usize], dtype: DType) -> Result<Rc<dyn RawHandle>> {
        let constructor = self.get(dtype)?;
        constructor(allocator, shape)
    }
}

static TYPE_MAPPING: Lazy<TypeMapping> = Lazy::new(TypeMapping::new);

/// Get the global type mapping.
pub fn type_mapping() -> &'static TypeMapping {
    &TYPE_MAPPING
}

/// Allocate a zero-filled native buffer with the default allocator.
pub fn allocate(shape: &[usize], dtype: DType) -> Result<Rc<dyn RawHandle>> {
    allocate_in(default_allocator(), shape, dtype)
}

pub fn allocate_in(allocator: Arc<dyn Allocator>, shape: &[usize], dtype: DType) -> Result<Rc<dyn RawHandle>> {
    type_mapping().allocate_in(allocator, shape, dtype)
}

/// Kinds with a registered buffer class.
pub fn supported() -> Vec<DType> {
    type_mapping().supported()
}
