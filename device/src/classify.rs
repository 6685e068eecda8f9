//! Recognition of native buffer handles.
//!
//! A handle is recognised when its runtime class is one of the twelve
//! registered [`Vector`] classes, **or** when its class *name* matches one of
//! theirs. The name fallback exists because an independently compiled copy of
//! this crate (pulled in by a second accelerated library, possibly at another
//! version) defines logically identical handle types whose `TypeId` differs.
//!
//! The fallback is a deliberate weakening of type safety: any type may claim a
//! registered class name. Callers must not use [`is_raw_buffer`] to reject
//! hostile or merely similarly-named unrelated types.

use std::any::{Any, TypeId};
use std::rc::Rc;

use cuvec_dtype::DType;
use once_cell::sync::Lazy;
use tracing::debug;

use crate::vector::{Element, RawHandle, Vector};

/// A registered native buffer class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleClass {
    pub id: TypeId,
    pub name: &'static str,
    pub dtype: DType,
}

impl HandleClass {
    fn of<T: Element>() -> Self {
        Self { id: TypeId::of::<Vector<T>>(), name: T::CLASS_NAME, dtype: T::DTYPE }
    }
}

static CLASSES: Lazy<Vec<HandleClass>> = Lazy::new(|| {
    macro_rules! classes {
        ($($ty:ty),*) => { vec![$(HandleClass::of::<$ty>()),*] };
    }
    let classes: Vec<HandleClass> = crate::for_each_element!(classes);
    debug!(count = classes.len(), "handle classes registered");
    classes
});

pub fn classes() -> &'static [HandleClass] {
    &CLASSES
}

/// The registered class for `dtype`, if it is a native kind.
pub fn class_of(dtype: DType) -> Option<&'static HandleClass> {
    classes().iter().find(|class| class.dtype == dtype)
}

/// Check whether `handle` is a native buffer, by class identity or by class name.
pub fn is_raw_buffer(handle: &dyn RawHandle) -> bool {
    let id = handle.as_any().type_id();
    let name = handle.class_name();
    classes().iter().any(|class| class.id == id || class.name == name)
}

/// Check whether an arbitrary value is a native buffer handle.
pub fn is_raw_value(value: &dyn Any) -> bool {
    raw_handle_of(value).is_some()
}

/// Extract a shared native handle from an arbitrary value.
///
/// Accepts any typed [`Vector`] or `Rc<Vector<T>>`, or an erased
/// `Rc<dyn RawHandle>` that passes [`is_raw_buffer`].
pub fn raw_handle_of(value: &dyn Any) -> Option<Rc<dyn RawHandle>> {
    if let Some(handle) = value.downcast_ref::<Rc<dyn RawHandle>>() {
        return is_raw_buffer(&**handle).then(|| Rc::clone(handle));
    }

    macro_rules! typed {
        ($($ty:ty),*) => {
            $(if let Some(vector) = value.downcast_ref::<Vector<$ty>>() {
                return Some(Rc::new(vector.clone()));
            }
            if let Some(shared) = value.downcast_ref::<Rc<Vector<$ty>>>() {
                return Some(Rc::clone(shared) as Rc<dyn RawHandle>);
            })*
        };
    }
    crate::for_each_element!(typed);

    None
}
