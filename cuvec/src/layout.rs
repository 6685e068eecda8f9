//! Strided layout arithmetic shared by views and copies.
//!
//! Strides are counted in elements and are never negative.

use smallvec::SmallVec;

pub type Dims = SmallVec<[usize; 4]>;
pub type Strides = SmallVec<[isize; 4]>;

/// Memory order requested from an adopting operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(strum::Display, strum::EnumString)]
pub enum Order {
    /// Row-major.
    #[default]
    C,
    /// Column-major.
    F,
    /// `F` when the source is column-major only, `C` otherwise.
    A,
    /// Keep whatever layout the source has.
    K,
}

impl Order {
    /// Whether a source with the given contiguity already satisfies the request.
    pub fn is_satisfied_by(self, c_contiguous: bool, f_contiguous: bool) -> bool {
        match self {
            Order::C => c_contiguous,
            Order::F => f_contiguous,
            Order::A => c_contiguous || f_contiguous,
            Order::K => true,
        }
    }

    /// Concrete layout for a fresh copy of a source with the given contiguity.
    pub fn resolve(order: Option<Self>, c_contiguous: bool, f_contiguous: bool) -> Self {
        match order {
            Some(Order::F) => Order::F,
            Some(Order::A | Order::K) if f_contiguous && !c_contiguous => Order::F,
            _ => Order::C,
        }
    }
}

pub fn c_strides(shape: &[usize]) -> Strides {
    let mut strides: Strides = SmallVec::from_elem(1, shape.len());
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1] as isize;
    }
    strides
}

pub fn f_strides(shape: &[usize]) -> Strides {
    let mut strides: Strides = SmallVec::from_elem(1, shape.len());
    for axis in 1..shape.len() {
        strides[axis] = strides[axis - 1] * shape[axis - 1] as isize;
    }
    strides
}

/// Extents of size one never affect contiguity.
fn is_contiguous(mut axes: impl Iterator<Item = (usize, isize)>) -> bool {
    let mut expected = 1isize;
    axes.all(|(dim, stride)| {
        let ok = dim == 1 || stride == expected;
        expected *= dim as isize;
        ok
    })
}

pub fn is_c_contiguous(shape: &[usize], strides: &[isize]) -> bool {
    is_contiguous(shape.iter().copied().zip(strides.iter().copied()).rev())
}

pub fn is_f_contiguous(shape: &[usize], strides: &[isize]) -> bool {
    is_contiguous(shape.iter().copied().zip(strides.iter().copied()))
}

/// Element offsets of every position of a strided view, in row-major
/// (logical) order regardless of memory order.
#[derive(Debug, Clone)]
pub struct Offsets {
    shape: Dims,
    strides: Strides,
    index: Dims,
    offset: isize,
    remaining: usize,
}

impl Offsets {
    pub fn new(shape: &[usize], strides: &[isize], start: usize) -> Self {
        Self {
            shape: SmallVec::from_slice(shape),
            strides: SmallVec::from_slice(strides),
            index: SmallVec::from_elem(0, shape.len()),
            offset: start as isize,
            remaining: shape.iter().product(),
        }
    }
}

impl Iterator for Offsets {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.offset as usize;
        self.remaining -= 1;

        for axis in (0..self.shape.len()).rev() {
            self.index[axis] += 1;
            self.offset += self.strides[axis];
            if self.index[axis] < self.shape[axis] {
                break;
            }
            self.offset -= self.strides[axis] * self.shape[axis] as isize;
            self.index[axis] = 0;
        }

        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Offsets {}
