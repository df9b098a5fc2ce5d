//! CPU kernels for `recsys-rs`.
//!
//! Every kernel works on flat row-major slices plus a shape, so the tensor crate can stay a thin
//! wrapper. Axis kernels view a tensor as `[outer, axis, inner]` (see [`AxisLayout`]).

use num_traits::{FromPrimitive, Num, NumAssign, ToPrimitive};
use std::fmt::Debug;
use thiserror::Error;

pub mod cpu_concat;
pub mod cpu_index;
pub mod cpu_matmul;
pub mod cpu_reduce;
pub mod cpu_transpose;

pub use cpu_concat::{cpu_concat, cpu_split};
pub use cpu_index::{cpu_index_add, cpu_index_select};
pub use cpu_matmul::cpu_matmul;
pub use cpu_reduce::{cpu_expand_axis, cpu_max_axis, cpu_sum_axis};
pub use cpu_transpose::cpu_transpose;

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("Index {index} out of bounds for axis of length {bound}")]
    IndexOutOfBounds { index: usize, bound: usize },
    #[error("Axis {axis} is invalid for a tensor of rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },
}

pub type Result<T> = std::result::Result<T, KernelError>;

/// Trait bound for elements that can be processed by kernels.
/// This mirrors `TensorElem` in the main crate to avoid circular dependencies.
pub trait KernelElem:
    Num + NumAssign + Copy + Clone + Debug + Send + Sync + FromPrimitive + ToPrimitive + PartialOrd
{
}

impl<T> KernelElem for T where
    T: Num
        + NumAssign
        + Copy
        + Clone
        + Debug
        + Send
        + Sync
        + FromPrimitive
        + ToPrimitive
        + PartialOrd
{
}

/// A tensor shape collapsed around one axis: `[outer, len, inner]`.
///
/// `outer` is the product of the dimensions before `axis`, `inner` the product of those after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisLayout {
    pub outer: usize,
    pub len: usize,
    pub inner: usize,
}

impl AxisLayout {
    pub fn new(shape: &[usize], axis: usize) -> Result<Self> {
        if axis >= shape.len() {
            return Err(KernelError::InvalidAxis {
                axis,
                rank: shape.len(),
            });
        }
        Ok(Self {
            outer: shape[..axis].iter().product(),
            len: shape[axis],
            inner: shape[axis + 1..].iter().product(),
        })
    }

    pub fn size(&self) -> usize {
        self.outer * self.len * self.inner
    }

    pub(crate) fn check_len(&self, data_len: usize) -> Result<()> {
        if data_len != self.size() {
            return Err(KernelError::ShapeMismatch {
                expected: vec![self.size()],
                got: vec![data_len],
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_layout() {
        let layout = AxisLayout::new(&[2, 3, 4], 1).unwrap();
        assert_eq!(
            layout,
            AxisLayout {
                outer: 2,
                len: 3,
                inner: 4
            }
        );
        assert_eq!(layout.size(), 24);

        let first = AxisLayout::new(&[5, 6], 0).unwrap();
        assert_eq!((first.outer, first.len, first.inner), (1, 5, 6));

        let err = AxisLayout::new(&[2, 3], 2);
        assert!(matches!(err, Err(KernelError::InvalidAxis { axis: 2, rank: 2 })));
    }
}
