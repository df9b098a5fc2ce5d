//! Dense CPU tensors.
//!
//! [`Tensor`] is a row-major N-dimensional array whose rank is a const generic. Heavy lifting
//! (matmul, axis reductions, gathers) is delegated to the `recsys-rs-kernels` crate.
//!
//! # Examples
//!
//! ```rust
//! use recsys_rs::tensor::Tensor;
//!
//! let t = Tensor::<f32, 2>::new(vec![1.0, 2.0, 3.0, 4.0], [2, 2]).unwrap();
//! let col_sums = t.sum_axis(0).unwrap();
//! assert_eq!(col_sums.shape(), &[1, 2]);
//! assert_eq!(col_sums.data(), &[4.0, 6.0]);
//! ```

use num_traits::{FromPrimitive, Num, NumAssign, ToPrimitive};
use recsys_rs_kernels::KernelError;
use std::fmt::Debug;
use thiserror::Error;

pub mod axis;
pub mod named;
pub mod ops;
pub mod storage;

pub use named::{Axis, NamedShape};
pub use storage::{Cpu, Device, Storage};

/// Error type for Tensor operations.
#[derive(Error, Debug)]
pub enum TensorError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("Index out of bounds: index {index:?} for shape {shape:?}")]
    IndexOutOfBounds {
        index: Vec<usize>,
        shape: Vec<usize>,
    },
    #[error("Axis {axis} is invalid for a tensor of rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },
    #[error("Axis {axis} has size {got}, expected {expected}")]
    AxisMismatch {
        axis: Axis,
        expected: usize,
        got: usize,
    },
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl From<KernelError> for TensorError {
    fn from(err: KernelError) -> Self {
        match err {
            KernelError::ShapeMismatch { expected, got } => {
                TensorError::ShapeMismatch { expected, got }
            }
            KernelError::IndexOutOfBounds { index, bound } => TensorError::IndexOutOfBounds {
                index: vec![index],
                shape: vec![bound],
            },
            KernelError::InvalidAxis { axis, rank } => TensorError::InvalidAxis { axis, rank },
        }
    }
}

pub type Result<T> = std::result::Result<T, TensorError>;

/// Trait bound for elements that can be stored in a Tensor.
///
/// `Send + Sync` is required because kernels run on the rayon pool.
pub trait TensorElem:
    Num + NumAssign + Copy + Clone + Debug + Send + Sync + FromPrimitive + ToPrimitive + PartialOrd
{
}

impl<T> TensorElem for T where
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

/// Elements the differentiable layers are written against (`f32`, `f64`).
pub trait FloatElem: TensorElem + num_traits::Float + 'static {}

impl<T> FloatElem for T where T: TensorElem + num_traits::Float + 'static {}

/// An N-dimensional array.
///
/// # Generics
///
/// - `T`: The element type (must implement `TensorElem`).
/// - `RANK`: The number of dimensions (const generic).
/// - `D`: The device where data is stored (defaults to `Cpu`).
#[derive(Clone)]
pub struct Tensor<T, const RANK: usize, D: Device = Cpu>
where
    T: TensorElem,
{
    shape: [usize; RANK],
    strides: [usize; RANK],
    data: D::Storage<T>,
    device: D,
}

impl<T, const RANK: usize> Tensor<T, RANK, Cpu>
where
    T: TensorElem,
{
    /// Creates a new Tensor from a flat row-major vector and a shape.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if the length of `data` does not match the product of `shape`.
    pub fn new(data: Vec<T>, shape: [usize; RANK]) -> Result<Self> {
        let size: usize = shape.iter().product();
        if data.len() != size {
            return Err(TensorError::ShapeMismatch {
                expected: vec![size],
                got: vec![data.len()],
            });
        }

        Ok(Self {
            shape,
            strides: compute_strides(&shape),
            data,
            device: Cpu,
        })
    }

    /// Creates a Tensor with every element set to `value`.
    pub fn full(shape: [usize; RANK], value: T) -> Self {
        let size: usize = shape.iter().product();
        Self {
            shape,
            strides: compute_strides(&shape),
            data: vec![value; size],
            device: Cpu,
        }
    }

    pub fn zeros(shape: [usize; RANK]) -> Self {
        Self::full(shape, T::zero())
    }

    pub fn ones(shape: [usize; RANK]) -> Self {
        Self::full(shape, T::one())
    }

    /// Builds a Tensor by calling `f` with each flat (row-major) index.
    pub fn from_fn<F>(shape: [usize; RANK], f: F) -> Self
    where
        F: FnMut(usize) -> T,
    {
        let size: usize = shape.iter().product();
        Self {
            shape,
            strides: compute_strides(&shape),
            data: (0..size).map(f).collect(),
            device: Cpu,
        }
    }

    /// Reshapes the tensor to a new shape with the same number of elements.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if the element counts differ.
    pub fn reshape<const NEW_RANK: usize>(
        self,
        new_shape: [usize; NEW_RANK],
    ) -> Result<Tensor<T, NEW_RANK, Cpu>> {
        let current_size: usize = self.shape.iter().product();
        let new_size: usize = new_shape.iter().product();

        if current_size != new_size {
            return Err(TensorError::ShapeMismatch {
                expected: vec![current_size],
                got: vec![new_size],
            });
        }

        Ok(Tensor {
            shape: new_shape,
            strides: compute_strides(&new_shape),
            data: self.data,
            device: self.device,
        })
    }

    /// Consumes the tensor and returns its flat data.
    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Builds a tensor from a dynamically sized shape, checking that it has `RANK` dimensions.
    pub(crate) fn from_dyn(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        let shape: [usize; RANK] = shape.try_into().map_err(|_| TensorError::ShapeMismatch {
            expected: vec![RANK],
            got: vec![shape.len()],
        })?;
        Self::new(data, shape)
    }
}

/// Row-major strides for `shape`.
fn compute_strides<const RANK: usize>(shape: &[usize; RANK]) -> [usize; RANK] {
    let mut strides = [0; RANK];
    let mut stride = 1;
    for i in (0..RANK).rev() {
        strides[i] = stride;
        stride *= shape[i];
    }
    strides
}

impl<T, const RANK: usize, D: Device> Tensor<T, RANK, D>
where
    T: TensorElem,
{
    pub fn shape(&self) -> &[usize; RANK] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize; RANK] {
        &self.strides
    }

    pub fn data(&self) -> &[T] {
        self.data.as_slice()
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        self.data.as_mut_slice()
    }

    /// Returns the total number of elements in the tensor.
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Reads the element at a multi-dimensional index.
    pub fn get(&self, index: [usize; RANK]) -> Result<T> {
        let mut offset = 0;
        for d in 0..RANK {
            if index[d] >= self.shape[d] {
                return Err(TensorError::IndexOutOfBounds {
                    index: index.to_vec(),
                    shape: self.shape.to_vec(),
                });
            }
            offset += index[d] * self.strides[d];
        }
        Ok(self.data.as_slice()[offset])
    }
}

impl<T, const RANK: usize, D: Device> Debug for Tensor<T, RANK, D>
where
    T: TensorElem,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("device", &self.device.name())
            .field("data_len", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_creation() {
        let data = vec![1.0, 2.0, 3.0, 4.0];
        let tensor = Tensor::<f32, 2>::new(data.clone(), [2, 2]).unwrap();
        assert_eq!(tensor.shape(), &[2, 2]);
        assert_eq!(tensor.strides(), &[2, 1]);
        assert_eq!(tensor.data(), &data[..]);

        // Size mismatch
        let err = Tensor::<f32, 2>::new(vec![1.0, 2.0, 3.0], [2, 2]);
        assert!(matches!(err, Err(TensorError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_constructors() {
        assert_eq!(Tensor::<f32, 2>::zeros([2, 3]).data(), &[0.0; 6]);
        assert_eq!(Tensor::<f32, 2>::ones([2, 3]).data(), &[1.0; 6]);
        assert_eq!(Tensor::<f64, 1>::full([2], 0.5).data(), &[0.5, 0.5]);

        let ramp = Tensor::<usize, 2>::from_fn([2, 2], |i| i * 10);
        assert_eq!(ramp.data(), &[0, 10, 20, 30]);
    }

    #[test]
    fn test_scalar_tensor() {
        let s = Tensor::<f32, 0>::new(vec![3.0], []).unwrap();
        assert_eq!(s.size(), 1);
        assert_eq!(s.get([]).unwrap(), 3.0);
    }

    #[test]
    fn test_reshape() {
        let tensor = Tensor::<f32, 2>::zeros([2, 3]);

        let reshaped = tensor.reshape([3, 2]).unwrap();
        assert_eq!(reshaped.shape(), &[3, 2]);

        let err = reshaped.clone().reshape([4, 2]);
        assert!(matches!(err, Err(TensorError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_get() {
        let t = Tensor::<i32, 3>::from_fn([2, 3, 4], |i| i as i32);
        // offset = 1*12 + 2*4 + 3
        assert_eq!(t.get([1, 2, 3]).unwrap(), 23);
        assert!(matches!(
            t.get([0, 3, 0]),
            Err(TensorError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_from_dyn() {
        let t = Tensor::<f32, 2>::from_dyn(vec![1.0; 6], &[2, 3]).unwrap();
        assert_eq!(t.shape(), &[2, 3]);

        let err = Tensor::<f32, 2>::from_dyn(vec![1.0; 6], &[6]);
        assert!(matches!(err, Err(TensorError::ShapeMismatch { .. })));
    }
}
