use super::{Cpu, Result, Tensor, TensorElem, TensorError};
use rayon::prelude::*;
use recsys_rs_kernels::{cpu_matmul, cpu_transpose};
use std::ops::{Add, Div, Mul, Sub};

macro_rules! impl_bin_op {
    ($trait:ident, $method:ident) => {
        impl<T, const RANK: usize> $trait for &Tensor<T, RANK, Cpu>
        where
            T: TensorElem,
        {
            type Output = Result<Tensor<T, RANK, Cpu>>;

            fn $method(self, rhs: Self) -> Self::Output {
                self.zip_map(rhs, |a, b| a.$method(b))
            }
        }
    };
}

impl_bin_op!(Add, add);
impl_bin_op!(Sub, sub);
impl_bin_op!(Mul, mul);
impl_bin_op!(Div, div);

impl<T, const RANK: usize> Tensor<T, RANK, Cpu>
where
    T: TensorElem,
{
    /// Applies a function element-wise.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(T) -> T + Sync + Send,
    {
        let mut out = Tensor::zeros(self.shape);
        out.data
            .par_iter_mut()
            .zip(self.data.par_iter())
            .for_each(|(o, i)| *o = f(*i));
        out
    }

    /// Combines two same-shaped tensors element-wise.
    pub fn zip_map<F>(&self, rhs: &Self, f: F) -> Result<Self>
    where
        F: Fn(T, T) -> T + Sync + Send,
    {
        if self.shape != rhs.shape {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape.to_vec(),
                got: rhs.shape.to_vec(),
            });
        }

        let mut out = Tensor::zeros(self.shape);
        out.data
            .par_iter_mut()
            .zip(self.data.par_iter())
            .zip(rhs.data.par_iter())
            .for_each(|((o, a), b)| *o = f(*a, *b));
        Ok(out)
    }

    pub fn scale(&self, factor: T) -> Self {
        self.map(|v| v * factor)
    }

    /// Sum of all elements as a rank-0 tensor.
    pub fn sum_all(&self) -> Tensor<T, 0, Cpu> {
        let total = self
            .data
            .par_iter()
            .copied()
            .reduce(T::zero, |a, b| a + b);
        Tensor::full([], total)
    }

    /// Batched matrix multiplication over the last two dimensions.
    ///
    /// - `[M, K] x [K, N] -> [M, N]`
    /// - `[B, M, K] x [B, K, N] -> [B, M, N]`
    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        if RANK < 2 {
            return Err(TensorError::Unsupported(format!(
                "Matmul requires rank >= 2, got {RANK}"
            )));
        }
        let data = cpu_matmul(self.data(), rhs.data(), &self.shape, &rhs.shape)?;
        let mut shape = self.shape;
        shape[RANK - 1] = rhs.shape[RANK - 1];
        Tensor::new(data, shape)
    }

    /// Swaps the last two dimensions.
    pub fn transpose(&self) -> Result<Self> {
        if RANK < 2 {
            return Err(TensorError::Unsupported(
                "Transpose requires rank >= 2".into(),
            ));
        }
        let data = cpu_transpose(self.data(), &self.shape)?;
        let mut shape = self.shape;
        shape.swap(RANK - 1, RANK - 2);
        Tensor::new(data, shape)
    }
}
