//! Axis-wise tensor operations. Reductions keep the reduced axis with length 1.

use super::{Cpu, Result, Tensor, TensorElem, TensorError};
use recsys_rs_kernels::{
    cpu_concat, cpu_expand_axis, cpu_index_add, cpu_index_select, cpu_max_axis, cpu_split,
    cpu_sum_axis,
};

impl<T, const RANK: usize> Tensor<T, RANK, Cpu>
where
    T: TensorElem,
{
    fn with_axis_len(&self, axis: usize, len: usize) -> Result<[usize; RANK]> {
        if axis >= RANK {
            return Err(TensorError::InvalidAxis { axis, rank: RANK });
        }
        let mut shape = *self.shape();
        shape[axis] = len;
        Ok(shape)
    }

    pub fn sum_axis(&self, axis: usize) -> Result<Self> {
        let data = cpu_sum_axis(self.data(), self.shape(), axis)?;
        Tensor::new(data, self.with_axis_len(axis, 1)?)
    }

    /// Maximum along `axis` plus, for every output element, the winning position on that axis.
    pub fn max_axis(&self, axis: usize) -> Result<(Self, Vec<usize>)> {
        let (data, positions) = cpu_max_axis(self.data(), self.shape(), axis)?;
        Ok((Tensor::new(data, self.with_axis_len(axis, 1)?)?, positions))
    }

    /// Repeats a length-1 axis `size` times.
    pub fn expand_axis(&self, axis: usize, size: usize) -> Result<Self> {
        let data = cpu_expand_axis(self.data(), self.shape(), axis, size)?;
        Tensor::new(data, self.with_axis_len(axis, size)?)
    }

    /// Picks the slices at `indices` along `axis`.
    pub fn index_select(&self, axis: usize, indices: &[usize]) -> Result<Self> {
        let data = cpu_index_select(self.data(), self.shape(), axis, indices)?;
        Tensor::new(data, self.with_axis_len(axis, indices.len())?)
    }

    /// Scatters this tensor's slices onto a zero tensor whose `axis` has length `len`, summing
    /// repeated indices. Slices routed to `skip` are dropped.
    pub fn index_add(
        &self,
        axis: usize,
        indices: &[usize],
        len: usize,
        skip: Option<usize>,
    ) -> Result<Self> {
        let target = self.with_axis_len(axis, len)?;
        let data = cpu_index_add(self.data(), &target, axis, indices, skip)?;
        Tensor::new(data, target)
    }

    /// Joins tensors along `axis`; all other dimensions must agree.
    pub fn concat(parts: &[&Self], axis: usize) -> Result<Self> {
        let views: Vec<(&[T], &[usize])> = parts
            .iter()
            .map(|t| (t.data(), t.shape().as_slice()))
            .collect();
        let (data, shape) = cpu_concat(&views, axis)?;
        Tensor::from_dyn(data, &shape)
    }

    /// Splits along `axis` into consecutive pieces of the given lengths.
    pub fn split(&self, axis: usize, sizes: &[usize]) -> Result<Vec<Self>> {
        let pieces = cpu_split(self.data(), self.shape(), axis, sizes)?;
        pieces
            .into_iter()
            .zip(sizes)
            .map(|(data, &len)| Tensor::new(data, self.with_axis_len(axis, len)?))
            .collect()
    }

    /// Repeats every entry of the first axis `size` times in place:
    /// `[x0, x1] -> [x0, x0, x1, x1]` for `size = 2`.
    pub fn repeat_interleave(&self, size: usize) -> Result<Self> {
        if RANK == 0 {
            return Err(TensorError::InvalidAxis { axis: 0, rank: 0 });
        }
        let indices: Vec<usize> = (0..self.shape()[0])
            .flat_map(|i| std::iter::repeat_n(i, size))
            .collect();
        self.index_select(0, &indices)
    }
}
