//! Shape-changing operations: reshape, concatenation, index selection and axis reductions.

use super::{accumulate, new_grad_cell, parents_of, GradCell, GraphNode, Variable};
use crate::tensor::{Cpu, Result, Tensor, TensorElem, TensorError};
use recsys_rs_kernels::AxisLayout;
use std::fmt::Debug;
use std::rc::Rc;

#[derive(Debug)]
struct ReshapeNode<T: TensorElem, const IN: usize, const OUT: usize> {
    input_shape: [usize; IN],
    input_grad: GradCell<T, IN>,
    out_grad: GradCell<T, OUT>,
    parents: Vec<Rc<dyn GraphNode>>,
}

impl<T: TensorElem, const IN: usize, const OUT: usize> GraphNode for ReshapeNode<T, IN, OUT> {
    fn backward(&self) -> Result<()> {
        if let Some(grad) = self.out_grad.borrow().as_ref() {
            accumulate(&self.input_grad, grad.clone().reshape(self.input_shape)?);
        }
        Ok(())
    }

    fn parents(&self) -> Vec<Rc<dyn GraphNode>> {
        self.parents.clone()
    }

    fn clear_grad(&self) {
        *self.out_grad.borrow_mut() = None;
    }
}

/// Slices picked along `axis`; the backward pass scatters them back.
#[derive(Debug)]
struct IndexSelectNode<T: TensorElem, const RANK: usize> {
    axis: usize,
    indices: Vec<usize>,
    len: usize,
    skip: Option<usize>,
    input_grad: GradCell<T, RANK>,
    out_grad: GradCell<T, RANK>,
    parents: Vec<Rc<dyn GraphNode>>,
}

impl<T: TensorElem, const RANK: usize> GraphNode for IndexSelectNode<T, RANK> {
    fn backward(&self) -> Result<()> {
        if let Some(grad) = self.out_grad.borrow().as_ref() {
            let delta = grad.index_add(self.axis, &self.indices, self.len, self.skip)?;
            accumulate(&self.input_grad, delta);
        }
        Ok(())
    }

    fn parents(&self) -> Vec<Rc<dyn GraphNode>> {
        self.parents.clone()
    }

    fn clear_grad(&self) {
        *self.out_grad.borrow_mut() = None;
    }
}

#[derive(Debug)]
struct ConcatNode<T: TensorElem, const RANK: usize> {
    axis: usize,
    sizes: Vec<usize>,
    input_grads: Vec<GradCell<T, RANK>>,
    out_grad: GradCell<T, RANK>,
    parents: Vec<Rc<dyn GraphNode>>,
}

impl<T: TensorElem, const RANK: usize> GraphNode for ConcatNode<T, RANK> {
    fn backward(&self) -> Result<()> {
        if let Some(grad) = self.out_grad.borrow().as_ref() {
            let pieces = grad.split(self.axis, &self.sizes)?;
            for (cell, piece) in self.input_grads.iter().zip(pieces) {
                accumulate(cell, piece);
            }
        }
        Ok(())
    }

    fn parents(&self) -> Vec<Rc<dyn GraphNode>> {
        self.parents.clone()
    }

    fn clear_grad(&self) {
        *self.out_grad.borrow_mut() = None;
    }
}

/// `sum_axis` and `expand_axis` are each other's adjoint; one node type serves both.
#[derive(Debug)]
enum AxisOp {
    /// Forward summed `axis` of length `len` down to 1.
    Sum { len: usize },
    /// Forward repeated a length-1 `axis`.
    Expand,
}

#[derive(Debug)]
struct AxisNode<T: TensorElem, const RANK: usize> {
    axis: usize,
    op: AxisOp,
    input_grad: GradCell<T, RANK>,
    out_grad: GradCell<T, RANK>,
    parents: Vec<Rc<dyn GraphNode>>,
}

impl<T: TensorElem, const RANK: usize> GraphNode for AxisNode<T, RANK> {
    fn backward(&self) -> Result<()> {
        if let Some(grad) = self.out_grad.borrow().as_ref() {
            let delta = match self.op {
                AxisOp::Sum { len } => grad.expand_axis(self.axis, len)?,
                AxisOp::Expand => grad.sum_axis(self.axis)?,
            };
            accumulate(&self.input_grad, delta);
        }
        Ok(())
    }

    fn parents(&self) -> Vec<Rc<dyn GraphNode>> {
        self.parents.clone()
    }

    fn clear_grad(&self) {
        *self.out_grad.borrow_mut() = None;
    }
}

/// Routes each output gradient to the position that won the forward max.
#[derive(Debug)]
struct MaxAxisNode<T: TensorElem, const RANK: usize> {
    layout: AxisLayout,
    positions: Vec<usize>,
    input_shape: [usize; RANK],
    input_grad: GradCell<T, RANK>,
    out_grad: GradCell<T, RANK>,
    parents: Vec<Rc<dyn GraphNode>>,
}

impl<T: TensorElem, const RANK: usize> GraphNode for MaxAxisNode<T, RANK> {
    fn backward(&self) -> Result<()> {
        if let Some(grad) = self.out_grad.borrow().as_ref() {
            let AxisLayout { len, inner, .. } = self.layout;
            let mut delta = Tensor::zeros(self.input_shape);
            let dst = delta.data_mut();
            for (flat, (&g, &p)) in grad.data().iter().zip(&self.positions).enumerate() {
                let (o, i) = (flat / inner, flat % inner);
                dst[o * len * inner + p * inner + i] += g;
            }
            accumulate(&self.input_grad, delta);
        }
        Ok(())
    }

    fn parents(&self) -> Vec<Rc<dyn GraphNode>> {
        self.parents.clone()
    }

    fn clear_grad(&self) {
        *self.out_grad.borrow_mut() = None;
    }
}

#[derive(Debug)]
struct SumAllNode<T: TensorElem, const RANK: usize> {
    input_shape: [usize; RANK],
    input_grad: GradCell<T, RANK>,
    out_grad: GradCell<T, 0>,
    parents: Vec<Rc<dyn GraphNode>>,
}

impl<T: TensorElem, const RANK: usize> GraphNode for SumAllNode<T, RANK> {
    fn backward(&self) -> Result<()> {
        if let Some(grad) = self.out_grad.borrow().as_ref() {
            accumulate(&self.input_grad, Tensor::full(self.input_shape, grad.data()[0]));
        }
        Ok(())
    }

    fn parents(&self) -> Vec<Rc<dyn GraphNode>> {
        self.parents.clone()
    }

    fn clear_grad(&self) {
        *self.out_grad.borrow_mut() = None;
    }
}

impl<T: TensorElem + 'static, const RANK: usize> Variable<T, RANK> {
    pub fn reshape<const NEW_RANK: usize>(
        &self,
        new_shape: [usize; NEW_RANK],
    ) -> Result<Variable<T, NEW_RANK>> {
        let data = self.data.clone().reshape(new_shape)?;
        let out_grad = new_grad_cell();
        let node = Rc::new(ReshapeNode {
            input_shape: *self.shape(),
            input_grad: self.grad.clone(),
            out_grad: out_grad.clone(),
            parents: parents_of(&[&self.node]),
        });
        Ok(Variable::with_node(data, out_grad, node))
    }

    /// Picks slices along `axis`. Repeated indices receive summed gradients.
    pub fn index_select(&self, axis: usize, indices: &[usize]) -> Result<Self> {
        self.index_select_skipping(axis, indices, None)
    }

    /// Like [`Variable::index_select`], but slices equal to `skip` never receive gradient.
    pub(crate) fn index_select_skipping(
        &self,
        axis: usize,
        indices: &[usize],
        skip: Option<usize>,
    ) -> Result<Self> {
        let data = self.data.index_select(axis, indices)?;
        let out_grad = new_grad_cell();
        let node = Rc::new(IndexSelectNode {
            axis,
            indices: indices.to_vec(),
            len: self.shape()[axis],
            skip,
            input_grad: self.grad.clone(),
            out_grad: out_grad.clone(),
            parents: parents_of(&[&self.node]),
        });
        Ok(Variable::with_node(data, out_grad, node))
    }

    /// Concatenates variables along `axis`.
    pub fn concat(parts: &[Variable<T, RANK>], axis: usize) -> Result<Self> {
        if axis >= RANK {
            return Err(TensorError::InvalidAxis { axis, rank: RANK });
        }
        let tensors: Vec<&Tensor<T, RANK, Cpu>> = parts.iter().map(|p| &p.data).collect();
        let data = Tensor::concat(&tensors, axis)?;

        let out_grad = new_grad_cell();
        let node = Rc::new(ConcatNode {
            axis,
            sizes: parts.iter().map(|p| p.shape()[axis]).collect(),
            input_grads: parts.iter().map(|p| p.grad.clone()).collect(),
            out_grad: out_grad.clone(),
            parents: parts.iter().filter_map(|p| p.node.clone()).collect(),
        });
        Ok(Variable::with_node(data, out_grad, node))
    }

    fn axis_node(&self, data: Tensor<T, RANK, Cpu>, axis: usize, op: AxisOp) -> Self {
        let out_grad = new_grad_cell();
        let node = Rc::new(AxisNode {
            axis,
            op,
            input_grad: self.grad.clone(),
            out_grad: out_grad.clone(),
            parents: parents_of(&[&self.node]),
        });
        Variable::with_node(data, out_grad, node)
    }

    /// Sum over `axis`, keeping it with length 1.
    pub fn sum_axis(&self, axis: usize) -> Result<Self> {
        let data = self.data.sum_axis(axis)?;
        let len = self.shape()[axis];
        Ok(self.axis_node(data, axis, AxisOp::Sum { len }))
    }

    /// Repeats a length-1 `axis` `size` times (explicit broadcasting).
    pub fn expand_axis(&self, axis: usize, size: usize) -> Result<Self> {
        let data = self.data.expand_axis(axis, size)?;
        Ok(self.axis_node(data, axis, AxisOp::Expand))
    }

    /// Maximum over `axis`, keeping it with length 1.
    pub fn max_axis(&self, axis: usize) -> Result<Self> {
        let (data, positions) = self.data.max_axis(axis)?;
        let out_grad = new_grad_cell();
        let node = Rc::new(MaxAxisNode {
            layout: AxisLayout::new(self.shape(), axis)?,
            positions,
            input_shape: *self.shape(),
            input_grad: self.grad.clone(),
            out_grad: out_grad.clone(),
            parents: parents_of(&[&self.node]),
        });
        Ok(Variable::with_node(data, out_grad, node))
    }

    /// Sum of every element as a scalar variable.
    pub fn sum_all(&self) -> Variable<T, 0> {
        let data = self.data.sum_all();
        let out_grad = new_grad_cell();
        let node = Rc::new(SumAllNode {
            input_shape: *self.shape(),
            input_grad: self.grad.clone(),
            out_grad: out_grad.clone(),
            parents: parents_of(&[&self.node]),
        });
        Variable::with_node(data, out_grad, node)
    }

    /// Mean of every element as a scalar variable.
    pub fn mean_all(&self) -> Result<Variable<T, 0>> {
        let n = T::from_usize(self.data.size())
            .filter(|n| *n != T::zero())
            .ok_or_else(|| TensorError::Unsupported("mean of an empty tensor".into()))?;
        Ok(self.sum_all().scale(T::one() / n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var<const R: usize>(data: Vec<f32>, shape: [usize; R]) -> Variable<f32, R> {
        Variable::new(Tensor::new(data, shape).unwrap())
    }

    #[test]
    fn test_reshape_backward() {
        let x = var(vec![1.0, 2.0, 3.0, 4.0], [2, 2]);
        let flat: Variable<f32, 1> = x.reshape([4]).unwrap();
        let w = var(vec![1.0, 10.0, 100.0, 1000.0], [4]);
        let y = (&flat * &w).unwrap().sum_all();
        y.backward().unwrap();

        let g = x.gradient().unwrap();
        assert_eq!(g.shape(), &[2, 2]);
        assert_eq!(g.data(), &[1.0, 10.0, 100.0, 1000.0]);
    }

    #[test]
    fn test_index_select_backward_sums_repeats() {
        // table [3, 2], lookups [1, 1, 2]
        let table = var(vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0], [3, 2]);
        let rows = table.index_select(0, &[1, 1, 2]).unwrap();
        assert_eq!(rows.data.data(), &[1.0, 1.0, 1.0, 1.0, 2.0, 2.0]);

        rows.sum_all().backward().unwrap();
        assert_eq!(
            table.gradient().unwrap().data(),
            &[0.0, 0.0, 2.0, 2.0, 1.0, 1.0]
        );
    }

    #[test]
    fn test_index_select_skipping_padding() {
        let table = var(vec![0.0, 5.0, 6.0], [3, 1]);
        let rows = table.index_select_skipping(0, &[0, 1, 0, 2], Some(0)).unwrap();
        rows.sum_all().backward().unwrap();
        assert_eq!(table.gradient().unwrap().data(), &[0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_concat_backward() {
        let a = var(vec![1.0, 2.0], [2, 1]);
        let b = var(vec![3.0, 4.0, 5.0, 6.0], [2, 2]);
        let c = Variable::concat(&[a.clone(), b.clone()], 1).unwrap();
        assert_eq!(c.data.data(), &[1.0, 3.0, 4.0, 2.0, 5.0, 6.0]);

        let w = var(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]);
        (&c * &w).unwrap().sum_all().backward().unwrap();
        assert_eq!(a.gradient().unwrap().data(), &[1.0, 4.0]);
        assert_eq!(b.gradient().unwrap().data(), &[2.0, 3.0, 5.0, 6.0]);

        assert!(Variable::concat(&[a, b], 2).is_err());
    }

    #[test]
    fn test_sum_and_expand_axis_backward() {
        let x = var(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]);
        let s = x.sum_axis(1).unwrap();
        assert_eq!(s.data.data(), &[6.0, 15.0]);

        // broadcast the row sums back and weight them
        let e = s.expand_axis(1, 3).unwrap();
        let w = var(vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0], [2, 3]);
        (&e * &w).unwrap().sum_all().backward().unwrap();

        // row 0 sees weight 1+1+1, row 1 sees 2+2+2
        assert_eq!(
            x.gradient().unwrap().data(),
            &[3.0, 3.0, 3.0, 6.0, 6.0, 6.0]
        );
    }

    #[test]
    fn test_max_axis_backward() {
        let x = var(vec![1.0, 5.0, 2.0, 7.0, 0.0, 3.0], [2, 3]);
        let m = x.max_axis(1).unwrap();
        assert_eq!(m.data.data(), &[5.0, 7.0]);

        m.sum_all().backward().unwrap();
        assert_eq!(
            x.gradient().unwrap().data(),
            &[0.0, 1.0, 0.0, 1.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_mean_all() {
        let x = var(vec![1.0, 2.0, 3.0, 6.0], [4]);
        let m = x.mean_all().unwrap();
        assert_eq!(m.data.data(), &[3.0]);
        m.backward().unwrap();
        assert_eq!(x.gradient().unwrap().data(), &[0.25; 4]);

        let empty = var(vec![], [0]);
        assert!(empty.mean_all().is_err());
    }
}
