//! Arithmetic on variables: element-wise binary ops, scaling, bias broadcast, matmul.

use super::{accumulate, new_grad_cell, parents_of, GradCell, GraphNode, Variable};
use crate::tensor::{Cpu, Result, Tensor, TensorElem, TensorError};
use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Sub};
use std::rc::Rc;

/// `z = f(x, y)` with element-wise local partials `dz/dx` and `dz/dy`.
#[derive(Debug)]
struct BinaryNode<T: TensorElem, const RANK: usize> {
    lhs_partial: Tensor<T, RANK, Cpu>,
    rhs_partial: Tensor<T, RANK, Cpu>,
    lhs_grad: GradCell<T, RANK>,
    rhs_grad: GradCell<T, RANK>,
    out_grad: GradCell<T, RANK>,
    parents: Vec<Rc<dyn GraphNode>>,
}

impl<T: TensorElem, const RANK: usize> GraphNode for BinaryNode<T, RANK> {
    fn backward(&self) -> Result<()> {
        let out = self.out_grad.borrow();
        let Some(grad) = out.as_ref() else {
            return Ok(());
        };
        accumulate(&self.lhs_grad, (grad * &self.lhs_partial)?);
        accumulate(&self.rhs_grad, (grad * &self.rhs_partial)?);
        Ok(())
    }

    fn parents(&self) -> Vec<Rc<dyn GraphNode>> {
        self.parents.clone()
    }

    fn clear_grad(&self) {
        *self.out_grad.borrow_mut() = None;
    }
}

fn binary<T: TensorElem + 'static, const RANK: usize>(
    lhs: &Variable<T, RANK>,
    rhs: &Variable<T, RANK>,
    data: Tensor<T, RANK, Cpu>,
    lhs_partial: Tensor<T, RANK, Cpu>,
    rhs_partial: Tensor<T, RANK, Cpu>,
) -> Variable<T, RANK> {
    let out_grad = new_grad_cell();
    let node = Rc::new(BinaryNode {
        lhs_partial,
        rhs_partial,
        lhs_grad: lhs.grad.clone(),
        rhs_grad: rhs.grad.clone(),
        out_grad: out_grad.clone(),
        parents: parents_of(&[&lhs.node, &rhs.node]),
    });
    Variable::with_node(data, out_grad, node)
}

impl<T: TensorElem + 'static, const RANK: usize> Add for &Variable<T, RANK> {
    type Output = Result<Variable<T, RANK>>;

    fn add(self, rhs: Self) -> Self::Output {
        let data = (&self.data + &rhs.data)?;
        let ones = Tensor::ones(*data.shape());
        Ok(binary(self, rhs, data, ones.clone(), ones))
    }
}

impl<T: TensorElem + 'static, const RANK: usize> Sub for &Variable<T, RANK> {
    type Output = Result<Variable<T, RANK>>;

    fn sub(self, rhs: Self) -> Self::Output {
        let data = (&self.data - &rhs.data)?;
        let shape = *data.shape();
        Ok(binary(
            self,
            rhs,
            data,
            Tensor::ones(shape),
            Tensor::full(shape, T::zero() - T::one()),
        ))
    }
}

impl<T: TensorElem + 'static, const RANK: usize> Mul for &Variable<T, RANK> {
    type Output = Result<Variable<T, RANK>>;

    fn mul(self, rhs: Self) -> Self::Output {
        let data = (&self.data * &rhs.data)?;
        Ok(binary(self, rhs, data, rhs.data.clone(), self.data.clone()))
    }
}

impl<T: TensorElem + 'static, const RANK: usize> Div for &Variable<T, RANK> {
    type Output = Result<Variable<T, RANK>>;

    fn div(self, rhs: Self) -> Self::Output {
        let data = (&self.data / &rhs.data)?;
        // d(x/y)/dx = 1/y, d(x/y)/dy = -x/y^2
        let lhs_partial = rhs.data.map(|y| T::one() / y);
        let rhs_partial = self
            .data
            .zip_map(&rhs.data, |x, y| (T::zero() - x) / (y * y))?;
        Ok(binary(self, rhs, data, lhs_partial, rhs_partial))
    }
}

/// `z = x + b` where `b` is a vector broadcast over the last axis of `x`.
#[derive(Debug)]
struct AddBiasNode<T: TensorElem, const RANK: usize> {
    input_grad: GradCell<T, RANK>,
    bias_grad: GradCell<T, 1>,
    out_grad: GradCell<T, RANK>,
    parents: Vec<Rc<dyn GraphNode>>,
}

impl<T: TensorElem, const RANK: usize> GraphNode for AddBiasNode<T, RANK> {
    fn backward(&self) -> Result<()> {
        let out = self.out_grad.borrow();
        let Some(grad) = out.as_ref() else {
            return Ok(());
        };
        let features = grad.shape()[RANK - 1];
        let mut bias_delta = vec![T::zero(); features];
        for row in grad.data().chunks(features.max(1)) {
            for (b, &g) in bias_delta.iter_mut().zip(row) {
                *b += g;
            }
        }
        accumulate(&self.bias_grad, Tensor::new(bias_delta, [features])?);
        accumulate(&self.input_grad, grad.clone());
        Ok(())
    }

    fn parents(&self) -> Vec<Rc<dyn GraphNode>> {
        self.parents.clone()
    }

    fn clear_grad(&self) {
        *self.out_grad.borrow_mut() = None;
    }
}

/// `z = a @ b` over the last two axes.
#[derive(Debug)]
struct MatMulNode<T: TensorElem, const RANK: usize> {
    lhs_data: Tensor<T, RANK, Cpu>,
    rhs_data: Tensor<T, RANK, Cpu>,
    lhs_grad: GradCell<T, RANK>,
    rhs_grad: GradCell<T, RANK>,
    out_grad: GradCell<T, RANK>,
    parents: Vec<Rc<dyn GraphNode>>,
}

impl<T: TensorElem, const RANK: usize> GraphNode for MatMulNode<T, RANK> {
    fn backward(&self) -> Result<()> {
        let out = self.out_grad.borrow();
        let Some(grad) = out.as_ref() else {
            return Ok(());
        };
        // dL/dA = G @ B^T, dL/dB = A^T @ G
        accumulate(&self.lhs_grad, grad.matmul(&self.rhs_data.transpose()?)?);
        accumulate(&self.rhs_grad, self.lhs_data.transpose()?.matmul(grad)?);
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
struct TransposeNode<T: TensorElem, const RANK: usize> {
    input_grad: GradCell<T, RANK>,
    out_grad: GradCell<T, RANK>,
    parents: Vec<Rc<dyn GraphNode>>,
}

impl<T: TensorElem, const RANK: usize> GraphNode for TransposeNode<T, RANK> {
    fn backward(&self) -> Result<()> {
        if let Some(grad) = self.out_grad.borrow().as_ref() {
            accumulate(&self.input_grad, grad.transpose()?);
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
    /// Multiplies every element by a constant.
    pub fn scale(&self, factor: T) -> Variable<T, RANK> {
        let data = self.data.scale(factor);
        let factor = Tensor::full(*data.shape(), factor);
        // reuse the binary node with a constant right operand
        let constant = Variable::new(factor.clone());
        binary(self, &constant, data, factor, Tensor::zeros(*self.shape()))
    }

    /// Adds `bias` (shape `[F]`) to every row of the last axis (`[..., F]`).
    pub fn add_bias(&self, bias: &Variable<T, 1>) -> Result<Variable<T, RANK>> {
        let features = bias.shape()[0];
        if RANK == 0 || self.shape()[RANK - 1] != features {
            return Err(TensorError::ShapeMismatch {
                expected: vec![features],
                got: self.shape().to_vec(),
            });
        }
        let mut data = self.data.clone();
        for row in data.data_mut().chunks_mut(features.max(1)) {
            for (x, &b) in row.iter_mut().zip(bias.data.data()) {
                *x += b;
            }
        }

        let out_grad = new_grad_cell();
        let node = Rc::new(AddBiasNode {
            input_grad: self.grad.clone(),
            bias_grad: bias.grad.clone(),
            out_grad: out_grad.clone(),
            parents: parents_of(&[&self.node, &bias.node]),
        });
        Ok(Variable::with_node(data, out_grad, node))
    }

    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        let data = self.data.matmul(&rhs.data)?;

        let out_grad = new_grad_cell();
        let node = Rc::new(MatMulNode {
            lhs_data: self.data.clone(),
            rhs_data: rhs.data.clone(),
            lhs_grad: self.grad.clone(),
            rhs_grad: rhs.grad.clone(),
            out_grad: out_grad.clone(),
            parents: parents_of(&[&self.node, &rhs.node]),
        });
        Ok(Variable::with_node(data, out_grad, node))
    }

    /// Swaps the last two axes.
    pub fn transpose(&self) -> Result<Self> {
        let data = self.data.transpose()?;
        let out_grad = new_grad_cell();
        let node = Rc::new(TransposeNode {
            input_grad: self.grad.clone(),
            out_grad: out_grad.clone(),
            parents: parents_of(&[&self.node]),
        });
        Ok(Variable::with_node(data, out_grad, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(v: f32) -> Variable<f32, 0> {
        Variable::new(Tensor::new(vec![v], []).unwrap())
    }

    #[test]
    fn test_add_backward() {
        let a = scalar(2.0);
        let b = scalar(3.0);
        let c = (&a + &b).unwrap();

        c.backward().unwrap();

        assert_eq!(a.gradient().unwrap().data()[0], 1.0);
        assert_eq!(b.gradient().unwrap().data()[0], 1.0);
    }

    #[test]
    fn test_sub_div_backward() {
        // y = (a - b) / b, a=6, b=2
        // dy/da = 1/b = 0.5
        // dy/db = -1/b - (a-b)/b^2 = -0.5 - 1.0 = -1.5
        let a = scalar(6.0);
        let b = scalar(2.0);
        let y = (&(&a - &b).unwrap() / &b).unwrap();
        assert_eq!(y.data.data()[0], 2.0);

        y.backward().unwrap();
        assert_eq!(a.gradient().unwrap().data()[0], 0.5);
        assert_eq!(b.gradient().unwrap().data()[0], -1.5);
    }

    #[test]
    fn test_chain_rule() {
        // y = (a + b) * c, a=2, b=3, c=4
        // dy/da = dy/db = c = 4, dy/dc = a + b = 5
        let a = scalar(2.0);
        let b = scalar(3.0);
        let c = scalar(4.0);

        let y = (&(&a + &b).unwrap() * &c).unwrap();
        y.backward().unwrap();

        assert_eq!(a.gradient().unwrap().data()[0], 4.0);
        assert_eq!(b.gradient().unwrap().data()[0], 4.0);
        assert_eq!(c.gradient().unwrap().data()[0], 5.0);
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let a = Variable::new(Tensor::<f32, 1>::ones([2]));
        let b = Variable::new(Tensor::<f32, 1>::ones([3]));
        assert!(matches!(&a + &b, Err(TensorError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_scale() {
        let a = Variable::new(Tensor::<f32, 1>::new(vec![1.0, -2.0], [2]).unwrap());
        let y = a.scale(3.0);
        assert_eq!(y.data.data(), &[3.0, -6.0]);
        y.backward().unwrap();
        assert_eq!(a.gradient().unwrap().data(), &[3.0, 3.0]);
    }

    #[test]
    fn test_add_bias_backward() {
        // x [2, 3] + b [3]
        let x = Variable::new(Tensor::<f32, 2>::zeros([2, 3]));
        let b = Variable::new(Tensor::<f32, 1>::new(vec![1.0, 2.0, 3.0], [3]).unwrap());
        let y = x.add_bias(&b).unwrap();
        assert_eq!(y.data.data(), &[1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);

        y.backward().unwrap();
        // each bias entry feeds two rows
        assert_eq!(b.gradient().unwrap().data(), &[2.0, 2.0, 2.0]);
        assert_eq!(x.gradient().unwrap().data(), &[1.0; 6]);

        let wrong = Variable::new(Tensor::<f32, 1>::ones([2]));
        assert!(x.add_bias(&wrong).is_err());
    }

    #[test]
    fn test_matmul_backward() {
        // A [1, 2] @ B [2, 1]
        // dL/dA = G @ B^T = [b0, b1], dL/dB = A^T @ G = [a0, a1]^T
        let a = Variable::new(Tensor::<f32, 2>::new(vec![1.0, 2.0], [1, 2]).unwrap());
        let b = Variable::new(Tensor::<f32, 2>::new(vec![3.0, 4.0], [2, 1]).unwrap());
        let c = a.matmul(&b).unwrap();
        assert_eq!(c.data.data(), &[11.0]);

        c.backward().unwrap();
        assert_eq!(a.gradient().unwrap().data(), &[3.0, 4.0]);
        assert_eq!(b.gradient().unwrap().data(), &[1.0, 2.0]);
    }

    #[test]
    fn test_transpose_backward() {
        let a = Variable::new(Tensor::<f32, 2>::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]).unwrap());
        let t = a.transpose().unwrap();
        assert_eq!(t.shape(), &[3, 2]);

        let w = Variable::new(Tensor::<f32, 2>::from_fn([3, 2], |i| i as f32));
        let y = (&t * &w).unwrap();
        y.backward().unwrap();
        // gradient of a is w transposed back to [2, 3]
        assert_eq!(a.gradient().unwrap().data(), &[0.0, 2.0, 4.0, 1.0, 3.0, 5.0]);
    }
}
