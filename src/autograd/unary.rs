//! Element-wise non-linearities, softmax and norms for floating-point variables.

use super::{accumulate, new_grad_cell, parents_of, GradCell, GraphNode, Variable};
use crate::tensor::{Cpu, FloatElem, Result, Tensor, TensorElem, TensorError};
use std::fmt::Debug;
use std::rc::Rc;

/// `y = f(x)` applied element-wise; `derivative` holds `f'(x)` from the forward pass.
#[derive(Debug)]
struct ElementwiseNode<T: TensorElem, const RANK: usize> {
    derivative: Tensor<T, RANK, Cpu>,
    input_grad: GradCell<T, RANK>,
    out_grad: GradCell<T, RANK>,
    parents: Vec<Rc<dyn GraphNode>>,
}

impl<T: TensorElem, const RANK: usize> GraphNode for ElementwiseNode<T, RANK> {
    fn backward(&self) -> Result<()> {
        if let Some(grad) = self.out_grad.borrow().as_ref() {
            accumulate(&self.input_grad, (grad * &self.derivative)?);
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

/// Which softmax flavour a [`SoftmaxNode`] differentiates.
#[derive(Debug, Clone, Copy)]
enum SoftmaxKind {
    Softmax,
    LogSoftmax,
}

/// Softmax over the last axis. `probs` is the forward softmax in both flavours.
#[derive(Debug)]
struct SoftmaxNode<T: TensorElem, const RANK: usize> {
    kind: SoftmaxKind,
    probs: Tensor<T, RANK, Cpu>,
    input_grad: GradCell<T, RANK>,
    out_grad: GradCell<T, RANK>,
    parents: Vec<Rc<dyn GraphNode>>,
}

impl<T: FloatElem, const RANK: usize> GraphNode for SoftmaxNode<T, RANK> {
    fn backward(&self) -> Result<()> {
        let out = self.out_grad.borrow();
        let Some(grad) = out.as_ref() else {
            return Ok(());
        };
        let width = self.probs.shape()[RANK - 1].max(1);
        let mut delta = Tensor::zeros(*grad.shape());
        for ((d, g), p) in delta
            .data_mut()
            .chunks_mut(width)
            .zip(grad.data().chunks(width))
            .zip(self.probs.data().chunks(width))
        {
            match self.kind {
                // dx = p * (g - <g, p>)
                SoftmaxKind::Softmax => {
                    let dot = g.iter().zip(p).fold(T::zero(), |acc, (&g, &p)| acc + g * p);
                    for ((d, &g), &p) in d.iter_mut().zip(g).zip(p) {
                        *d = p * (g - dot);
                    }
                }
                // dx = g - p * sum(g)
                SoftmaxKind::LogSoftmax => {
                    let total = g.iter().fold(T::zero(), |acc, &g| acc + g);
                    for ((d, &g), &p) in d.iter_mut().zip(g).zip(p) {
                        *d = g - p * total;
                    }
                }
            }
        }
        accumulate(&self.input_grad, delta);
        Ok(())
    }

    fn parents(&self) -> Vec<Rc<dyn GraphNode>> {
        self.parents.clone()
    }

    fn clear_grad(&self) {
        *self.out_grad.borrow_mut() = None;
    }
}

/// `y = ||x||_p` over all elements.
#[derive(Debug)]
struct NormNode<T: TensorElem, const RANK: usize> {
    input: Tensor<T, RANK, Cpu>,
    norm: T,
    p: T,
    input_grad: GradCell<T, RANK>,
    out_grad: GradCell<T, 0>,
    parents: Vec<Rc<dyn GraphNode>>,
}

impl<T: FloatElem, const RANK: usize> GraphNode for NormNode<T, RANK> {
    fn backward(&self) -> Result<()> {
        let out = self.out_grad.borrow();
        let Some(grad) = out.as_ref() else {
            return Ok(());
        };
        let g = grad.data()[0];
        // d||x||_p / dx_i = sign(x_i) |x_i|^(p-1) / ||x||_p^(p-1), zero at x = 0
        let delta = if self.norm == T::zero() {
            Tensor::zeros(*self.input.shape())
        } else {
            let p_minus_one = self.p - T::one();
            let denom = self.norm.powf(p_minus_one);
            self.input
                .map(|x| g * x.signum() * x.abs().powf(p_minus_one) / denom)
        };
        accumulate(&self.input_grad, delta);
        Ok(())
    }

    fn parents(&self) -> Vec<Rc<dyn GraphNode>> {
        self.parents.clone()
    }

    fn clear_grad(&self) {
        *self.out_grad.borrow_mut() = None;
    }
}

impl<T: FloatElem, const RANK: usize> Variable<T, RANK> {
    fn elementwise(&self, data: Tensor<T, RANK, Cpu>, derivative: Tensor<T, RANK, Cpu>) -> Self {
        let out_grad = new_grad_cell();
        let node = Rc::new(ElementwiseNode {
            derivative,
            input_grad: self.grad.clone(),
            out_grad: out_grad.clone(),
            parents: parents_of(&[&self.node]),
        });
        Variable::with_node(data, out_grad, node)
    }

    pub fn exp(&self) -> Self {
        let data = self.data.map(T::exp);
        self.elementwise(data.clone(), data)
    }

    pub fn log(&self) -> Self {
        let data = self.data.map(T::ln);
        let derivative = self.data.map(|x| T::one() / x);
        self.elementwise(data, derivative)
    }

    pub fn sqrt(&self) -> Self {
        let data = self.data.map(T::sqrt);
        let two = T::one() + T::one();
        let derivative = data.map(|y| T::one() / (two * y));
        self.elementwise(data, derivative)
    }

    pub fn sigmoid(&self) -> Self {
        let data = self.data.map(sigmoid);
        let derivative = data.map(|y| y * (T::one() - y));
        self.elementwise(data, derivative)
    }

    /// `log(sigmoid(x))` without overflow for large `|x|`.
    pub fn log_sigmoid(&self) -> Self {
        let data = self
            .data
            .map(|x| x.min(T::zero()) - (T::one() + (-x.abs()).exp()).ln());
        let derivative = self.data.map(|x| sigmoid(-x));
        self.elementwise(data, derivative)
    }

    pub fn relu(&self) -> Self {
        let data = self.data.map(|x| x.max(T::zero()));
        let derivative = self
            .data
            .map(|x| if x > T::zero() { T::one() } else { T::zero() });
        self.elementwise(data, derivative)
    }

    pub fn tanh(&self) -> Self {
        let data = self.data.map(T::tanh);
        let derivative = data.map(|y| T::one() - y * y);
        self.elementwise(data, derivative)
    }

    fn softmax_impl(&self, kind: SoftmaxKind) -> Result<Self> {
        if RANK == 0 {
            return Err(TensorError::Unsupported("softmax of a scalar".into()));
        }
        let width = self.shape()[RANK - 1].max(1);
        let mut probs = self.data.clone();
        let mut log_probs = self.data.clone();
        for (p, l) in probs
            .data_mut()
            .chunks_mut(width)
            .zip(log_probs.data_mut().chunks_mut(width))
        {
            let max = p.iter().fold(T::neg_infinity(), |m, &v| m.max(v));
            let log_sum = p.iter().fold(T::zero(), |acc, &v| acc + (v - max).exp()).ln() + max;
            for (p, l) in p.iter_mut().zip(l.iter_mut()) {
                *l = *p - log_sum;
                *p = l.exp();
            }
        }

        let data = match kind {
            SoftmaxKind::Softmax => probs.clone(),
            SoftmaxKind::LogSoftmax => log_probs,
        };
        let out_grad = new_grad_cell();
        let node = Rc::new(SoftmaxNode {
            kind,
            probs,
            input_grad: self.grad.clone(),
            out_grad: out_grad.clone(),
            parents: parents_of(&[&self.node]),
        });
        Ok(Variable::with_node(data, out_grad, node))
    }

    /// Softmax over the last axis.
    pub fn softmax(&self) -> Result<Self> {
        self.softmax_impl(SoftmaxKind::Softmax)
    }

    /// Log-softmax over the last axis.
    pub fn log_softmax(&self) -> Result<Self> {
        self.softmax_impl(SoftmaxKind::LogSoftmax)
    }

    /// The `p`-norm of all elements, `(sum |x|^p)^(1/p)`. `p` must be at least 1.
    pub fn norm(&self, p: T) -> Result<Variable<T, 0>> {
        if p < T::one() {
            return Err(TensorError::Unsupported(format!(
                "norm order must be >= 1, got {p:?}"
            )));
        }
        let norm = self
            .data
            .data()
            .iter()
            .fold(T::zero(), |acc, &x| acc + x.abs().powf(p))
            .powf(T::one() / p);

        let out_grad = new_grad_cell();
        let node = Rc::new(NormNode {
            input: self.data.clone(),
            norm,
            p,
            input_grad: self.grad.clone(),
            out_grad: out_grad.clone(),
            parents: parents_of(&[&self.node]),
        });
        Ok(Variable::with_node(Tensor::full([], norm), out_grad, node))
    }
}

fn sigmoid<T: FloatElem>(x: T) -> T {
    if x >= T::zero() {
        T::one() / (T::one() + (-x).exp())
    } else {
        let e = x.exp();
        e / (T::one() + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var<const R: usize>(data: Vec<f64>, shape: [usize; R]) -> Variable<f64, R> {
        Variable::new(Tensor::new(data, shape).unwrap())
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_exp_log() {
        let x = var(vec![0.0, 1.0], [2]);
        let y = x.exp().log();
        assert_close(y.data.data(), &[0.0, 1.0]);
        y.sum_all().backward().unwrap();
        // log(exp(x)) = x
        assert_close(x.gradient().unwrap().data(), &[1.0, 1.0]);
    }

    #[test]
    fn test_sqrt() {
        let x = var(vec![4.0], [1]);
        let y = x.sqrt();
        y.backward().unwrap();
        assert_close(y.data.data(), &[2.0]);
        assert_close(x.gradient().unwrap().data(), &[0.25]);
    }

    #[test]
    fn test_sigmoid_and_log_sigmoid() {
        let x = var(vec![0.0, 2.0, -800.0], [3]);
        let s = x.sigmoid();
        assert_close(&s.data.data()[..1], &[0.5]);

        let ls = x.log_sigmoid();
        // log sigmoid(0) = -ln 2; stays finite at -800
        assert!((ls.data.data()[0] + std::f64::consts::LN_2).abs() < 1e-12);
        assert!((ls.data.data()[2] + 800.0).abs() < 1e-9);

        ls.sum_all().backward().unwrap();
        let g = x.gradient().unwrap();
        // d/dx log sigmoid(x) = 1 - sigmoid(x)
        assert!((g.data()[0] - 0.5).abs() < 1e-12);
        assert!((g.data()[1] - (1.0 - 1.0 / (1.0 + (-2.0f64).exp()))).abs() < 1e-12);
        assert!((g.data()[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_relu_tanh() {
        let x = var(vec![-1.0, 0.5], [2]);
        let r = x.relu();
        assert_close(r.data.data(), &[0.0, 0.5]);
        r.sum_all().backward().unwrap();
        assert_close(x.gradient().unwrap().data(), &[0.0, 1.0]);

        let z = var(vec![0.0], [1]);
        let t = z.tanh();
        t.backward().unwrap();
        assert_close(z.gradient().unwrap().data(), &[1.0]);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let x = var(vec![1.0, 2.0, 3.0, 1000.0, 1000.0, 1000.0], [2, 3]);
        let p = x.softmax().unwrap();
        for row in p.data.data().chunks(3) {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
        assert_close(&p.data.data()[3..], &[1.0 / 3.0; 3]);

        // sum of a softmax row is constant, so its gradient vanishes
        p.sum_all().backward().unwrap();
        assert_close(x.gradient().unwrap().data(), &[0.0; 6]);
    }

    #[test]
    fn test_softmax_gradient() {
        // y = softmax(x)[0] for x = [0, 0] -> p = [0.5, 0.5]
        // dy/dx0 = p0 (1 - p0) = 0.25, dy/dx1 = -p0 p1 = -0.25
        let x = var(vec![0.0, 0.0], [2]);
        let p = x.softmax().unwrap();
        let pick = var(vec![1.0, 0.0], [2]);
        (&p * &pick).unwrap().sum_all().backward().unwrap();
        assert_close(x.gradient().unwrap().data(), &[0.25, -0.25]);
    }

    #[test]
    fn test_log_softmax() {
        let x = var(vec![0.0, 0.0], [1, 2]);
        let l = x.log_softmax().unwrap();
        assert_close(l.data.data(), &[-std::f64::consts::LN_2; 2]);

        // y = log_softmax(x)[0]: dy/dx = onehot - p = [0.5, -0.5]
        let pick = var(vec![1.0, 0.0], [1, 2]);
        (&l * &pick).unwrap().sum_all().backward().unwrap();
        assert_close(x.gradient().unwrap().data(), &[0.5, -0.5]);
    }

    #[test]
    fn test_norm() {
        let x = var(vec![3.0, -4.0], [2]);
        let n = x.norm(2.0).unwrap();
        assert_close(n.data.data(), &[5.0]);
        n.backward().unwrap();
        // x / ||x||
        assert_close(x.gradient().unwrap().data(), &[0.6, -0.8]);

        let l1 = var(vec![3.0, -4.0], [2]);
        let n1 = l1.norm(1.0).unwrap();
        assert_close(n1.data.data(), &[7.0]);
        n1.backward().unwrap();
        assert_close(l1.gradient().unwrap().data(), &[1.0, -1.0]);

        let zero = var(vec![0.0, 0.0], [2]);
        let nz = zero.norm(2.0).unwrap();
        nz.backward().unwrap();
        assert_close(zero.gradient().unwrap().data(), &[0.0, 0.0]);

        assert!(x.norm(0.5).is_err());
    }
}
