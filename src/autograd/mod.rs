//! Tape-free reverse-mode automatic differentiation.
//!
//! Every differentiable operation on a [`Variable`] allocates a [`GraphNode`] that remembers
//! what it needs for the backward pass and holds the gradient cells of its inputs. Calling
//! [`Variable::backward`] walks the nodes reachable from the output in reverse topological
//! order (see [`engine`]) and accumulates gradients into those cells.
//!
//! Leaf variables (parameters, inputs) have no node; their gradient cell is shared with the
//! nodes that consumed them.

use crate::tensor::{Cpu, Result, Tensor, TensorElem};
use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

pub mod engine;
pub mod functional;
pub mod ops;
pub mod shape;
pub mod unary;

/// Shared, lazily-initialised gradient slot.
pub type GradCell<T, const RANK: usize> = Rc<RefCell<Option<Tensor<T, RANK, Cpu>>>>;

pub trait GraphNode: Debug {
    /// Reads this node's output gradient and accumulates into the input gradients.
    fn backward(&self) -> Result<()>;
    fn parents(&self) -> Vec<Rc<dyn GraphNode>>;
    /// Drops the gradient collected for this node's output by an earlier pass.
    fn clear_grad(&self);
}

#[derive(Clone, Debug)]
pub struct Variable<T, const RANK: usize>
where
    T: TensorElem,
{
    pub data: Tensor<T, RANK, Cpu>,
    pub grad: GradCell<T, RANK>,
    pub node: Option<Rc<dyn GraphNode>>,
}

impl<T, const RANK: usize> Variable<T, RANK>
where
    T: TensorElem + 'static,
{
    pub fn new(data: Tensor<T, RANK, Cpu>) -> Self {
        Self {
            data,
            grad: Rc::new(RefCell::new(None)),
            node: None,
        }
    }

    /// Wraps the output of an operation. `grad` must be the cell the node reads from.
    pub fn with_node(data: Tensor<T, RANK, Cpu>, grad: GradCell<T, RANK>, node: Rc<dyn GraphNode>) -> Self {
        Self {
            data,
            grad,
            node: Some(node),
        }
    }

    pub fn shape(&self) -> &[usize; RANK] {
        self.data.shape()
    }

    /// Copy of the accumulated gradient, if any has reached this variable.
    pub fn gradient(&self) -> Option<Tensor<T, RANK, Cpu>> {
        self.grad.borrow().clone()
    }

    pub fn zero_grad(&self) {
        *self.grad.borrow_mut() = None;
    }

    /// A new leaf holding the same values, cut off from the graph.
    pub fn detach(&self) -> Self {
        Self::new(self.data.clone())
    }

    /// Back-propagates from this variable, seeding its gradient with ones.
    ///
    /// Intermediate gradients are recomputed on every call; only leaves accumulate across
    /// calls.
    pub fn backward(&self) -> Result<()> {
        let seed = Tensor::ones(*self.data.shape());
        match &self.node {
            Some(root) => engine::backward(root.clone(), || *self.grad.borrow_mut() = Some(seed)),
            None => {
                accumulate(&self.grad, seed);
                Ok(())
            }
        }
    }
}

/// Adds `delta` into a gradient cell, initialising it on first use.
///
/// Callers guarantee that `delta` has the cell's shape.
pub(crate) fn accumulate<T: TensorElem, const RANK: usize>(
    cell: &GradCell<T, RANK>,
    delta: Tensor<T, RANK, Cpu>,
) {
    let mut slot = cell.borrow_mut();
    match slot.as_mut() {
        Some(g) => g
            .data_mut()
            .iter_mut()
            .zip(delta.data())
            .for_each(|(a, b)| *a += *b),
        None => *slot = Some(delta),
    }
}

/// The creator nodes of a set of operands. Leaves contribute nothing.
pub(crate) fn parents_of(nodes: &[&Option<Rc<dyn GraphNode>>]) -> Vec<Rc<dyn GraphNode>> {
    nodes.iter().filter_map(|n| (*n).clone()).collect()
}

/// Creates the output gradient cell and the `Variable` for a freshly built node.
pub(crate) fn new_grad_cell<T: TensorElem, const RANK: usize>() -> GradCell<T, RANK> {
    Rc::new(RefCell::new(None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_variable() {
        let v = Variable::new(Tensor::<f32, 1>::new(vec![1.0, 2.0], [2]).unwrap());
        assert_eq!(v.shape(), &[2]);
        assert!(v.gradient().is_none());

        // A leaf seeds its own gradient.
        v.backward().unwrap();
        assert_eq!(v.gradient().unwrap().data(), &[1.0, 1.0]);

        v.zero_grad();
        assert!(v.gradient().is_none());
    }

    #[test]
    fn test_accumulate() {
        let cell: GradCell<f32, 1> = new_grad_cell();
        accumulate(&cell, Tensor::new(vec![1.0, 2.0], [2]).unwrap());
        accumulate(&cell, Tensor::new(vec![0.5, 0.5], [2]).unwrap());
        assert_eq!(cell.borrow().as_ref().unwrap().data(), &[1.5, 2.5]);
    }

    #[test]
    fn test_detach_cuts_graph() {
        let x = Variable::new(Tensor::<f32, 1>::new(vec![3.0], [1]).unwrap());
        let y = (&x * &x).unwrap();
        let d = y.detach();
        assert!(d.node.is_none());
        assert_eq!(d.data.data(), &[9.0]);

        let z = (&d * &x).unwrap();
        z.backward().unwrap();
        // only the direct path through x: dz/dx = d = 9
        assert_eq!(x.gradient().unwrap().data(), &[9.0]);
    }
}
