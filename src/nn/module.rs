use crate::autograd::Variable;
use crate::tensor::{Result, TensorElem};
use std::fmt::Debug;

/// A trainable tensor with its rank erased, so modules can expose heterogeneous parameters
/// through one list.
pub trait Parameter<T: TensorElem + 'static>: Debug {
    fn shape(&self) -> Vec<usize>;

    fn values(&self) -> &[T];

    fn values_mut(&mut self) -> &mut [T];

    /// Flat copy of the accumulated gradient, `None` if nothing has been back-propagated.
    fn grad_values(&self) -> Option<Vec<T>>;

    fn zero_grad(&self);

    /// A differentiable rank-1 view; gradients flow back into this parameter.
    fn flatten(&self) -> Result<Variable<T, 1>>;

    fn numel(&self) -> usize {
        self.values().len()
    }
}

impl<T: TensorElem + 'static, const RANK: usize> Parameter<T> for Variable<T, RANK> {
    fn shape(&self) -> Vec<usize> {
        self.data.shape().to_vec()
    }

    fn values(&self) -> &[T] {
        self.data.data()
    }

    fn values_mut(&mut self) -> &mut [T] {
        self.data.data_mut()
    }

    fn grad_values(&self) -> Option<Vec<T>> {
        self.grad.borrow().as_ref().map(|g| g.data().to_vec())
    }

    fn zero_grad(&self) {
        Variable::zero_grad(self)
    }

    fn flatten(&self) -> Result<Variable<T, 1>> {
        self.reshape([self.data.size()])
    }
}

/// A layer or model owning parameters.
///
/// Parameter names are dotted paths (`deep.hidden.0.weight`); composite modules build them
/// with [`prefixed`].
pub trait Module<T: TensorElem + 'static>: Debug {
    fn named_parameters(&self) -> Vec<(String, &dyn Parameter<T>)>;

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut dyn Parameter<T>)>;

    /// Switches between training and evaluation behaviour (dropout).
    fn set_training(&mut self, _training: bool) {}

    fn zero_grad(&self) {
        for (_, p) in self.named_parameters() {
            p.zero_grad();
        }
    }

    fn num_parameters(&self) -> usize {
        self.named_parameters().iter().map(|(_, p)| p.numel()).sum()
    }
}

/// Prepends `prefix.` to every name.
pub fn prefixed<P>(prefix: &str, params: Vec<(String, P)>) -> Vec<(String, P)> {
    params
        .into_iter()
        .map(|(name, p)| (format!("{prefix}.{name}"), p))
        .collect()
}
