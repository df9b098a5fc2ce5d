//! Gradient-descent optimizers over [`Module`](crate::nn::Module) parameters.

pub mod adamw;
pub mod sgd;

pub use adamw::AdamW;
pub use sgd::Sgd;

use crate::error::Result;
use crate::nn::Parameter;
use crate::tensor::{FloatElem, TensorError};

/// Updates parameters from their accumulated gradients.
///
/// Parameters are passed by name (as returned by
/// [`Module::named_parameters_mut`](crate::nn::Module::named_parameters_mut)), so stateful
/// optimizers can track per-parameter statistics across steps. Parameters that received no
/// gradient are left untouched.
pub trait Optimizer<T: FloatElem> {
    fn step(&mut self, params: Vec<(String, &mut dyn Parameter<T>)>) -> Result<()>;
}

/// The gradient of `param`, checked against its size.
pub(crate) fn gradient_of<T: FloatElem>(name: &str, param: &dyn Parameter<T>) -> Result<Option<Vec<T>>> {
    let Some(grad) = param.grad_values() else {
        tracing::trace!(param = name, "no gradient, skipping");
        return Ok(None);
    };
    if grad.len() != param.numel() {
        return Err(TensorError::ShapeMismatch {
            expected: param.shape(),
            got: vec![grad.len()],
        }
        .into());
    }
    Ok(Some(grad))
}
