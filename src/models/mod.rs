//! End-to-end click-through-rate models.
//!
//! A model consumes already embedded inputs (see [`crate::inputs`]) and returns one logit per
//! sample; pair it with a sigmoid-based loss or ranking loss from [`crate::losses`].

pub mod deep_ffm;

pub use deep_ffm::{DeepFfmConfig, DeepFieldAwareFactorizationMachineModel};

use crate::autograd::Variable;
use crate::error::Result;
use crate::nn::Module;
use crate::tensor::FloatElem;

/// A click-through-rate model producing `(B, 1)` logits.
pub trait CtrModel<T: FloatElem>: Module<T> {
    fn forward(&self, inputs: &Variable<T, 3>) -> Result<Variable<T, 2>>;
}
