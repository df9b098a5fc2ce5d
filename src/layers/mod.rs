//! Feature-interaction layers.
//!
//! | layer | in | out |
//! |---|---|---|
//! | [`DnnLayer`] | `(B, I)` | `(B, O)` |
//! | [`FmLayer`] | `(B, N, E)` | `(B, E)` |
//! | [`FfmLayer`] | `(B, N * N, E)` | `(B, NC2, E)` |
//! | [`MixtureOfExpertsLayer`] | `(B, N, E)` | `(B, G, O)` |
//!
//! Every layer is built from a serde config (`*Config`) that is validated on construction.

pub mod dnn;
pub mod ffm;
pub mod fm;
pub mod mixture_of_experts;

pub use dnn::{DnnConfig, DnnLayer};
pub use ffm::{FfmConfig, FfmLayer};
pub use fm::{FmConfig, FmLayer};
pub use mixture_of_experts::{MixtureOfExpertsLayer, MoeConfig};

use crate::autograd::Variable;
use crate::error::{Error, Result};
use crate::nn::Module;
use crate::tensor::FloatElem;

/// A sub-model usable inside a [`MixtureOfExpertsLayer`].
pub trait Expert<T: FloatElem>: Module<T> {
    /// `(B, inputs_size) -> (B, output_size)`.
    fn forward(&self, inputs: &Variable<T, 2>) -> Result<Variable<T, 2>>;

    fn output_size(&self) -> usize;
}

pub(crate) fn check_dropout(p: f64) -> Result<()> {
    if (0.0..1.0).contains(&p) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "dropout probability must be in [0, 1), got {p}"
        )))
    }
}
