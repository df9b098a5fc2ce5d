use super::check_dropout;
use crate::autograd::Variable;
use crate::error::Result;
use crate::nn::{Dropout, Module, Parameter};
use crate::tensor::{Axis, FloatElem};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FmConfig {
    pub dropout_p: f64,
}

impl FmConfig {
    pub fn with_dropout(mut self, dropout_p: f64) -> Self {
        self.dropout_p = dropout_p;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_dropout(self.dropout_p)
    }
}

/// Second-order factorization machine term.
///
/// Uses the linear-time identity
/// `sum_{i<j} <v_i, v_j> = 0.5 * ((sum_i v_i)^2 - sum_i v_i^2)`, evaluated per embedding
/// component, followed by dropout:
///
/// `(B, N, E) -> (B, E)`
#[derive(Debug)]
pub struct FmLayer {
    dropout: Dropout,
}

impl FmLayer {
    pub fn new<R: Rng + ?Sized>(config: &FmConfig, rng: &mut R) -> Result<Self> {
        Ok(Self {
            dropout: Dropout::seeded(config.dropout_p, rng.random())?,
        })
    }

    pub fn forward<T: FloatElem>(&self, emb_inputs: &Variable<T, 3>) -> Result<Variable<T, 2>> {
        let shape = emb_inputs.data.named([Axis::Batch, Axis::Field, Axis::Embed])?;
        let batch = shape.size(Axis::Batch)?;
        let embed = shape.size(Axis::Embed)?;

        let sum = emb_inputs.sum_axis(1)?;
        let square_of_sum = (&sum * &sum)?;
        let sum_of_square = (emb_inputs * emb_inputs)?.sum_axis(1)?;
        let half = T::from_f64(0.5).unwrap_or_else(T::one);
        let outputs = (&square_of_sum - &sum_of_square)?
            .scale(half)
            .reshape([batch, embed])?;
        self.dropout.forward(&outputs)
    }
}

impl<T: FloatElem> Module<T> for FmLayer {
    fn named_parameters(&self) -> Vec<(String, &dyn Parameter<T>)> {
        Vec::new()
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut dyn Parameter<T>)> {
        Vec::new()
    }

    fn set_training(&mut self, training: bool) {
        self.dropout.set_training(training);
    }
}
