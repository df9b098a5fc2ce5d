use super::check_dropout;
use crate::autograd::Variable;
use crate::error::{Error, Result};
use crate::nn::{Dropout, Module, Parameter};
use crate::tensor::{Axis, FloatElem};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FfmConfig {
    pub num_fields: usize,
    #[serde(default)]
    pub dropout_p: f64,
}

impl FfmConfig {
    pub fn new(num_fields: usize) -> Self {
        Self {
            num_fields,
            dropout_p: 0.0,
        }
    }

    pub fn with_dropout(mut self, dropout_p: f64) -> Self {
        self.dropout_p = dropout_p;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_fields < 2 {
            return Err(Error::InvalidConfig(format!(
                "field-aware interactions need at least 2 fields, got {}",
                self.num_fields
            )));
        }
        check_dropout(self.dropout_p)
    }
}

/// Field-aware factorization machine interactions.
///
/// Takes field-aware embeddings laid out as produced by
/// [`MultiIndicesFieldAwareEmbedding`](crate::inputs::MultiIndicesFieldAwareEmbedding), where
/// row `i * N + j` is field `j` embedded for interacting with field `i`, and returns the
/// element-wise products `v[i * N + j] * v[j * N + i]` for every pair `i < j`:
///
/// `(B, N * N, E) -> (B, NC2, E)`
#[derive(Debug)]
pub struct FfmLayer {
    num_fields: usize,
    left: Vec<usize>,
    right: Vec<usize>,
    dropout: Dropout,
}

impl FfmLayer {
    pub fn new<R: Rng + ?Sized>(config: &FfmConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let n = config.num_fields;
        let (left, right): (Vec<usize>, Vec<usize>) = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i * n + j, j * n + i)))
            .unzip();

        debug!(num_fields = n, pairs = left.len(), "built ffm layer");
        Ok(Self {
            num_fields: n,
            left,
            right,
            dropout: Dropout::seeded(config.dropout_p, rng.random())?,
        })
    }

    pub fn num_fields(&self) -> usize {
        self.num_fields
    }

    pub fn forward<T: FloatElem>(&self, field_emb_inputs: &Variable<T, 3>) -> Result<Variable<T, 3>> {
        field_emb_inputs
            .data
            .named([Axis::Batch, Axis::Field, Axis::Embed])?
            .expect(Axis::Field, self.num_fields * self.num_fields)?;

        let lhs = field_emb_inputs.index_select(1, &self.left)?;
        let rhs = field_emb_inputs.index_select(1, &self.right)?;
        self.dropout.forward(&(&lhs * &rhs)?)
    }
}

impl<T: FloatElem> Module<T> for FfmLayer {
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
