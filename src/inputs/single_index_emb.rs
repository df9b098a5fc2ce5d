use super::Inputs;
use crate::autograd::Variable;
use crate::error::{Error, Result};
use crate::nn::{Embedding, Module, Parameter};
use crate::tensor::{Axis, FloatElem, Tensor};
use rand::Rng;

/// Embeds a single categorical id per row: `(B, 1) -> (B, 1, E)`.
#[derive(Debug)]
pub struct SingleIndexEmbedding<T: FloatElem> {
    embedding: Embedding<T>,
}

impl<T: FloatElem> SingleIndexEmbedding<T> {
    /// A fresh `field_size x embed_size` table.
    pub fn new<R: Rng + ?Sized>(
        embed_size: usize,
        field_size: usize,
        padding_idx: Option<usize>,
        rng: &mut R,
    ) -> Result<Self> {
        if embed_size == 0 || field_size == 0 {
            return Err(Error::InvalidConfig(format!(
                "embed_size and field_size must be positive, got {embed_size} and {field_size}"
            )));
        }
        Ok(Self {
            embedding: Embedding::new(field_size, embed_size, padding_idx, rng)?,
        })
    }

    /// Uses `weight` (`[field_size, E]`) as the table; `E` then defines [`Inputs::length`].
    pub fn from_pretrained(weight: Tensor<T, 2>, freeze: bool, padding_idx: Option<usize>) -> Result<Self> {
        Ok(Self {
            embedding: Embedding::from_pretrained(weight, freeze, padding_idx)?,
        })
    }

    pub fn field_size(&self) -> usize {
        self.embedding.num_embeddings()
    }

    pub fn embedding(&self) -> &Embedding<T> {
        &self.embedding
    }

    pub fn forward(&self, inputs: &Tensor<usize, 2>) -> Result<Variable<T, 3>> {
        inputs
            .named([Axis::Batch, Axis::Length])?
            .expect(Axis::Length, 1)?;
        Ok(self.embedding.forward(inputs)?)
    }
}

impl<T: FloatElem> Inputs for SingleIndexEmbedding<T> {
    fn length(&self) -> usize {
        self.embedding.embedding_dim()
    }
}

impl<T: FloatElem> Module<T> for SingleIndexEmbedding<T> {
    fn named_parameters(&self) -> Vec<(String, &dyn Parameter<T>)> {
        crate::nn::prefixed("embedding", self.embedding.named_parameters())
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut dyn Parameter<T>)> {
        crate::nn::prefixed("embedding", self.embedding.named_parameters_mut())
    }
}
