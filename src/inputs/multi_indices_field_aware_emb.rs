use super::Inputs;
use crate::autograd::Variable;
use crate::error::{Error, Result};
use crate::nn::{init, prefixed, Embedding, Module, Parameter};
use crate::tensor::{Axis, FloatElem, Tensor, TensorError};
use rand::Rng;
use tracing::debug;

/// Field-aware embedding for FFM-style models.
///
/// Every one of the `N` fields owns a full table covering all fields' vocabularies
/// (`sum(field_sizes)` rows). Raw per-field ids are shifted by the field's offset into that
/// shared index space, then looked up in every table:
///
/// `(B, N) -> (B, N * N, E)`, where output row `i * N + j` is table `i`'s vector for the
/// feature of field `j`.
#[derive(Debug)]
pub struct MultiIndicesFieldAwareEmbedding<T: FloatElem> {
    embeddings: Vec<Embedding<T>>,
    field_sizes: Vec<usize>,
    offsets: Vec<usize>,
    embed_size: usize,
}

impl<T: FloatElem> MultiIndicesFieldAwareEmbedding<T> {
    pub fn new<R: Rng + ?Sized>(embed_size: usize, field_sizes: &[usize], rng: &mut R) -> Result<Self> {
        if embed_size == 0 {
            return Err(Error::InvalidConfig("embed_size must be positive".into()));
        }
        if field_sizes.is_empty() || field_sizes.contains(&0) {
            return Err(Error::InvalidConfig(format!(
                "field_sizes must be non-empty and positive, got {field_sizes:?}"
            )));
        }

        let total: usize = field_sizes.iter().sum();
        let offsets: Vec<usize> = field_sizes
            .iter()
            .scan(0, |acc, &size| {
                let offset = *acc;
                *acc += size;
                Some(offset)
            })
            .collect();

        let embeddings = (0..field_sizes.len())
            .map(|_| Embedding::from_weight(init::xavier_uniform([total, embed_size], rng), None, false))
            .collect::<std::result::Result<Vec<_>, TensorError>>()?;

        debug!(
            num_fields = field_sizes.len(),
            rows_per_table = total,
            embed_size,
            "built field-aware embedding"
        );
        Ok(Self {
            embeddings,
            field_sizes: field_sizes.to_vec(),
            offsets,
            embed_size,
        })
    }

    pub fn num_fields(&self) -> usize {
        self.field_sizes.len()
    }

    /// Start of each field's block in the shared index space: `[0, cumsum(field_sizes)[:-1]]`.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn tables(&self) -> &[Embedding<T>] {
        &self.embeddings
    }

    pub fn forward(&self, inputs: &Tensor<usize, 2>) -> Result<Variable<T, 3>> {
        let num_fields = self.num_fields();
        let shape = inputs.named([Axis::Batch, Axis::Field])?;
        shape.expect(Axis::Field, num_fields)?;
        let batch = shape.size(Axis::Batch)?;

        let mut shifted = Vec::with_capacity(inputs.size());
        for (pos, &id) in inputs.data().iter().enumerate() {
            let field = pos % num_fields;
            if id >= self.field_sizes[field] {
                return Err(TensorError::IndexOutOfBounds {
                    index: vec![pos / num_fields, field, id],
                    shape: vec![batch, num_fields, self.field_sizes[field]],
                }
                .into());
            }
            shifted.push(id + self.offsets[field]);
        }

        let per_table = self
            .embeddings
            .iter()
            .map(|table| table.lookup(&shifted, [batch, num_fields]))
            .collect::<std::result::Result<Vec<_>, TensorError>>()?;
        Ok(Variable::concat(&per_table, 1)?)
    }
}

impl<T: FloatElem> Inputs for MultiIndicesFieldAwareEmbedding<T> {
    fn length(&self) -> usize {
        self.embed_size
    }
}

impl<T: FloatElem> Module<T> for MultiIndicesFieldAwareEmbedding<T> {
    fn named_parameters(&self) -> Vec<(String, &dyn Parameter<T>)> {
        self.embeddings
            .iter()
            .enumerate()
            .flat_map(|(i, e)| prefixed(&format!("embeddings.{i}"), e.named_parameters()))
            .collect()
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut dyn Parameter<T>)> {
        self.embeddings
            .iter_mut()
            .enumerate()
            .flat_map(|(i, e)| prefixed(&format!("embeddings.{i}"), e.named_parameters_mut()))
            .collect()
    }
}
