use crate::autograd::Variable;
use crate::nn::{init, Module, Parameter};
use crate::tensor::{FloatElem, Result, Tensor, TensorElem, TensorError};
use rand::Rng;

/// A lookup table from token ids to dense vectors.
///
/// `weight` has shape `[num_embeddings, embedding_dim]`. The optional `padding_idx` row starts
/// at zero and never receives gradient. A frozen table reports no parameters, so optimizers
/// and checkpoints leave it untouched.
#[derive(Debug)]
pub struct Embedding<T: TensorElem> {
    pub weight: Variable<T, 2>,
    padding_idx: Option<usize>,
    frozen: bool,
}

impl<T: FloatElem> Embedding<T> {
    /// Randomly initialised table, entries drawn from `N(0, 1)`.
    pub fn new<R: Rng + ?Sized>(
        num_embeddings: usize,
        embedding_dim: usize,
        padding_idx: Option<usize>,
        rng: &mut R,
    ) -> Result<Self> {
        let weight = init::normal([num_embeddings, embedding_dim], 0.0, 1.0, rng);
        Self::from_weight(weight, padding_idx, false)
    }

    /// Wraps an existing table (e.g. pretrained vectors).
    pub fn from_pretrained(weight: Tensor<T, 2>, freeze: bool, padding_idx: Option<usize>) -> Result<Self> {
        Self::from_weight(weight, padding_idx, freeze)
    }

    pub(crate) fn from_weight(mut weight: Tensor<T, 2>, padding_idx: Option<usize>, frozen: bool) -> Result<Self> {
        let [rows, dim] = *weight.shape();
        if let Some(p) = padding_idx {
            if p >= rows {
                return Err(TensorError::IndexOutOfBounds {
                    index: vec![p],
                    shape: vec![rows, dim],
                });
            }
            if !frozen {
                weight.data_mut()[p * dim..(p + 1) * dim].fill(T::zero());
            }
        }
        Ok(Self {
            weight: Variable::new(weight),
            padding_idx,
            frozen,
        })
    }

    pub fn num_embeddings(&self) -> usize {
        self.weight.shape()[0]
    }

    pub fn embedding_dim(&self) -> usize {
        self.weight.shape()[1]
    }

    pub fn padding_idx(&self) -> Option<usize> {
        self.padding_idx
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Looks up `ids` of shape `[B, L]`, returning `[B, L, embedding_dim]`.
    ///
    /// # Errors
    ///
    /// `IndexOutOfBounds` if an id is not below `num_embeddings`.
    pub fn forward(&self, ids: &Tensor<usize, 2>) -> Result<Variable<T, 3>> {
        self.lookup(ids.data(), *ids.shape())
    }

    /// Looks up a flat list of ids and arranges the rows as `[shape[0], shape[1], E]`.
    pub(crate) fn lookup(&self, ids: &[usize], shape: [usize; 2]) -> Result<Variable<T, 3>> {
        let table = if self.frozen {
            self.weight.detach()
        } else {
            self.weight.clone()
        };
        let rows = table.index_select_skipping(0, ids, self.padding_idx)?;
        rows.reshape([shape[0], shape[1], self.embedding_dim()])
    }
}

impl<T: FloatElem> Module<T> for Embedding<T> {
    fn named_parameters(&self) -> Vec<(String, &dyn Parameter<T>)> {
        let mut params: Vec<(String, &dyn Parameter<T>)> = Vec::new();
        if !self.frozen {
            params.push(("weight".into(), &self.weight));
        }
        params
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut dyn Parameter<T>)> {
        let mut params: Vec<(String, &mut dyn Parameter<T>)> = Vec::new();
        if !self.frozen {
            params.push(("weight".into(), &mut self.weight));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn table() -> Tensor<f32, 2> {
        // row i = [i, 10 i]
        Tensor::new(vec![0.0, 0.0, 1.0, 10.0, 2.0, 20.0], [3, 2]).unwrap()
    }

    #[test]
    fn test_lookup() {
        let emb = Embedding::from_pretrained(table(), false, None).unwrap();
        let ids = Tensor::new(vec![2, 1, 1, 0], [2, 2]).unwrap();
        let out = emb.forward(&ids).unwrap();
        assert_eq!(out.shape(), &[2, 2, 2]);
        assert_eq!(out.data.data(), &[2.0, 20.0, 1.0, 10.0, 1.0, 10.0, 0.0, 0.0]);

        out.sum_all().backward().unwrap();
        // row 1 looked up twice
        assert_eq!(
            emb.weight.gradient().unwrap().data(),
            &[1.0, 1.0, 2.0, 2.0, 1.0, 1.0]
        );
    }

    #[test]
    fn test_out_of_range_id() {
        let emb = Embedding::from_pretrained(table(), false, None).unwrap();
        let ids = Tensor::new(vec![3], [1, 1]).unwrap();
        assert!(matches!(
            emb.forward(&ids),
            Err(TensorError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_padding_row() {
        let mut rng = StdRng::seed_from_u64(0);
        let emb = Embedding::<f32>::new(4, 3, Some(1), &mut rng).unwrap();
        assert_eq!(&emb.weight.data.data()[3..6], &[0.0; 3]);

        let ids = Tensor::new(vec![1, 2], [1, 2]).unwrap();
        emb.forward(&ids).unwrap().sum_all().backward().unwrap();
        let g = emb.weight.gradient().unwrap();
        assert_eq!(&g.data()[3..6], &[0.0; 3]);
        assert_eq!(&g.data()[6..9], &[1.0; 3]);

        assert!(Embedding::<f32>::new(4, 3, Some(4), &mut rng).is_err());
    }

    #[test]
    fn test_frozen_table() {
        let emb = Embedding::from_pretrained(table(), true, None).unwrap();
        assert!(emb.is_frozen());
        assert!(emb.named_parameters().is_empty());

        let ids = Tensor::new(vec![1], [1, 1]).unwrap();
        emb.forward(&ids).unwrap().sum_all().backward().unwrap();
        assert!(emb.weight.gradient().is_none());
    }
}
