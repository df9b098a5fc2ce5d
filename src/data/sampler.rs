//! Negative sampling for ranking objectives.

use crate::error::{Error, Result};
use crate::tensor::Tensor;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

/// Draws `k` negative item ids for every sample of a batch.
pub trait NegativeSampler {
    /// Size of the item vocabulary; every drawn id is below it.
    fn num_items(&self) -> usize;

    /// `(batch, k)` item ids, drawn with replacement.
    fn sample<R: Rng + ?Sized>(&self, batch: usize, k: usize, rng: &mut R) -> Tensor<usize, 2>;
}

/// Every item equally likely.
#[derive(Debug, Clone)]
pub struct UniformSampler {
    num_items: usize,
}

impl UniformSampler {
    pub fn new(num_items: usize) -> Result<Self> {
        if num_items == 0 {
            return Err(Error::InvalidConfig("cannot sample from zero items".into()));
        }
        Ok(Self { num_items })
    }
}

impl NegativeSampler for UniformSampler {
    fn num_items(&self) -> usize {
        self.num_items
    }

    fn sample<R: Rng + ?Sized>(&self, batch: usize, k: usize, rng: &mut R) -> Tensor<usize, 2> {
        Tensor::from_fn([batch, k], |_| rng.random_range(0..self.num_items))
    }
}

/// Items drawn proportionally to non-negative weights, e.g. popularity counts.
#[derive(Debug, Clone)]
pub struct MultinomialSampler {
    distribution: WeightedIndex<f64>,
    num_items: usize,
}

impl MultinomialSampler {
    /// # Errors
    ///
    /// `InvalidConfig` if `weights` is empty, contains a negative or non-finite value, or sums
    /// to zero.
    pub fn new(weights: &[f64]) -> Result<Self> {
        let distribution = WeightedIndex::new(weights)
            .map_err(|e| Error::InvalidConfig(format!("invalid sampling weights: {e}")))?;
        Ok(Self {
            distribution,
            num_items: weights.len(),
        })
    }

    /// Popularity-smoothed weights `count^power`; `power = 0.75` is the usual word2vec choice.
    /// Items with a zero count are never drawn, whatever the power.
    pub fn from_counts(counts: &[usize], power: f64) -> Result<Self> {
        let weights: Vec<f64> = counts
            .iter()
            .map(|&c| if c == 0 { 0.0 } else { (c as f64).powf(power) })
            .collect();
        Self::new(&weights)
    }
}

impl NegativeSampler for MultinomialSampler {
    fn num_items(&self) -> usize {
        self.num_items
    }

    fn sample<R: Rng + ?Sized>(&self, batch: usize, k: usize, rng: &mut R) -> Tensor<usize, 2> {
        Tensor::from_fn([batch, k], |_| self.distribution.sample(rng))
    }
}
