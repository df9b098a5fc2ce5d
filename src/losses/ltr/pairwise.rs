use super::functional::{adaptive_hinge_loss, bayesian_personalized_ranking_loss, hinge_loss};
use super::RankingLoss;
use crate::autograd::Variable;
use crate::error::Result;
use crate::losses::Reduction;
use crate::tensor::FloatElem;
use serde::{Deserialize, Serialize};

fn default_margin() -> f64 {
    1.0
}

/// Bayesian personalized ranking (Rendle et al., 2009).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BayesianPersonalizedRankingLoss {
    #[serde(default)]
    pub reduction: Reduction,
}

impl BayesianPersonalizedRankingLoss {
    pub fn new(reduction: Reduction) -> Self {
        Self { reduction }
    }
}

impl<T: FloatElem> RankingLoss<T> for BayesianPersonalizedRankingLoss {
    fn forward(&self, pos: &Variable<T, 2>, neg: &Variable<T, 2>) -> Result<Variable<T, 0>> {
        self.reduction.reduce(&bayesian_personalized_ranking_loss(pos, neg)?)
    }
}

/// Margin ranking loss summed over all negatives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HingeLoss {
    #[serde(default = "default_margin")]
    pub margin: f64,
    #[serde(default)]
    pub reduction: Reduction,
}

impl Default for HingeLoss {
    fn default() -> Self {
        Self {
            margin: default_margin(),
            reduction: Reduction::Mean,
        }
    }
}

impl HingeLoss {
    pub fn new(margin: f64, reduction: Reduction) -> Self {
        Self { margin, reduction }
    }
}

impl<T: FloatElem> RankingLoss<T> for HingeLoss {
    fn forward(&self, pos: &Variable<T, 2>, neg: &Variable<T, 2>) -> Result<Variable<T, 0>> {
        self.reduction.reduce(&hinge_loss(pos, neg, self.margin)?)
    }
}

/// Margin ranking loss against the highest-scored negative (Weston et al., 2011).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveHingeLoss {
    #[serde(default = "default_margin")]
    pub margin: f64,
    #[serde(default)]
    pub reduction: Reduction,
}

impl Default for AdaptiveHingeLoss {
    fn default() -> Self {
        Self {
            margin: default_margin(),
            reduction: Reduction::Mean,
        }
    }
}

impl AdaptiveHingeLoss {
    pub fn new(margin: f64, reduction: Reduction) -> Self {
        Self { margin, reduction }
    }
}

impl<T: FloatElem> RankingLoss<T> for AdaptiveHingeLoss {
    fn forward(&self, pos: &Variable<T, 2>, neg: &Variable<T, 2>) -> Result<Variable<T, 0>> {
        self.reduction.reduce(&adaptive_hinge_loss(pos, neg, self.margin)?)
    }
}
