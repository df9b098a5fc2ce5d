//! Training objectives.
//!
//! [`ltr`] holds learning-to-rank losses, both as functions returning per-sample values and as
//! [`RankingLoss`](ltr::RankingLoss) structs that reduce them to a scalar.

pub mod ltr;

pub use ltr::{
    AdaptiveHingeLoss, BayesianPersonalizedRankingLoss, HingeLoss, ListnetLoss, PointwiseLogisticLoss,
    RankingLoss,
};

use crate::autograd::Variable;
use crate::error::Result;
use crate::tensor::FloatElem;
use serde::{Deserialize, Serialize};

/// How per-sample losses are folded into one scalar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    #[default]
    Mean,
    Sum,
}

impl Reduction {
    pub fn reduce<T: FloatElem, const RANK: usize>(&self, losses: &Variable<T, RANK>) -> Result<Variable<T, 0>> {
        Ok(match self {
            Reduction::Mean => losses.mean_all()?,
            Reduction::Sum => losses.sum_all(),
        })
    }
}
