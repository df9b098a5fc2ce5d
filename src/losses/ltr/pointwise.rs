use super::functional::pointwise_logistic_ranking_loss;
use super::RankingLoss;
use crate::autograd::Variable;
use crate::error::Result;
use crate::losses::Reduction;
use crate::tensor::FloatElem;
use serde::{Deserialize, Serialize};

/// Logistic loss treating the positive and each negative as independent binary labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointwiseLogisticLoss {
    #[serde(default)]
    pub reduction: Reduction,
}

impl PointwiseLogisticLoss {
    pub fn new(reduction: Reduction) -> Self {
        Self { reduction }
    }
}

impl<T: FloatElem> RankingLoss<T> for PointwiseLogisticLoss {
    fn forward(&self, pos: &Variable<T, 2>, neg: &Variable<T, 2>) -> Result<Variable<T, 0>> {
        self.reduction.reduce(&pointwise_logistic_ranking_loss(pos, neg)?)
    }
}
