use super::functional::listnet_loss;
use super::RankingLoss;
use crate::autograd::Variable;
use crate::error::Result;
use crate::losses::Reduction;
use crate::tensor::FloatElem;
use serde::{Deserialize, Serialize};

/// ListNet top-one probability loss (Cao et al., 2007). Each row of the inputs is one group
/// (e.g. the candidate list of one query).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ListnetLoss {
    #[serde(default)]
    pub reduction: Reduction,
}

impl ListnetLoss {
    pub fn new(reduction: Reduction) -> Self {
        Self { reduction }
    }
}

impl<T: FloatElem> RankingLoss<T> for ListnetLoss {
    fn forward(&self, y_pred: &Variable<T, 2>, y_true: &Variable<T, 2>) -> Result<Variable<T, 0>> {
        self.reduction.reduce(&listnet_loss(y_pred, y_true)?)
    }
}
