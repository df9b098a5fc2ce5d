//! Learning-to-rank losses.
//!
//! | loss | kind | per-sample value |
//! |---|---|---|
//! | [`PointwiseLogisticLoss`] | pointwise | `-log s(pos) - sum_k log s(-neg_k)` |
//! | [`BayesianPersonalizedRankingLoss`] | pairwise | `-sum_k log s(pos - neg_k)` |
//! | [`HingeLoss`] | pairwise | `sum_k max(0, m - pos + neg_k)` |
//! | [`AdaptiveHingeLoss`] | pairwise | `max(0, m - pos + max_k neg_k)` |
//! | [`ListnetLoss`] | groupwise | `-sum softmax(y) * log softmax(y_hat)` |

pub mod functional;
pub mod groupwise;
pub mod pairwise;
pub mod pointwise;

pub use groupwise::ListnetLoss;
pub use pairwise::{AdaptiveHingeLoss, BayesianPersonalizedRankingLoss, HingeLoss};
pub use pointwise::PointwiseLogisticLoss;

use crate::autograd::Variable;
use crate::error::Result;
use crate::tensor::FloatElem;

/// A ranking objective reduced to a scalar.
///
/// For pointwise and pairwise losses the arguments are positive scores `(B, 1)` and negative
/// scores `(B, K)`; for groupwise losses they are predicted and true scores `(B, L)`.
pub trait RankingLoss<T: FloatElem> {
    fn forward(&self, lhs: &Variable<T, 2>, rhs: &Variable<T, 2>) -> Result<Variable<T, 0>>;
}
