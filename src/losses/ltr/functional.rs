//! Learning-to-rank losses as plain functions.
//!
//! Pointwise and pairwise losses take the scores of the positive item `pos: (B, 1)` and of
//! `K` sampled negatives `neg: (B, K)`, and return one loss per sample, `(B, 1)`.

use crate::autograd::Variable;
use crate::error::Result;
use crate::tensor::{FloatElem, Tensor, TensorError};

/// Checks the `(B, 1)` / `(B, K)` layout and returns `K`.
fn negatives<T: FloatElem>(pos: &Variable<T, 2>, neg: &Variable<T, 2>) -> Result<usize> {
    let [batch, width] = *pos.shape();
    if width != 1 || neg.shape()[0] != batch {
        return Err(TensorError::ShapeMismatch {
            expected: vec![batch, 1],
            got: pos.shape().to_vec(),
        }
        .into());
    }
    Ok(neg.shape()[1])
}

fn constant<T: FloatElem>(shape: [usize; 2], value: f64) -> Variable<T, 2> {
    Variable::new(Tensor::full(shape, T::from_f64(value).unwrap_or_else(T::zero)))
}

/// `-log sigmoid(pos) - sum_k log sigmoid(-neg_k)`.
pub fn pointwise_logistic_ranking_loss<T: FloatElem>(
    pos: &Variable<T, 2>,
    neg: &Variable<T, 2>,
) -> Result<Variable<T, 2>> {
    negatives(pos, neg)?;
    let minus_one = -T::one();
    let pos_loss = pos.log_sigmoid();
    let neg_loss = neg.scale(minus_one).log_sigmoid().sum_axis(1)?;
    Ok((&pos_loss + &neg_loss)?.scale(minus_one))
}

/// Bayesian personalized ranking: `sum_k -log sigmoid(pos - neg_k)`.
pub fn bayesian_personalized_ranking_loss<T: FloatElem>(
    pos: &Variable<T, 2>,
    neg: &Variable<T, 2>,
) -> Result<Variable<T, 2>> {
    let k = negatives(pos, neg)?;
    let diff = (&pos.expand_axis(1, k)? - neg)?;
    Ok(diff.log_sigmoid().sum_axis(1)?.scale(-T::one()))
}

/// `sum_k max(0, margin - pos + neg_k)`.
pub fn hinge_loss<T: FloatElem>(pos: &Variable<T, 2>, neg: &Variable<T, 2>, margin: f64) -> Result<Variable<T, 2>> {
    let k = negatives(pos, neg)?;
    let margin = constant(*neg.shape(), margin);
    let violation = (&(&margin - &pos.expand_axis(1, k)?)? + neg)?;
    Ok(violation.relu().sum_axis(1)?)
}

/// Hinge loss against the hardest negative only: `max(0, margin - pos + max_k neg_k)`.
pub fn adaptive_hinge_loss<T: FloatElem>(
    pos: &Variable<T, 2>,
    neg: &Variable<T, 2>,
    margin: f64,
) -> Result<Variable<T, 2>> {
    negatives(pos, neg)?;
    let hardest = neg.max_axis(1)?;
    let margin = constant(*pos.shape(), margin);
    Ok((&(&margin - pos)? + &hardest)?.relu())
}

/// ListNet top-one cross entropy between score lists of one group per row:
/// `-sum_l softmax(y_true)_l * log softmax(y_pred)_l`, `(B, L) -> (B, 1)`.
///
/// `y_true` is treated as a target and receives no gradient.
pub fn listnet_loss<T: FloatElem>(y_pred: &Variable<T, 2>, y_true: &Variable<T, 2>) -> Result<Variable<T, 2>> {
    if y_pred.shape() != y_true.shape() {
        return Err(TensorError::ShapeMismatch {
            expected: y_pred.shape().to_vec(),
            got: y_true.shape().to_vec(),
        }
        .into());
    }
    let target = y_true.detach().softmax()?;
    let log_probs = y_pred.log_softmax()?;
    Ok((&target * &log_probs)?.sum_axis(1)?.scale(-T::one()))
}
