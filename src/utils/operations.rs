use crate::autograd::Variable;
use crate::error::{Error, Result};
use crate::nn::Parameter;
use crate::tensor::{FloatElem, Tensor, TensorError};

/// Number of `r`-element subsets of `n` elements; `0` when `r > n`.
///
/// ```rust
/// use recsys_rs::utils::combination;
///
/// assert_eq!(combination(5, 2).unwrap(), 10);
/// assert_eq!(combination(3, 4).unwrap(), 0);
/// ```
///
/// # Errors
///
/// `Overflow` if the result does not fit in `usize`.
pub fn combination(n: usize, r: usize) -> Result<usize> {
    if r > n {
        return Ok(0);
    }
    let r = r.min(n - r);
    // after step i the accumulator is C(n, i + 1) <= C(n, r), so only the result can overflow;
    // the product before the division is kept in u128
    let mut acc: usize = 1;
    for i in 0..r {
        let next = acc as u128 * (n - i) as u128 / (i + 1) as u128;
        acc = usize::try_from(next).map_err(|_| Error::Overflow(format!("combination({n}, {r})")))?;
    }
    Ok(acc)
}

/// Inner product of `a` and `b` along `axis`, which is kept with length 1.
///
/// For `(B, N, E)` inputs and `axis = 2` this scores every field pair position-wise:
/// `(B, N, 1)`. The rank is preserved; call `reshape` on the result to drop the unit axis,
/// e.g. `(B, N, 1) -> (B, N)`.
pub fn inner_product_similarity<T: FloatElem, const RANK: usize>(
    a: &Variable<T, RANK>,
    b: &Variable<T, RANK>,
    axis: usize,
) -> Result<Variable<T, RANK>> {
    Ok((a * b)?.sum_axis(axis)?)
}

/// `weight_decay * sum ||w||_p` over the parameters whose name contains `"weight"`.
///
/// The result is differentiable, so it can be added to a training loss.
pub fn regularize<T: FloatElem>(
    parameters: &[(String, &dyn Parameter<T>)],
    weight_decay: T,
    norm: T,
) -> Result<Variable<T, 0>> {
    let mut loss: Option<Variable<T, 0>> = None;
    for (_, param) in parameters.iter().filter(|(name, _)| name.contains("weight")) {
        let term = param.flatten()?.norm(norm)?;
        loss = Some(match loss {
            Some(acc) => (&acc + &term)?,
            None => term,
        });
    }
    Ok(match loss {
        Some(loss) => loss.scale(weight_decay),
        None => Variable::new(Tensor::zeros([])),
    })
}

/// Repeats every batch row `size` times consecutively: `(B, ...) -> (B * size, ...)`.
pub fn replicate_tensor<T: FloatElem, const RANK: usize>(
    inputs: &Variable<T, RANK>,
    size: usize,
) -> Result<Variable<T, RANK>> {
    if RANK == 0 {
        return Err(TensorError::Unsupported("replicating a scalar".into()).into());
    }
    let indices: Vec<usize> = (0..inputs.shape()[0])
        .flat_map(|b| std::iter::repeat_n(b, size))
        .collect();
    Ok(inputs.index_select(0, &indices)?)
}

/// Capsule squashing over the last axis:
/// `(|x|^2 / (1 + |x|^2)) * x / (|x| + 1e-8)`.
///
/// Short vectors shrink towards zero, long vectors towards unit length.
pub fn squash<T: FloatElem, const RANK: usize>(inputs: &Variable<T, RANK>) -> Result<Variable<T, RANK>> {
    if RANK == 0 {
        return Err(TensorError::Unsupported("squash of a scalar".into()).into());
    }
    let last = RANK - 1;
    let width = inputs.shape()[last];

    let squared_norm = (inputs * inputs)?.sum_axis(last)?;
    let ones = Variable::new(Tensor::ones(*squared_norm.shape()));
    let eps = Variable::new(Tensor::full(
        *squared_norm.shape(),
        T::from_f64(1e-8).unwrap_or_else(T::epsilon),
    ));

    let ratio = (&squared_norm / &(&ones + &squared_norm)?)?;
    let length = (&squared_norm.sqrt() + &eps)?;
    let unit = (inputs / &length.expand_axis(last, width)?)?;
    Ok((&ratio.expand_axis(last, width)? * &unit)?)
}
