//! Parameter initialisers.

use crate::tensor::{FloatElem, Tensor};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Samples `U(low, high)` element-wise.
pub fn uniform<T, const RANK: usize, R>(shape: [usize; RANK], low: f64, high: f64, rng: &mut R) -> Tensor<T, RANK>
where
    T: FloatElem,
    R: Rng + ?Sized,
{
    Tensor::from_fn(shape, |_| {
        let u: f64 = rng.random();
        T::from_f64(low + (high - low) * u).unwrap_or_else(T::zero)
    })
}

/// Samples `N(mean, std^2)` element-wise.
pub fn normal<T, const RANK: usize, R>(shape: [usize; RANK], mean: f64, std: f64, rng: &mut R) -> Tensor<T, RANK>
where
    T: FloatElem,
    R: Rng + ?Sized,
{
    Tensor::from_fn(shape, |_| {
        let z: f64 = StandardNormal.sample(rng);
        T::from_f64(mean + std * z).unwrap_or_else(T::zero)
    })
}

/// Glorot/Xavier uniform for a `[fan_out, fan_in]` matrix: `U(-a, a)` with
/// `a = sqrt(6 / (fan_in + fan_out))`.
pub fn xavier_uniform<T, R>(shape: [usize; 2], rng: &mut R) -> Tensor<T, 2>
where
    T: FloatElem,
    R: Rng + ?Sized,
{
    let fans = (shape[0] + shape[1]).max(1) as f64;
    let bound = (6.0 / fans).sqrt();
    uniform(shape, -bound, bound, rng)
}
