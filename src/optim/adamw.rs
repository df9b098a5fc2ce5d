use super::{gradient_of, Optimizer};
use crate::error::Result;
use crate::nn::Parameter;
use crate::tensor::FloatElem;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::trace;

#[derive(Debug, Clone)]
struct Moments<T> {
    m: Vec<T>,
    v: Vec<T>,
    step: i32,
}

/// AdamW optimizer.
///
/// Adam with decoupled weight decay (Loshchilov & Hutter, 2019):
///
/// ```text
/// m_t = b1 m_{t-1} + (1 - b1) g_t
/// v_t = b2 v_{t-1} + (1 - b2) g_t^2
/// p_t = p_{t-1} - lr (m_t / (1 - b1^t) / (sqrt(v_t / (1 - b2^t)) + eps) + wd p_{t-1})
/// ```
///
/// Moment estimates are kept per parameter name.
#[derive(Debug, Clone)]
pub struct AdamW<T: FloatElem> {
    pub learning_rate: T,
    pub beta1: T,
    pub beta2: T,
    pub epsilon: T,
    pub weight_decay: T,
    state: HashMap<String, Moments<T>>,
}

impl<T: FloatElem> AdamW<T> {
    /// Defaults: `beta1 = 0.9`, `beta2 = 0.999`, `epsilon = 1e-8`, `weight_decay = 0.01`.
    pub fn new(learning_rate: T) -> Self {
        let constant = |v: f64| T::from_f64(v).unwrap_or_else(T::zero);
        Self {
            learning_rate,
            beta1: constant(0.9),
            beta2: constant(0.999),
            epsilon: constant(1e-8),
            weight_decay: constant(0.01),
            state: HashMap::new(),
        }
    }

    pub fn with_betas(mut self, beta1: T, beta2: T) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    pub fn with_epsilon(mut self, epsilon: T) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_weight_decay(mut self, weight_decay: T) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// Number of updates applied to the named parameter so far.
    pub fn steps(&self, name: &str) -> usize {
        self.state.get(name).map_or(0, |s| s.step as usize)
    }
}

impl<T: FloatElem> Optimizer<T> for AdamW<T> {
    fn step(&mut self, params: Vec<(String, &mut dyn Parameter<T>)>) -> Result<()> {
        let (lr, b1, b2, eps, wd) = (
            self.learning_rate,
            self.beta1,
            self.beta2,
            self.epsilon,
            self.weight_decay,
        );
        let one = T::one();

        for (name, param) in params {
            let Some(grad) = gradient_of(&name, &*param)? else {
                continue;
            };
            let size = grad.len();
            let state = self.state.entry(name.clone()).or_insert_with(|| Moments {
                m: vec![T::zero(); size],
                v: vec![T::zero(); size],
                step: 0,
            });
            state.step += 1;
            let correction1 = one - b1.powi(state.step);
            let correction2 = one - b2.powi(state.step);

            param
                .values_mut()
                .par_iter_mut()
                .zip(grad.par_iter())
                .zip(state.m.par_iter_mut())
                .zip(state.v.par_iter_mut())
                .for_each(|(((p, &g), m), v)| {
                    *m = b1 * *m + (one - b1) * g;
                    *v = b2 * *v + (one - b2) * g * g;
                    let m_hat = *m / correction1;
                    let v_hat = *v / correction2;
                    *p = *p - lr * (m_hat / (v_hat.sqrt() + eps) + wd * *p);
                });
            trace!(param = %name, step = state.step, "adamw step");
        }
        Ok(())
    }
}
