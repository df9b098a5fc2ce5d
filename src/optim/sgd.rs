use super::{gradient_of, Optimizer};
use crate::error::Result;
use crate::nn::Parameter;
use crate::tensor::FloatElem;
use rayon::prelude::*;
use tracing::trace;

/// Stochastic Gradient Descent (SGD) optimizer.
///
/// Updates parameters using the rule:
/// `param = param - learning_rate * (grad + weight_decay * param)`
#[derive(Debug, Clone)]
pub struct Sgd<T: FloatElem> {
    pub learning_rate: T,
    pub weight_decay: T,
}

impl<T: FloatElem> Sgd<T> {
    pub fn new(learning_rate: T) -> Self {
        Self {
            learning_rate,
            weight_decay: T::zero(),
        }
    }

    pub fn with_weight_decay(mut self, weight_decay: T) -> Self {
        self.weight_decay = weight_decay;
        self
    }
}

impl<T: FloatElem> Optimizer<T> for Sgd<T> {
    fn step(&mut self, params: Vec<(String, &mut dyn Parameter<T>)>) -> Result<()> {
        let lr = self.learning_rate;
        let wd = self.weight_decay;
        for (name, param) in params {
            let Some(grad) = gradient_of(&name, &*param)? else {
                continue;
            };
            param
                .values_mut()
                .par_iter_mut()
                .zip(grad.par_iter())
                .for_each(|(p, &g)| *p = *p - lr * (g + wd * *p));
            trace!(param = %name, "sgd step");
        }
        Ok(())
    }
}
