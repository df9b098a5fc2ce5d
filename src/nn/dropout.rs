use crate::autograd::Variable;
use crate::error::{Error, Result};
use crate::tensor::{FloatElem, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;

/// Inverted dropout: in training mode zeroes each element with probability `p` and scales the
/// survivors by `1 / (1 - p)`; identity in evaluation mode.
#[derive(Debug)]
pub struct Dropout {
    p: f64,
    training: bool,
    rng: RefCell<StdRng>,
}

impl Dropout {
    /// # Errors
    ///
    /// `InvalidConfig` unless `0 <= p < 1`.
    pub fn new(p: f64) -> Result<Self> {
        Self::with_rng(p, StdRng::from_rng(&mut rand::rng()))
    }

    /// Dropout with a reproducible mask sequence.
    pub fn seeded(p: f64, seed: u64) -> Result<Self> {
        Self::with_rng(p, StdRng::seed_from_u64(seed))
    }

    fn with_rng(p: f64, rng: StdRng) -> Result<Self> {
        if !(0.0..1.0).contains(&p) {
            return Err(Error::InvalidConfig(format!(
                "dropout probability must be in [0, 1), got {p}"
            )));
        }
        Ok(Self {
            p,
            training: true,
            rng: RefCell::new(rng),
        })
    }

    pub fn p(&self) -> f64 {
        self.p
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    pub fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    pub fn forward<T: FloatElem, const RANK: usize>(&self, x: &Variable<T, RANK>) -> Result<Variable<T, RANK>> {
        if !self.training || self.p == 0.0 {
            return Ok(x.clone());
        }
        let keep = T::from_f64(1.0 / (1.0 - self.p)).unwrap_or_else(T::one);
        let mut rng = self.rng.borrow_mut();
        let mask = Tensor::from_fn(*x.shape(), |_| {
            if rng.random::<f64>() < self.p {
                T::zero()
            } else {
                keep
            }
        });
        Ok((x * &Variable::new(mask))?)
    }
}
