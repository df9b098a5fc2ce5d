use crate::autograd::Variable;
use crate::nn::init;
use crate::nn::{Module, Parameter};
use crate::tensor::{FloatElem, Result, Tensor, TensorElem, TensorError};
use rand::Rng;

/// Linear layer: `y = x A^T + b`.
///
/// - `weight`: `[out_features, in_features]`
/// - `bias`: `[out_features]`
///
/// # Examples
/// ```rust
/// use rand::{rngs::StdRng, SeedableRng};
/// use recsys_rs::autograd::Variable;
/// use recsys_rs::nn::Linear;
/// use recsys_rs::tensor::Tensor;
///
/// let layer = Linear::<f32>::init(10, 5, true, &mut StdRng::seed_from_u64(0));
/// let x = Variable::new(Tensor::zeros([3, 10]));
/// assert_eq!(layer.forward(&x).unwrap().shape(), &[3, 5]);
/// ```
#[derive(Debug)]
pub struct Linear<T: TensorElem> {
    pub weight: Variable<T, 2>,
    pub bias: Option<Variable<T, 1>>,
}

impl<T: FloatElem> Linear<T> {
    /// Wraps explicit weights.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if the bias length differs from `out_features`.
    pub fn new(weight: Tensor<T, 2>, bias: Option<Tensor<T, 1>>) -> Result<Self> {
        if let Some(b) = &bias {
            if b.shape()[0] != weight.shape()[0] {
                return Err(TensorError::ShapeMismatch {
                    expected: vec![weight.shape()[0]],
                    got: b.shape().to_vec(),
                });
            }
        }
        Ok(Self {
            weight: Variable::new(weight),
            bias: bias.map(Variable::new),
        })
    }

    /// Random initialisation: weight and bias drawn from `U(-k, k)`, `k = 1 / sqrt(in_features)`.
    pub fn init<R: Rng + ?Sized>(in_features: usize, out_features: usize, bias: bool, rng: &mut R) -> Self {
        let k = 1.0 / (in_features.max(1) as f64).sqrt();
        let weight = init::uniform([out_features, in_features], -k, k, rng);
        let bias = bias.then(|| init::uniform([out_features], -k, k, rng));
        Self {
            weight: Variable::new(weight),
            bias: bias.map(Variable::new),
        }
    }

    pub fn in_features(&self) -> usize {
        self.weight.shape()[1]
    }

    pub fn out_features(&self) -> usize {
        self.weight.shape()[0]
    }

    /// `[B, in_features] -> [B, out_features]`.
    pub fn forward(&self, x: &Variable<T, 2>) -> Result<Variable<T, 2>> {
        if x.shape()[1] != self.in_features() {
            return Err(TensorError::ShapeMismatch {
                expected: vec![x.shape()[0], self.in_features()],
                got: x.shape().to_vec(),
            });
        }
        let out = x.matmul(&self.weight.transpose()?)?;
        match &self.bias {
            Some(b) => out.add_bias(b),
            None => Ok(out),
        }
    }
}

impl<T: FloatElem> Module<T> for Linear<T> {
    fn named_parameters(&self) -> Vec<(String, &dyn Parameter<T>)> {
        let mut params: Vec<(String, &dyn Parameter<T>)> = Vec::new();
        params.push(("weight".into(), &self.weight));
        if let Some(b) = &self.bias {
            params.push(("bias".into(), b));
        }
        params
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut dyn Parameter<T>)> {
        let mut params: Vec<(String, &mut dyn Parameter<T>)> = Vec::new();
        params.push(("weight".into(), &mut self.weight));
        if let Some(b) = &mut self.bias {
            params.push(("bias".into(), b));
        }
        params
    }
}
