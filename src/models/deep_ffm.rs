use super::CtrModel;
use crate::autograd::Variable;
use crate::error::{Error, Result};
use crate::layers::{DnnConfig, DnnLayer, FfmConfig, FfmLayer};
use crate::nn::{prefixed, Activation, Module, Parameter};
use crate::tensor::{Axis, FloatElem};
use crate::utils::combination;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepFfmConfig {
    pub embed_size: usize,
    pub num_fields: usize,
    pub deep_output_size: usize,
    pub deep_layer_sizes: Vec<usize>,
    #[serde(default)]
    pub ffm_dropout_p: f64,
    #[serde(default)]
    pub deep_dropout_p: Option<Vec<f64>>,
    #[serde(default)]
    pub deep_activation: Activation,
}

impl DeepFfmConfig {
    pub fn new(embed_size: usize, num_fields: usize, deep_output_size: usize, deep_layer_sizes: Vec<usize>) -> Self {
        Self {
            embed_size,
            num_fields,
            deep_output_size,
            deep_layer_sizes,
            ffm_dropout_p: 0.0,
            deep_dropout_p: None,
            deep_activation: Activation::Relu,
        }
    }

    pub fn with_ffm_dropout(mut self, p: f64) -> Self {
        self.ffm_dropout_p = p;
        self
    }

    pub fn with_deep_dropout(mut self, p: Vec<f64>) -> Self {
        self.deep_dropout_p = Some(p);
        self
    }

    pub fn with_deep_activation(mut self, activation: Activation) -> Self {
        self.deep_activation = activation;
        self
    }

    fn ffm(&self) -> FfmConfig {
        FfmConfig::new(self.num_fields).with_dropout(self.ffm_dropout_p)
    }

    fn deep(&self) -> Result<DnnConfig> {
        let inputs_size = combination(self.num_fields, 2)?
            .checked_mul(self.embed_size)
            .ok_or_else(|| Error::Overflow(format!("{} fields of width {}", self.num_fields, self.embed_size)))?;
        Ok(DnnConfig {
            inputs_size,
            output_size: self.deep_output_size,
            layer_sizes: self.deep_layer_sizes.clone(),
            dropout_p: self.deep_dropout_p.clone(),
            activation: self.deep_activation,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.embed_size == 0 {
            return Err(Error::InvalidConfig("embed_size must be positive".into()));
        }
        self.ffm().validate()?;
        self.deep()?.validate()
    }
}

/// Deep Field-aware Factorization Machine.
///
/// Stacks a dense network on top of field-aware interactions:
///
/// 1. first-order term: the inputs summed over fields and embedding, `(B, 1)`;
/// 2. second-order term: [`FfmLayer`] products `(B, NC2, E)`, flattened to `(B, NC2 * E)`,
///    passed through a [`DnnLayer`] and summed over its outputs, `(B, 1)`;
/// 3. logits: the sum of both terms.
///
/// Input is the output of
/// [`MultiIndicesFieldAwareEmbedding`](crate::inputs::MultiIndicesFieldAwareEmbedding):
/// `(B, N * N, E) -> (B, 1)`.
///
/// References: Zhang et al., 2019, "Field-aware Neural Factorization Machine for
/// Click-Through Rate Prediction".
#[derive(Debug)]
pub struct DeepFieldAwareFactorizationMachineModel<T: FloatElem> {
    ffm: FfmLayer,
    deep: DnnLayer<T>,
    num_fields: usize,
    embed_size: usize,
}

impl<T: FloatElem> DeepFieldAwareFactorizationMachineModel<T> {
    pub fn new<R: Rng + ?Sized>(config: &DeepFfmConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let ffm = FfmLayer::new(&config.ffm(), rng)?;
        let deep = DnnLayer::new(&config.deep()?, rng)?;
        debug!(
            num_fields = config.num_fields,
            embed_size = config.embed_size,
            deep_inputs = deep.inputs_size(),
            "built deep ffm model"
        );
        Ok(Self {
            ffm,
            deep,
            num_fields: config.num_fields,
            embed_size: config.embed_size,
        })
    }

    pub fn forward(&self, field_emb_inputs: &Variable<T, 3>) -> Result<Variable<T, 2>> {
        let shape = field_emb_inputs
            .data
            .named([Axis::Batch, Axis::Field, Axis::Embed])?;
        shape
            .expect(Axis::Field, self.num_fields * self.num_fields)?
            .expect(Axis::Embed, self.embed_size)?;
        let batch = shape.size(Axis::Batch)?;

        let first = field_emb_inputs
            .reshape([batch, self.num_fields * self.num_fields * self.embed_size])?
            .sum_axis(1)?;

        let second = self.ffm.forward(field_emb_inputs)?;
        let flat_size = second.shape()[1] * self.embed_size;
        let second = self
            .deep
            .forward(&second.reshape([batch, flat_size])?)?
            .sum_axis(1)?;

        Ok((&second + &first)?)
    }
}

impl<T: FloatElem> CtrModel<T> for DeepFieldAwareFactorizationMachineModel<T> {
    fn forward(&self, inputs: &Variable<T, 3>) -> Result<Variable<T, 2>> {
        DeepFieldAwareFactorizationMachineModel::forward(self, inputs)
    }
}

impl<T: FloatElem> Module<T> for DeepFieldAwareFactorizationMachineModel<T> {
    fn named_parameters(&self) -> Vec<(String, &dyn Parameter<T>)> {
        prefixed("deep", self.deep.named_parameters())
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut dyn Parameter<T>)> {
        prefixed("deep", self.deep.named_parameters_mut())
    }

    fn set_training(&mut self, training: bool) {
        Module::<T>::set_training(&mut self.ffm, training);
        self.deep.set_training(training);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{Tensor, TensorError};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn model() -> DeepFieldAwareFactorizationMachineModel<f64> {
        let config = DeepFfmConfig::new(2, 3, 4, vec![8]);
        DeepFieldAwareFactorizationMachineModel::new(&config, &mut StdRng::seed_from_u64(21)).unwrap()
    }

    #[test]
    fn test_deep_input_size() {
        let m = model();
        assert_eq!(m.deep.inputs_size(), 3 * 2);
        assert_eq!(m.deep.output_size(), 4);
        assert!(m.named_parameters().iter().all(|(n, _)| n.starts_with("deep.")));
    }

    #[test]
    fn test_forward_decomposes_into_both_terms() {
        let m = model();
        let x = Variable::new(Tensor::from_fn([2, 9, 2], |i| ((i % 7) as f64 - 3.0) * 0.1));
        let out = m.forward(&x).unwrap();
        assert_eq!(out.shape(), &[2, 1]);

        // recompute the second-order term for sample 1 through the layers directly
        let products = m.ffm.forward(&x).unwrap();
        let deep = m.deep.forward(&products.reshape([2, 6]).unwrap()).unwrap();
        let second: f64 = deep.data.data()[4..8].iter().sum();
        let first: f64 = x.data.data()[18..36].iter().sum();
        assert!((out.data.data()[1] - (first + second)).abs() < 1e-12);
    }

    #[test]
    fn test_gradients_reach_deep_parameters() {
        let m = model();
        let x = Variable::new(Tensor::from_fn([3, 9, 2], |i| (i as f64).sin()));
        m.forward(&x).unwrap().sum_all().backward().unwrap();
        for (name, p) in m.named_parameters() {
            assert!(p.grad_values().is_some(), "{name}");
        }
        assert!(x.gradient().is_some());
    }

    #[test]
    fn test_shape_and_config_errors() {
        let m = model();
        let bad = Variable::new(Tensor::<f64, 3>::zeros([1, 4, 2]));
        assert!(matches!(
            m.forward(&bad),
            Err(Error::Tensor(TensorError::AxisMismatch { .. }))
        ));

        let config = DeepFfmConfig::new(2, 3, 1, vec![4]).with_deep_dropout(vec![0.1, 0.2]);
        assert!(config.validate().is_err());

        let json = r#"{"embed_size": 4, "num_fields": 5, "deep_output_size": 1, "deep_layer_sizes": [16, 8]}"#;
        let config: DeepFfmConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.deep().unwrap().inputs_size, 40);
        assert_eq!(config.deep_activation, Activation::Relu);
    }
}
