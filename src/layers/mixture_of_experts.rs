use super::{DnnConfig, DnnLayer, Expert};
use crate::autograd::Variable;
use crate::error::{Error, Result};
use crate::nn::{prefixed, Linear, Module, Parameter};
use crate::tensor::{Axis, FloatElem, TensorError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

fn default_num_gates() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoeConfig {
    /// `N * E` of the embedded inputs.
    pub inputs_size: usize,
    /// Sum of the experts' output sizes.
    pub output_size: usize,
    pub num_experts: usize,
    #[serde(default = "default_num_gates")]
    pub num_gates: usize,
}

impl MoeConfig {
    pub fn new(inputs_size: usize, output_size: usize, num_experts: usize) -> Self {
        Self {
            inputs_size,
            output_size,
            num_experts,
            num_gates: default_num_gates(),
        }
    }

    pub fn with_num_gates(mut self, num_gates: usize) -> Self {
        self.num_gates = num_gates;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.inputs_size == 0 || self.output_size == 0 || self.num_experts == 0 || self.num_gates == 0 {
            return Err(Error::InvalidConfig(format!(
                "mixture-of-experts sizes must be positive, got {self:?}"
            )));
        }
        Ok(())
    }
}

/// Mixture-of-experts with one or more softmax gates.
///
/// Each expert maps the flattened inputs `(B, N * E)` to `(B, O_k)`; the expert outputs are
/// concatenated to `(B, O)`. Every gate is `softmax(Linear(N * E, O))` over `O`. The output
/// weights the concatenated expert outputs by each gate:
///
/// `(B, N, E) -> (B, G, O)`
#[derive(Debug)]
pub struct MixtureOfExpertsLayer<T: FloatElem, E> {
    experts: Vec<E>,
    gates: Vec<Linear<T>>,
    inputs_size: usize,
    output_size: usize,
}

impl<T: FloatElem, E: Expert<T>> MixtureOfExpertsLayer<T, E> {
    /// Builds `num_experts` experts with `make_expert(k, rng)`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the experts' output sizes do not add up to `output_size`.
    pub fn new<R, F>(config: &MoeConfig, mut make_expert: F, rng: &mut R) -> Result<Self>
    where
        R: Rng + ?Sized,
        F: FnMut(usize, &mut R) -> Result<E>,
    {
        config.validate()?;
        let experts = (0..config.num_experts)
            .map(|k| make_expert(k, rng))
            .collect::<Result<Vec<E>>>()?;

        let total: usize = experts.iter().map(|e| e.output_size()).sum();
        if total != config.output_size {
            return Err(Error::InvalidConfig(format!(
                "experts produce {total} outputs but output_size is {}",
                config.output_size
            )));
        }

        let gates = (0..config.num_gates)
            .map(|_| Linear::init(config.inputs_size, config.output_size, true, rng))
            .collect();

        debug!(
            num_experts = config.num_experts,
            num_gates = config.num_gates,
            inputs_size = config.inputs_size,
            output_size = config.output_size,
            "built mixture-of-experts layer"
        );
        Ok(Self {
            experts,
            gates,
            inputs_size: config.inputs_size,
            output_size: config.output_size,
        })
    }

    pub fn experts(&self) -> &[E] {
        &self.experts
    }

    pub fn num_gates(&self) -> usize {
        self.gates.len()
    }

    pub fn forward(&self, emb_inputs: &Variable<T, 3>) -> Result<Variable<T, 3>> {
        let shape = emb_inputs.data.named([Axis::Batch, Axis::Field, Axis::Embed])?;
        let batch = shape.size(Axis::Batch)?;
        let flat_size = shape.size(Axis::Field)? * shape.size(Axis::Embed)?;
        if flat_size != self.inputs_size {
            return Err(TensorError::ShapeMismatch {
                expected: vec![batch, self.inputs_size],
                got: vec![batch, flat_size],
            }
            .into());
        }
        let flat = emb_inputs.reshape([batch, flat_size])?;

        let outputs = self
            .experts
            .iter()
            .map(|expert| expert.forward(&flat))
            .collect::<Result<Vec<_>>>()?;
        let experts_output = Variable::concat(&outputs, 1)?
            .reshape([batch, 1, self.output_size])?
            .expand_axis(1, self.gates.len())?;

        let weights = self
            .gates
            .iter()
            .map(|gate| -> Result<Variable<T, 3>> {
                Ok(gate.forward(&flat)?.softmax()?.reshape([batch, 1, self.output_size])?)
            })
            .collect::<Result<Vec<_>>>()?;
        let gated_weights = Variable::concat(&weights, 1)?;

        Ok((&experts_output * &gated_weights)?)
    }
}

impl<T: FloatElem> MixtureOfExpertsLayer<T, DnnLayer<T>> {
    /// Mixture of identically configured dense experts.
    pub fn with_dnn_experts<R: Rng + ?Sized>(
        config: &MoeConfig,
        expert: &DnnConfig,
        rng: &mut R,
    ) -> Result<Self> {
        Self::new(config, |_, rng| DnnLayer::new(expert, rng), rng)
    }
}

impl<T: FloatElem, E: Expert<T>> Module<T> for MixtureOfExpertsLayer<T, E> {
    fn named_parameters(&self) -> Vec<(String, &dyn Parameter<T>)> {
        let mut params = Vec::new();
        for (k, expert) in self.experts.iter().enumerate() {
            params.extend(prefixed(&format!("experts.{k}"), expert.named_parameters()));
        }
        for (g, gate) in self.gates.iter().enumerate() {
            params.extend(prefixed(&format!("gates.{g}"), gate.named_parameters()));
        }
        params
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut dyn Parameter<T>)> {
        let mut params = Vec::new();
        for (k, expert) in self.experts.iter_mut().enumerate() {
            params.extend(prefixed(&format!("experts.{k}"), expert.named_parameters_mut()));
        }
        for (g, gate) in self.gates.iter_mut().enumerate() {
            params.extend(prefixed(&format!("gates.{g}"), gate.named_parameters_mut()));
        }
        params
    }

    fn set_training(&mut self, training: bool) {
        for expert in &mut self.experts {
            expert.set_training(training);
        }
    }
}
