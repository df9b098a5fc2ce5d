use super::Expert;
use crate::autograd::Variable;
use crate::error::{Error, Result};
use crate::nn::{prefixed, Activation, Dropout, Linear, Module, Parameter};
use crate::tensor::FloatElem;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration of a [`DnnLayer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnnConfig {
    pub inputs_size: usize,
    pub output_size: usize,
    pub layer_sizes: Vec<usize>,
    /// One probability per hidden layer, or `None` for no dropout.
    pub dropout_p: Option<Vec<f64>>,
    pub activation: Activation,
}

impl Default for DnnConfig {
    fn default() -> Self {
        Self {
            inputs_size: 1,
            output_size: 1,
            layer_sizes: vec![16],
            dropout_p: None,
            activation: Activation::Relu,
        }
    }
}

impl DnnConfig {
    pub fn new(inputs_size: usize, output_size: usize, layer_sizes: Vec<usize>) -> Self {
        Self {
            inputs_size,
            output_size,
            layer_sizes,
            ..Default::default()
        }
    }

    pub fn with_dropout(mut self, dropout_p: Vec<f64>) -> Self {
        self.dropout_p = Some(dropout_p);
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.inputs_size == 0 || self.output_size == 0 {
            return Err(Error::InvalidConfig(format!(
                "dnn sizes must be positive, got inputs_size={} output_size={}",
                self.inputs_size, self.output_size
            )));
        }
        if self.layer_sizes.is_empty() || self.layer_sizes.contains(&0) {
            return Err(Error::InvalidConfig(format!(
                "layer_sizes must be non-empty and positive, got {:?}",
                self.layer_sizes
            )));
        }
        if let Some(dropout_p) = &self.dropout_p {
            if dropout_p.len() != self.layer_sizes.len() {
                return Err(Error::InvalidConfig(format!(
                    "dropout_p has {} entries but there are {} hidden layers",
                    dropout_p.len(),
                    self.layer_sizes.len()
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Hidden<T: FloatElem> {
    linear: Linear<T>,
    dropout: Option<Dropout>,
}

/// Fully-connected stack: `Linear -> activation -> dropout` per hidden layer, then a plain
/// output `Linear`.
///
/// `(B, inputs_size) -> (B, output_size)`
#[derive(Debug)]
pub struct DnnLayer<T: FloatElem> {
    hidden: Vec<Hidden<T>>,
    output: Linear<T>,
    activation: Activation,
}

impl<T: FloatElem> DnnLayer<T> {
    pub fn new<R: Rng + ?Sized>(config: &DnnConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;

        let mut hidden = Vec::with_capacity(config.layer_sizes.len());
        let mut in_size = config.inputs_size;
        for (i, &out_size) in config.layer_sizes.iter().enumerate() {
            let linear = Linear::init(in_size, out_size, true, rng);
            let dropout = match config.dropout_p.as_ref().map(|p| p[i]) {
                Some(p) if p > 0.0 => Some(Dropout::seeded(p, rng.random())?),
                _ => None,
            };
            hidden.push(Hidden { linear, dropout });
            in_size = out_size;
        }
        let output = Linear::init(in_size, config.output_size, true, rng);

        debug!(
            inputs_size = config.inputs_size,
            output_size = config.output_size,
            layers = ?config.layer_sizes,
            activation = %config.activation,
            "built dnn layer"
        );
        Ok(Self {
            hidden,
            output,
            activation: config.activation,
        })
    }

    pub fn inputs_size(&self) -> usize {
        self.hidden
            .first()
            .map_or(self.output.in_features(), |h| h.linear.in_features())
    }

    pub fn output_size(&self) -> usize {
        self.output.out_features()
    }

    pub fn forward(&self, inputs: &Variable<T, 2>) -> Result<Variable<T, 2>> {
        let mut x = inputs.clone();
        for layer in &self.hidden {
            x = self.activation.apply(&layer.linear.forward(&x)?);
            if let Some(dropout) = &layer.dropout {
                x = dropout.forward(&x)?;
            }
        }
        Ok(self.output.forward(&x)?)
    }
}

impl<T: FloatElem> Module<T> for DnnLayer<T> {
    fn named_parameters(&self) -> Vec<(String, &dyn Parameter<T>)> {
        let mut params = Vec::new();
        for (i, layer) in self.hidden.iter().enumerate() {
            params.extend(prefixed(&format!("hidden.{i}"), layer.linear.named_parameters()));
        }
        params.extend(prefixed("output", self.output.named_parameters()));
        params
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut dyn Parameter<T>)> {
        let mut params = Vec::new();
        for (i, layer) in self.hidden.iter_mut().enumerate() {
            params.extend(prefixed(&format!("hidden.{i}"), layer.linear.named_parameters_mut()));
        }
        params.extend(prefixed("output", self.output.named_parameters_mut()));
        params
    }

    fn set_training(&mut self, training: bool) {
        for dropout in self.hidden.iter_mut().filter_map(|h| h.dropout.as_mut()) {
            dropout.set_training(training);
        }
    }
}

impl<T: FloatElem> Expert<T> for DnnLayer<T> {
    fn forward(&self, inputs: &Variable<T, 2>) -> Result<Variable<T, 2>> {
        DnnLayer::forward(self, inputs)
    }

    fn output_size(&self) -> usize {
        DnnLayer::output_size(self)
    }
}
