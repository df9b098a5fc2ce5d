use super::Inputs;
use crate::autograd::Variable;
use crate::error::Result;
use crate::tensor::{Axis, FloatElem, Tensor};

/// Passes numeric feature values through as a one-wide embedding: `(B, N) -> (B, N, 1)`.
#[derive(Debug, Clone)]
pub struct ValueInputs {
    num_fields: usize,
}

impl ValueInputs {
    pub fn new(num_fields: usize) -> Self {
        Self { num_fields }
    }

    pub fn num_fields(&self) -> usize {
        self.num_fields
    }

    pub fn forward<T: FloatElem>(&self, inputs: &Tensor<T, 2>) -> Result<Variable<T, 3>> {
        let shape = inputs.named([Axis::Batch, Axis::Field])?;
        shape.expect(Axis::Field, self.num_fields)?;
        let batch = shape.size(Axis::Batch)?;
        Ok(Variable::new(inputs.clone().reshape([batch, self.num_fields, 1])?))
    }
}

impl Inputs for ValueInputs {
    fn length(&self) -> usize {
        1
    }
}
