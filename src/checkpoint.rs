//! Checkpointing and Serialization.
//!
//! Saves and restores a [`Module`]'s named parameters with the `safetensors` format. Values
//! are stored as little-endian `f32` regardless of the in-memory element type; `f64` files
//! written by other tools are accepted on load.

use crate::error::{Error, Result};
use crate::nn::Module;
use crate::tensor::{FloatElem, TensorError};
use safetensors::tensor::TensorView;
use safetensors::{Dtype, SafeTensors};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Writes every named parameter of `module` to `path`.
pub fn save_checkpoint<T: FloatElem, M: Module<T> + ?Sized, P: AsRef<Path>>(path: P, module: &M) -> Result<()> {
    let params = module.named_parameters();

    let mut buffers = Vec::with_capacity(params.len());
    for (name, param) in &params {
        let mut bytes = Vec::with_capacity(param.numel() * 4);
        for value in param.values() {
            let value = value
                .to_f32()
                .ok_or_else(|| Error::Checkpoint(format!("`{name}` holds a value not representable as f32")))?;
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        buffers.push((name.clone(), param.shape(), bytes));
    }

    let mut views = Vec::with_capacity(buffers.len());
    for (name, shape, bytes) in &buffers {
        views.push((name.clone(), TensorView::new(Dtype::F32, shape.clone(), bytes)?));
    }
    safetensors::serialize_to_file(views, None, path.as_ref())?;

    debug!(path = %path.as_ref().display(), tensors = params.len(), "saved checkpoint");
    Ok(())
}

/// Overwrites the parameters of `module` with the tensors stored at `path`.
///
/// # Errors
///
/// `Checkpoint` if the file's tensor names differ from the module's parameter names or a dtype
/// is not `f32`/`f64`; `ShapeMismatch` if a stored shape differs from the parameter's. On
/// error no parameter has been modified.
pub fn load_checkpoint<T: FloatElem, M: Module<T> + ?Sized, P: AsRef<Path>>(path: P, module: &mut M) -> Result<()> {
    let bytes = std::fs::read(path.as_ref())?;
    let tensors = SafeTensors::deserialize(&bytes)?;

    let mut params = module.named_parameters_mut();
    let expected: BTreeSet<&str> = params.iter().map(|(name, _)| name.as_str()).collect();
    let found: BTreeSet<&str> = tensors.names().into_iter().collect();
    if expected != found {
        let missing: Vec<&str> = expected.difference(&found).copied().collect();
        let unexpected: Vec<&str> = found.difference(&expected).copied().collect();
        return Err(Error::Checkpoint(format!(
            "parameter names differ: missing {missing:?}, unexpected {unexpected:?}"
        )));
    }

    // nothing is written until every tensor has been checked and decoded
    let mut staged: Vec<Vec<T>> = Vec::with_capacity(params.len());
    for (name, param) in params.iter() {
        let view = tensors.tensor(name)?;
        if view.shape() != param.shape().as_slice() {
            return Err(TensorError::ShapeMismatch {
                expected: param.shape(),
                got: view.shape().to_vec(),
            }
            .into());
        }
        let values = decode(name, &view)?
            .into_iter()
            .map(|v| T::from_f64(v).ok_or_else(|| Error::Checkpoint(format!("`{name}` value {v} out of range"))))
            .collect::<Result<Vec<T>>>()?;
        staged.push(values);
    }

    for ((_, param), values) in params.iter_mut().zip(staged) {
        param.values_mut().copy_from_slice(&values);
    }

    debug!(path = %path.as_ref().display(), tensors = params.len(), "loaded checkpoint");
    Ok(())
}

fn decode(name: &str, view: &TensorView<'_>) -> Result<Vec<f64>> {
    let data = view.data();
    match view.dtype() {
        Dtype::F32 => Ok(data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect()),
        Dtype::F64 => Ok(data
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect()),
        other => Err(Error::Checkpoint(format!("`{name}` has unsupported dtype {other:?}"))),
    }
}
