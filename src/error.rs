//! Crate-level error type.

use crate::tensor::TensorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Tensor(#[from] TensorError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported formula `{0}`, expected one of [\"code\", \"paper\"]")]
    UnsupportedFormula(String),

    #[error("Unsupported key {key} for {data}")]
    UnsupportedKey { key: String, data: &'static str },

    #[error("Unknown column `{0}`")]
    UnknownColumn(String),

    #[error("Unknown activation `{0}`")]
    UnknownActivation(String),

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<safetensors::SafeTensorError> for Error {
    fn from(err: safetensors::SafeTensorError) -> Self {
        Error::Checkpoint(err.to_string())
    }
}
