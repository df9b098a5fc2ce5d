//! Neural-network building blocks over [`Variable`](crate::autograd::Variable)s.
//!
//! - [`Module`] / [`Parameter`]: named parameter registry used by optimizers and checkpoints.
//! - [`Linear`], [`Embedding`], [`Dropout`], [`Activation`].
//! - [`init`]: parameter initialisers.

pub mod activation;
pub mod dropout;
pub mod embedding;
pub mod init;
pub mod linear;
pub mod module;

pub use activation::Activation;
pub use dropout::Dropout;
pub use embedding::Embedding;
pub use linear::Linear;
pub use module::{prefixed, Module, Parameter};
