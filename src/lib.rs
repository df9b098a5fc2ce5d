//! # recsys-rs
//!
//! `recsys-rs` is a pure Rust toolkit of recommender-system building blocks: field-aware
//! embedding inputs, factorization-machine and mixture-of-experts layers, learning-to-rank
//! losses and data preparation utilities, on top of a small reverse-mode autograd core.
//!
//! Everything runs on the **CPU**.
//!
//! ## Modules
//!
//! - [`mod@tensor`]: Core N-dimensional tensor implementation.
//! - [`autograd`]: Reverse-mode differentiation over tensors.
//! - [`nn`]: Generic building blocks (Linear, Embedding, Dropout, activations).
//! - [`inputs`]: Embedding and value input fields.
//! - [`layers`]: Interaction layers (DNN, FM, FFM, MoE).
//! - [`models`]: End-to-end CTR models (Deep Field-aware FM).
//! - [`losses`]: Learning-to-rank objectives.
//! - [`data`]: Subsampling and negative samplers.
//! - [`optim`], [`checkpoint`], [`config`], [`utils`]: training plumbing.
//!
//! ## Example
//!
//! ```rust
//! use recsys_rs::tensor::Tensor;
//!
//! let data = vec![1.0, 2.0, 3.0, 4.0];
//! let tensor = Tensor::<f32, 2>::new(data, [2, 2]).unwrap();
//! println!("{:?}", tensor);
//! ```

/// Macro for creating a Tensor with compile-time shape checking.
///
/// # Examples
///
/// ```rust
/// use recsys_rs::tensor;
/// use recsys_rs::tensor::Tensor;
///
/// let ids: Tensor<usize, 2> = tensor!([0usize, 3, 1, 2], [2, 2]);
/// assert_eq!(ids.shape(), &[2, 2]);
///
/// // Fails to compile:
/// // let t = tensor!([1.0, 2.0, 3.0], [2, 2]);
/// ```
#[macro_export]
macro_rules! tensor {
    ($data:expr, $shape:expr) => {{
        const DATA_LEN: usize = $data.len();
        const SHAPE: [usize; $shape.len()] = $shape;
        const EXPECTED_SIZE: usize = {
            let mut size = 1;
            let mut i = 0;
            while i < SHAPE.len() {
                size *= SHAPE[i];
                i += 1;
            }
            size
        };

        const _: () = assert!(
            DATA_LEN == EXPECTED_SIZE,
            "Shape mismatch: data length does not match shape product"
        );

        // length checked at compile time
        $crate::tensor::Tensor::new($data.to_vec(), $shape).unwrap()
    }};
}

pub mod autograd;
pub mod checkpoint;
pub mod config;
pub mod data;
pub mod error;
pub mod inputs;
pub mod layers;
pub mod losses;
pub mod models;
pub mod nn;
pub mod optim;
pub mod tensor;
pub mod utils;

pub use error::{Error, Result};
pub use tensor::Tensor;
