//! Input fields: modules turning raw feature columns into embedding tensors.
//!
//! | input | in | out | `length()` |
//! |---|---|---|---|
//! | [`SingleIndexEmbedding`] | `(B, 1)` ids | `(B, 1, E)` | `E` |
//! | [`MultiIndicesFieldAwareEmbedding`] | `(B, N)` ids | `(B, N * N, E)` | `E` |
//! | [`ValueInputs`] | `(B, N)` values | `(B, N, 1)` | `1` |

pub mod multi_indices_field_aware_emb;
pub mod single_index_emb;
pub mod value_inp;

pub use multi_indices_field_aware_emb::MultiIndicesFieldAwareEmbedding;
pub use single_index_emb::SingleIndexEmbedding;
pub use value_inp::ValueInputs;

/// Common surface of input fields.
pub trait Inputs {
    /// Size of the last output axis, i.e. the width a downstream layer sees per field.
    fn length(&self) -> usize;
}
