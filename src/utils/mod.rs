//! Small numeric helpers shared by layers, losses and training loops.

pub mod logging;
pub mod operations;

pub use logging::init_logging;
pub use operations::{combination, inner_product_similarity, regularize, replicate_tensor, squash};
