//! Where tensor elements live and how they are held.
//!
//! Kernels operate on contiguous slices, so every storage must expose its elements as one. A
//! [`Device`] picks the storage type; the crate only runs on the host, so [`Cpu`] with
//! `Vec<T>` is the single pairing.

use crate::tensor::TensorElem;
use std::fmt::Debug;

/// The container holding a tensor's elements.
pub trait Storage<T>: Clone + Debug + Send + Sync {
    fn as_slice(&self) -> &[T];

    fn as_mut_slice(&mut self) -> &mut [T];

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: TensorElem> Storage<T> for Vec<T> {
    fn as_slice(&self) -> &[T] {
        self
    }
    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }
    fn len(&self) -> usize {
        self.len()
    }
}

/// Marker selecting a tensor's [`Storage`].
pub trait Device: Clone + Debug + PartialEq + Send + Sync {
    type Storage<T>: Storage<T>
    where
        T: TensorElem;

    /// Shown in a tensor's `Debug` output.
    fn name(&self) -> &'static str;
}

/// Host memory; kernels split work over the global rayon pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cpu;

impl Device for Cpu {
    type Storage<T>
        = Vec<T>
    where
        T: TensorElem;

    fn name(&self) -> &'static str {
        "cpu"
    }
}
