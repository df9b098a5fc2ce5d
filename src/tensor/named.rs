//! Named-axis bookkeeping.
//!
//! Layers document their inputs as e.g. `(B, N, E)`. [`NamedShape`] attaches those names to a
//! concrete shape so a layer can look sizes up by meaning and report which axis disagrees.

use super::{Cpu, Result, Tensor, TensorElem, TensorError};
use std::fmt;

/// Semantic axis names used across inputs, layers and models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// `B`
    Batch,
    /// `N`
    Field,
    /// `E`
    Embed,
    /// `O`
    Output,
    /// `L`, the length of a sequence or of a candidate group.
    Length,
}

impl Axis {
    pub fn symbol(&self) -> &'static str {
        match self {
            Axis::Batch => "B",
            Axis::Field => "N",
            Axis::Embed => "E",
            Axis::Output => "O",
            Axis::Length => "L",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A shape whose dimensions carry [`Axis`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedShape<const RANK: usize> {
    names: [Axis; RANK],
    dims: [usize; RANK],
}

impl<const RANK: usize> NamedShape<RANK> {
    /// Names `dims` with `names`. Names must be unique.
    pub fn new(names: [Axis; RANK], dims: [usize; RANK]) -> Result<Self> {
        for (i, a) in names.iter().enumerate() {
            if names[..i].contains(a) {
                return Err(TensorError::Unsupported(format!(
                    "axis {a} named twice in {}",
                    Self::layout(&names)
                )));
            }
        }
        Ok(Self { names, dims })
    }

    pub fn names(&self) -> &[Axis; RANK] {
        &self.names
    }

    pub fn dims(&self) -> &[usize; RANK] {
        &self.dims
    }

    /// Position of `axis` in the layout.
    pub fn index_of(&self, axis: Axis) -> Result<usize> {
        self.names
            .iter()
            .position(|a| *a == axis)
            .ok_or_else(|| TensorError::Unsupported(format!("no axis {axis} in {self}")))
    }

    pub fn size(&self, axis: Axis) -> Result<usize> {
        Ok(self.dims[self.index_of(axis)?])
    }

    /// Checks that `axis` has exactly `expected` elements.
    pub fn expect(&self, axis: Axis, expected: usize) -> Result<&Self> {
        let got = self.size(axis)?;
        if got != expected {
            return Err(TensorError::AxisMismatch {
                axis,
                expected,
                got,
            });
        }
        Ok(self)
    }

    /// Renames one axis, keeping its size.
    pub fn rename(mut self, from: Axis, to: Axis) -> Result<Self> {
        let idx = self.index_of(from)?;
        self.names[idx] = to;
        NamedShape::new(self.names, self.dims)
    }

    fn layout(names: &[Axis]) -> String {
        let symbols: Vec<&str> = names.iter().map(Axis::symbol).collect();
        format!("({})", symbols.join(", "))
    }
}

impl<const RANK: usize> fmt::Display for NamedShape<RANK> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .names
            .iter()
            .zip(self.dims.iter())
            .map(|(a, d)| format!("{a}={d}"))
            .collect();
        write!(f, "({})", parts.join(", "))
    }
}

impl<T: TensorElem, const RANK: usize> Tensor<T, RANK, Cpu> {
    /// Attaches axis names to this tensor's shape.
    pub fn named(&self, names: [Axis; RANK]) -> Result<NamedShape<RANK>> {
        NamedShape::new(names, *self.shape())
    }
}
