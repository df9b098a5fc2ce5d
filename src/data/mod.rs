//! Tabular data utilities used before training.
//!
//! # Components
//!
//! - **Records**: row-oriented access to tabular data, keyed by column index or name.
//! - **Frame**: a column-named table implementing `Records`.
//! - **subsampling**: drops rows holding over-frequent tokens.
//! - **NegativeSampler**: draws negative item ids for ranking losses.

pub mod frame;
pub mod sampler;
pub mod subsampling;

pub use frame::Frame;
pub use sampler::{MultinomialSampler, NegativeSampler, UniformSampler};
pub use subsampling::{subsampling, Subsampler, SubsamplingFormula};

use crate::error::{Error, Result};
use crate::tensor::TensorError;
use std::fmt;

/// Selects a column of a [`Records`] table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnKey {
    Index(usize),
    Name(String),
}

impl From<usize> for ColumnKey {
    fn from(index: usize) -> Self {
        ColumnKey::Index(index)
    }
}

impl From<&str> for ColumnKey {
    fn from(name: &str) -> Self {
        ColumnKey::Name(name.to_string())
    }
}

impl From<String> for ColumnKey {
    fn from(name: String) -> Self {
        ColumnKey::Name(name)
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKey::Index(i) => write!(f, "{i}"),
            ColumnKey::Name(name) => write!(f, "`{name}`"),
        }
    }
}

/// A table of rows.
///
/// Implementations decide which [`ColumnKey`] kinds they understand; unsupported kinds are
/// reported as [`Error::UnsupportedKey`].
pub trait Records: Sized {
    type Value;

    fn num_rows(&self) -> usize;

    /// The value of every row in the selected column, in row order.
    fn column(&self, key: &ColumnKey) -> Result<Vec<&Self::Value>>;

    /// A new table holding the given rows, in the given order.
    fn select_rows(&self, rows: &[usize]) -> Self;
}

/// Plain row-major arrays: only positional keys are meaningful.
impl<V: Clone> Records for Vec<Vec<V>> {
    type Value = V;

    fn num_rows(&self) -> usize {
        self.len()
    }

    fn column(&self, key: &ColumnKey) -> Result<Vec<&V>> {
        let index = match key {
            ColumnKey::Index(i) => *i,
            ColumnKey::Name(_) => {
                return Err(Error::UnsupportedKey {
                    key: key.to_string(),
                    data: "row arrays",
                })
            }
        };
        self.iter()
            .enumerate()
            .map(|(r, row)| {
                row.get(index).ok_or_else(|| {
                    Error::from(TensorError::IndexOutOfBounds {
                        index: vec![r, index],
                        shape: vec![self.len(), row.len()],
                    })
                })
            })
            .collect()
    }

    fn select_rows(&self, rows: &[usize]) -> Self {
        rows.iter().filter_map(|&r| self.get(r).cloned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_arrays() {
        let data = vec![vec![1, 10], vec![2, 20], vec![3, 30]];
        assert_eq!(data.num_rows(), 3);
        assert_eq!(data.column(&ColumnKey::Index(1)).unwrap(), vec![&10, &20, &30]);
        assert_eq!(data.select_rows(&[2, 0]), vec![vec![3, 30], vec![1, 10]]);
    }

    #[test]
    fn test_row_arrays_reject_names() {
        let data = vec![vec![1, 10]];
        assert!(matches!(
            data.column(&ColumnKey::from("user")),
            Err(Error::UnsupportedKey { .. })
        ));
        assert!(matches!(
            data.column(&ColumnKey::Index(2)),
            Err(Error::Tensor(TensorError::IndexOutOfBounds { .. }))
        ));
    }
}
