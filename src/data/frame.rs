use super::{ColumnKey, Records};
use crate::error::{Error, Result};
use crate::tensor::TensorError;

/// A row-major table with named columns.
///
/// # Examples
///
/// ```rust
/// use recsys_rs::data::{ColumnKey, Frame, Records};
///
/// let frame = Frame::new(
///     vec!["user".into(), "item".into()],
///     vec![vec!["u1", "i1"], vec!["u2", "i1"]],
/// )
/// .unwrap();
/// let items = frame.column(&ColumnKey::from("item")).unwrap();
/// assert_eq!(items, vec![&"i1", &"i1"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<V> {
    columns: Vec<String>,
    rows: Vec<Vec<V>>,
}

impl<V: Clone> Frame<V> {
    /// # Errors
    ///
    /// `ShapeMismatch` if a row's width differs from the number of columns.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<V>>) -> Result<Self> {
        if let Some(row) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(TensorError::ShapeMismatch {
                expected: vec![columns.len()],
                got: vec![row.len()],
            }
            .into());
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<V>] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    fn resolve(&self, key: &ColumnKey) -> Result<usize> {
        match key {
            ColumnKey::Index(i) if *i < self.columns.len() => Ok(*i),
            ColumnKey::Index(i) => Err(TensorError::IndexOutOfBounds {
                index: vec![*i],
                shape: vec![self.columns.len()],
            }
            .into()),
            ColumnKey::Name(name) => self.column_index(name),
        }
    }
}

impl<V: Clone> Records for Frame<V> {
    type Value = V;

    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn column(&self, key: &ColumnKey) -> Result<Vec<&V>> {
        let index = self.resolve(key)?;
        Ok(self.rows.iter().map(|row| &row[index]).collect())
    }

    fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: rows.iter().filter_map(|&r| self.rows.get(r).cloned()).collect(),
        }
    }
}
