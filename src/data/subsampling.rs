use super::{ColumnKey, Records};
use crate::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use tracing::{debug, warn};

/// Drop-probability formula for [`subsampling`], with `f` the token frequency and `t` the
/// threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubsamplingFormula {
    /// `1 - sqrt(t / f)` (Mikolov et al., 2013).
    #[default]
    Paper,
    /// `(f - t) / f - sqrt(t / f)`, as in the reference word2vec code.
    Code,
}

impl SubsamplingFormula {
    pub fn drop_probability(&self, frequency: f64, threshold: f64) -> f64 {
        let root = (threshold / frequency).sqrt();
        match self {
            SubsamplingFormula::Paper => 1.0 - root,
            SubsamplingFormula::Code => (frequency - threshold) / frequency - root,
        }
    }
}

impl FromStr for SubsamplingFormula {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "paper" => Ok(SubsamplingFormula::Paper),
            "code" => Ok(SubsamplingFormula::Code),
            _ => Err(Error::UnsupportedFormula(s.to_string())),
        }
    }
}

impl fmt::Display for SubsamplingFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubsamplingFormula::Paper => "paper",
            SubsamplingFormula::Code => "code",
        })
    }
}

/// Drops occurrences of the most frequent tokens in column `key`.
///
/// Each token's frequency is `f = count / rows`; each row draws `u ~ U[0, 1)` and is kept iff
/// `u` exceeds the drop probability of its token. Tokens with `f <= t` are never dropped.
/// Row order is preserved.
pub fn subsampling<D, R>(
    data: &D,
    key: impl Into<ColumnKey>,
    formula: SubsamplingFormula,
    threshold: f64,
    rng: &mut R,
) -> Result<D>
where
    D: Records,
    D::Value: Eq + Hash,
    R: Rng + ?Sized,
{
    let key = key.into();
    let column = data.column(&key)?;
    let total = column.len();

    let mut counts: HashMap<&D::Value, usize> = HashMap::new();
    for &token in &column {
        *counts.entry(token).or_insert(0) += 1;
    }
    let drop_probability: HashMap<&D::Value, f64> = counts
        .iter()
        .map(|(&token, &count)| {
            let frequency = count as f64 / total as f64;
            (token, formula.drop_probability(frequency, threshold))
        })
        .collect();

    let kept: Vec<usize> = column
        .iter()
        .enumerate()
        .filter(|(_, token)| rng.random::<f64>() > drop_probability[*token])
        .map(|(row, _)| row)
        .collect();

    debug!(
        column = %key,
        %formula,
        threshold,
        rows = total,
        unique_tokens = counts.len(),
        kept = kept.len(),
        "subsampled rows"
    );
    if kept.is_empty() && total > 0 {
        warn!(column = %key, threshold, "subsampling dropped every row");
    }
    Ok(data.select_rows(&kept))
}

/// Serializable subsampling settings; defaults to the paper formula with `t = 1e-5`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subsampler {
    pub formula: SubsamplingFormula,
    pub threshold: f64,
}

impl Default for Subsampler {
    fn default() -> Self {
        Self {
            formula: SubsamplingFormula::Paper,
            threshold: 1e-5,
        }
    }
}

impl Subsampler {
    pub fn new(formula: SubsamplingFormula, threshold: f64) -> Self {
        Self { formula, threshold }
    }

    pub fn apply<D, R>(&self, data: &D, key: impl Into<ColumnKey>, rng: &mut R) -> Result<D>
    where
        D: Records,
        D::Value: Eq + Hash,
        R: Rng + ?Sized,
    {
        subsampling(data, key, self.formula, self.threshold, rng)
    }
}
