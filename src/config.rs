//! JSON loading for layer, model and loss configurations.
//!
//! Every `*Config` in the crate derives `serde::Deserialize`; these helpers read one from a
//! string or file. Validation stays with the config type (`validate()`) and runs when the
//! layer is built.

use crate::error::Result;
use serde::de::DeserializeOwned;
use std::path::Path;

pub fn from_json_str<C: DeserializeOwned>(json: &str) -> Result<C> {
    Ok(serde_json::from_str(json)?)
}

pub fn from_json_file<C: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<C> {
    let text = std::fs::read_to_string(path)?;
    from_json_str(&text)
}
