//! Run-scoped variables.
//!
//! Nodes exchange data through a string-keyed bag of scalar values. Reads go
//! through the `require_*` accessors so a missing or mistyped variable fails
//! with a descriptive [`NodeError`] instead of a silent default.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::NodeError;

/// A scalar variable value: string, number or boolean.
///
/// Serialised untagged, so it reads and writes as the plain JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Variable {
    Bool(bool),
    Number(f64),
    String(String),
}

impl Variable {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            // f64's Display already drops a trailing ".0" for integral values.
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Variable {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Variable {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Variable {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Variable {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Ordered variable bag. Later writes to the same key overwrite earlier ones.
///
/// Deserialising drops `null` entries, so a submitted `"city": null` reads
/// the same as an absent field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Option<Variable>>",
    into = "BTreeMap<String, Variable>"
)]
pub struct Variables(BTreeMap<String, Variable>);

impl From<BTreeMap<String, Option<Variable>>> for Variables {
    fn from(raw: BTreeMap<String, Option<Variable>>) -> Self {
        raw.into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect()
    }
}

impl From<Variables> for BTreeMap<String, Variable> {
    fn from(vars: Variables) -> Self {
        vars.0
    }
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Variable>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Variable> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.0.iter()
    }

    /// Fetch a variable that must exist.
    pub fn require(&self, key: &str) -> Result<&Variable, NodeError> {
        self.get(key)
            .ok_or_else(|| NodeError::MissingInput(key.to_owned()))
    }

    pub fn require_str(&self, key: &str) -> Result<&str, NodeError> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| mismatch(key, "a string"))
    }

    pub fn require_number(&self, key: &str) -> Result<f64, NodeError> {
        self.require(key)?
            .as_number()
            .ok_or_else(|| mismatch(key, "a number"))
    }

    pub fn require_bool(&self, key: &str) -> Result<bool, NodeError> {
        self.require(key)?
            .as_bool()
            .ok_or_else(|| mismatch(key, "a boolean"))
    }
}

impl FromIterator<(String, Variable)> for Variables {
    fn from_iter<I: IntoIterator<Item = (String, Variable)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn mismatch(name: &str, expected: &'static str) -> NodeError {
    NodeError::TypeMismatch {
        name: name.to_owned(),
        expected,
    }
}
