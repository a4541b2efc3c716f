//! Typed open attribute maps carried by entities.
//!
//! Attributes are scenario-defined: the engine never interprets them except
//! where a decide condition names a key. The map keeps insertion order so
//! reports and serialized output are deterministic.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An attribute value attached to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Integer-valued attribute.
    Int(i64),
    /// Real-valued attribute.
    Real(f64),
    /// Text attribute.
    Text(String),
    /// Boolean flag.
    Flag(bool),
}

impl AttrValue {
    /// View the value as a real number, if it is numeric.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Real(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Real(v) => write!(f, "{v}"),
            AttrValue::Text(v) => write!(f, "{v}"),
            AttrValue::Flag(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Real(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Flag(v)
    }
}

/// Open attribute map, string key to typed value.
pub type AttrMap = IndexMap<String, AttrValue>;
