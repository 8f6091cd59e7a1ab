use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered attribute mapping of a declared node or resource.
pub type Attributes = IndexMap<String, Value>;

/// An attribute value: a string, a nested mapping, or an ordered list of
/// sub-resource blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    List(Vec<Attributes>),
    Map(Attributes),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Attributes]> {
        match self {
            Value::List(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Attributes> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Attributes> for Value {
    fn from(value: Attributes) -> Self {
        Value::Map(value)
    }
}

impl From<Vec<Attributes>> for Value {
    fn from(value: Vec<Attributes>) -> Self {
        Value::List(value)
    }
}

/// Keys starting with `_` hold bookkeeping (`_geo_id`, `_terraform_id`, ...)
/// and never reach the provisioning tool.
pub fn is_internal(key: &str) -> bool {
    key.starts_with('_')
}

/// Copies `attributes` without internal keys, at every nesting level.
pub fn without_internal(attributes: &Attributes) -> Attributes {
    attributes
        .iter()
        .filter(|(key, _)| !is_internal(key))
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => Value::String(s.clone()),
                Value::Map(map) => Value::Map(without_internal(map)),
                Value::List(entries) => {
                    Value::List(entries.iter().map(without_internal).collect())
                }
            };
            (key.clone(), value)
        })
        .collect()
}

/// Builds an [`Attributes`] from string pairs.
pub fn attributes<K, V, I>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
