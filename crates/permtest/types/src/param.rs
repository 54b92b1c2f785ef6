//! Parameter values, ordered parameter mappings and layered sources.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A single parameter value.
///
/// `List` is a sequence of candidates and marks an expansion axis; every
/// other variant is a scalar. `Str` holds raw text that is substituted
/// verbatim into generated code when it could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// Whether this value is a sequence of candidates.
    pub fn is_sequence(&self) -> bool {
        matches!(self, ParamValue::List(_))
    }

    /// Integer view of a scalar, with booleans as 0/1.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            ParamValue::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Text substituted for this value in generated C code.
    pub fn to_c_token(&self) -> String {
        match self {
            ParamValue::Int(v) => v.to_string(),
            ParamValue::Bool(b) => u8::from(*b).to_string(),
            ParamValue::Str(s) => s.clone(),
            ParamValue::List(items) => {
                let inner: Vec<String> = items.iter().map(|v| v.to_c_token()).collect();
                format!("[{}]", inner.join(", "))
            }
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_c_token())
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(v: Vec<T>) -> Self {
        ParamValue::List(v.into_iter().map(Into::into).collect())
    }
}

/// A fully resolved, key-sorted parameter assignment.
pub type Assignment = BTreeMap<String, ParamValue>;

/// An ordered mapping from parameter name to value, as authored.
///
/// Order is preserved because string values may refer to names bound
/// earlier in the same mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMap {
    entries: Vec<(String, ParamValue)>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`; rebinding keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder form of [`ParamMap::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ParamMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for ParamMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// One layer of parameter definitions.
///
/// `Alternatives` lists several base configurations; each one is tried
/// separately and cross-multiplied with the alternatives of every other
/// layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParamSource {
    Single(ParamMap),
    Alternatives(Vec<ParamMap>),
}

impl ParamSource {
    /// The alternatives of this source; a `Single` source has exactly one.
    pub fn alternatives(&self) -> &[ParamMap] {
        match self {
            ParamSource::Single(map) => std::slice::from_ref(map),
            ParamSource::Alternatives(maps) => maps,
        }
    }
}

impl Default for ParamSource {
    fn default() -> Self {
        ParamSource::Single(ParamMap::new())
    }
}

impl From<ParamMap> for ParamSource {
    fn from(map: ParamMap) -> Self {
        ParamSource::Single(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_first_position() {
        let mut map = ParamMap::new().with("B", 1).with("A", 2);
        map.insert("B", 3);
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["B", "A"]);
        assert_eq!(map.get("B"), Some(&ParamValue::Int(3)));
    }

    #[test]
    fn c_tokens() {
        assert_eq!(ParamValue::Int(-4).to_c_token(), "-4");
        assert_eq!(ParamValue::Bool(true).to_c_token(), "1");
        assert_eq!(ParamValue::from("LFS_READ_SIZE").to_c_token(), "LFS_READ_SIZE");
        assert_eq!(ParamValue::from(vec![1, 2]).to_c_token(), "[1, 2]");
    }

    #[test]
    fn single_source_has_one_alternative() {
        let source = ParamSource::Single(ParamMap::new().with("N", 1));
        assert_eq!(source.alternatives().len(), 1);
        assert_eq!(ParamSource::Alternatives(vec![]).alternatives().len(), 0);
    }

    #[test]
    fn param_map_serializes_in_order() {
        let map = ParamMap::new().with("Z", 1).with("A", vec![1, 2]);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"Z":1,"A":[1,2]}"#);
    }

    #[test]
    fn untagged_values_deserialize() {
        let v: ParamValue = serde_json::from_str("[true, 3, \"x\"]").unwrap();
        assert_eq!(
            v,
            ParamValue::List(vec![
                ParamValue::Bool(true),
                ParamValue::Int(3),
                ParamValue::Str("x".into())
            ])
        );
    }
}
