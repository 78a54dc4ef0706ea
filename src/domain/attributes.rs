//! Raw attribute maps produced by the extractors
//!
//! Every extractor emits the same shape: an insertion-ordered list of
//! human-readable attribute labels, each either present with a value or
//! absent. Absence is explicit (`None`) so a literal text value such as
//! `"NaN"` can never be confused with a missing attribute.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeEntry {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawAttributeMap {
    entries: Vec<AttributeEntry>,
}

impl RawAttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map declaring every label as absent, in the given order.
    pub fn with_absent<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut map = Self::new();
        for label in labels {
            map.insert(label, None);
        }
        map
    }

    /// Set a label, replacing any previous value but keeping its position.
    pub fn insert(&mut self, name: &str, value: Option<String>) {
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.value = value,
            None => self.entries.push(AttributeEntry {
                name: name.to_string(),
                value,
            }),
        }
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.insert(name, Some(value.into()));
    }

    /// Value of a present attribute.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .and_then(|entry| entry.value.as_deref())
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether the label appears at all, present or absent.
    pub fn declares(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry.value.as_deref()))
    }

    pub fn present(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.value.as_deref().map(|value| (entry.name.as_str(), value)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Apply `f` to every present value.
    pub fn map_values(&mut self, mut f: impl FnMut(&str) -> String) {
        for entry in &mut self.entries {
            if let Some(value) = entry.value.as_mut() {
                *value = f(value);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn present_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.value.is_some()).count()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RawAttributeMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.set(name.as_ref(), value);
        }
        map
    }
}
