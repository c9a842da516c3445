//! Ordered name/value field sets exchanged with the gateway.
//!
//! Gateway requests and responses are flat `application/x-www-form-urlencoded`
//! documents whose names may carry array syntax (`browserInfo[deviceType]`).
//! [`FieldSet`] keeps fields in insertion order and allows nested groups so that
//! such parameters can be built structurally and flattened when encoded.

use std::{borrow::Cow, fmt};

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};
use url::form_urlencoded;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Integer value, rendered in decimal.
    Number(i64),
    /// Text value.
    Text(String),
    /// Nested group, rendered as `parent[child]` names.
    Group(FieldSet),
}

impl FieldValue {
    /// Returns the scalar value as text, or `None` for a nested group.
    #[must_use]
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Text(text) => Some(Cow::Borrowed(text)),
            Self::Number(number) => Some(Cow::Owned(number.to_string())),
            Self::Group(_) => None,
        }
    }

    /// Returns the nested group, if this value is one.
    #[must_use]
    pub const fn as_group(&self) -> Option<&FieldSet> {
        match self {
            Self::Group(group) => Some(group),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<FieldSet> for FieldValue {
    fn from(value: FieldSet) -> Self {
        Self::Group(value)
    }
}

/// Insertion-ordered mapping from case-sensitive field names to values.
///
/// Inserting an existing name replaces its value without moving it.
///
/// # Examples
///
/// ```
/// use threeds_gateway::fields::FieldSet;
///
/// let mut fields = FieldSet::new();
/// fields.insert("action", "SALE");
/// fields.insert("amount", 1001);
/// fields.insert("action", "VERIFY");
///
/// assert_eq!(fields.keys().collect::<Vec<_>>(), ["action", "amount"]);
/// assert_eq!(fields.text("amount").as_deref(), Some("1001"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    entries: Vec<(String, FieldValue)>,
}

impl FieldSet {
    /// Creates an empty field set.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Parses an `application/x-www-form-urlencoded` body into a flat field set.
    ///
    /// Array-style names such as `threeDSRequest[threeDSMethodData]` are kept
    /// as literal names. A repeated name keeps its first position and its last
    /// value.
    #[must_use]
    pub fn from_urlencoded(body: &[u8]) -> Self {
        form_urlencoded::parse(body).into_owned().collect()
    }

    /// Inserts or replaces a field, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Inserts a field only if the name is not yet present.
    pub fn insert_if_absent(&mut self, name: &str, value: impl Into<FieldValue>) {
        if !self.contains_key(name) {
            self.entries.push((name.to_owned(), value.into()));
        }
    }

    /// Returns the value for a name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(key, _)| key == name).map(|(_, value)| value)
    }

    /// Returns a scalar value as text.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// Returns true if the name is present.
    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    /// Removes a field, keeping the order of the remaining ones.
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        let index = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Keeps only the fields for which the predicate returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &FieldValue) -> bool) {
        self.entries.retain(|(key, value)| keep(key, value));
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of top-level fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if any top-level name starts with `prefix`.
    #[must_use]
    pub fn any_key_starts_with(&self, prefix: &str) -> bool {
        self.keys().any(|key| key.starts_with(prefix))
    }

    /// Collects the children of `parent`.
    ///
    /// Children may be held as a nested group or, as in a parsed response,
    /// as flat `parent[child]` names; both forms are merged in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_gateway::fields::FieldSet;
    ///
    /// let response = FieldSet::from_urlencoded(
    ///     b"threeDSRequest%5BthreeDSMethodData%5D=abc&threeDSURL=https%3A%2F%2Facs.example.com",
    /// );
    /// let request = response.children("threeDSRequest");
    /// assert_eq!(request.text("threeDSMethodData").as_deref(), Some("abc"));
    /// ```
    #[must_use]
    pub fn children(&self, parent: &str) -> Self {
        let mut out = Self::new();
        for (key, value) in &self.entries {
            if key == parent {
                if let FieldValue::Group(group) = value {
                    out.extend(group.entries.iter().cloned());
                }
            } else if let Some(child) = key
                .strip_prefix(parent)
                .and_then(|rest| rest.strip_prefix('['))
                .and_then(|rest| rest.strip_suffix(']'))
            {
                out.insert(child, value.clone());
            }
        }
        out
    }

    /// Expands nested groups into `parent[child]` names.
    ///
    /// Output is depth-first in insertion order; scalar values are rendered
    /// as text.
    #[must_use]
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            flatten_into(key.clone(), value, &mut out);
        }
        out
    }
}

fn flatten_into(name: String, value: &FieldValue, out: &mut Vec<(String, String)>) {
    match value {
        FieldValue::Text(text) => out.push((name, text.clone())),
        FieldValue::Number(number) => out.push((name, number.to_string())),
        FieldValue::Group(group) => {
            for (child, child_value) in &group.entries {
                flatten_into(format!("{name}[{child}]"), child_value, out);
            }
        }
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FieldSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        fields.extend(iter);
        fields
    }
}

impl<K: Into<String>, V: Into<FieldValue>> Extend<(K, V)> for FieldSet {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<FieldValue>, const N: usize> From<[(K, V); N]> for FieldSet {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl IntoIterator for FieldSet {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for FieldSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldSetVisitor;

        impl<'de> Visitor<'de> for FieldSetVisitor {
            type Value = FieldSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to text, integer or nested map values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FieldSet, A::Error> {
                let mut fields = FieldSet::new();
                while let Some((key, value)) = access.next_entry::<String, FieldValue>()? {
                    fields.insert(key, value);
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldSetVisitor)
    }
}
