//! TeamTalk wire message types.
//!
//! A wire line is an event name followed by `key=value` fields:
//!
//! ```text
//! addchannel chanid=5 channel="Lobby" topics=[1,2,3]
//! ```
//!
//! Values are integers, quoted strings, or bracketed lists of either.
//! [`Message`] implements [`FromStr`](std::str::FromStr) for decoding and
//! [`Display`](std::fmt::Display) for encoding; the grammar details live in
//! the [`parse`] and serialize submodules.

mod parse;
mod serialize;

use smallvec::SmallVec;

/// An element of a bracketed list value.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scalar {
    /// All-digit element.
    Int(i64),
    /// Any other element, kept as literal text.
    Text(String),
}

/// A single field value.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Bare all-digit token.
    Int(i64),
    /// Quoted string (quotes stripped) or unrecognized passthrough token.
    Text(String),
    /// Bracketed comma-separated list.
    List(Vec<Scalar>),
}

impl Value {
    /// Numeric view of this value.
    ///
    /// Text is parsed as a fallback so signed values the tokenizer left as
    /// literals (e.g. `-1`) still compare as numbers.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Text(s) => s.parse().ok(),
            Value::List(_) => None,
        }
    }

    /// Floating-point view, for fractional parameters like `usertimeout`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Text(s) => s.parse().ok(),
            Value::List(_) => None,
        }
    }

    /// Text view of this value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// List view of this value.
    pub fn as_list(&self) -> Option<&[Scalar]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Scalar>> for Value {
    fn from(items: Vec<Scalar>) -> Self {
        Value::List(items)
    }
}

/// Insertion-ordered field map.
///
/// Inserting an existing key replaces the value in place, keeping the key's
/// original position; new keys append. Most messages carry well under eight
/// fields, so storage is inline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fields(SmallVec<[(String, Value); 8]>);

impl Fields {
    /// Create an empty field map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Look up a field by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Numeric view of a field (see [`Value::as_int`]).
    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }

    /// Text view of a field.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_text)
    }

    /// Whether a field is present.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove a field, returning its value if present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(pos).1)
    }

    /// Insert every field of `other` into `self`.
    pub fn merge(&mut self, other: &Fields) {
        for (key, value) in other.iter() {
            self.insert(key.clone(), value.clone());
        }
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = &'a (String, Value);
    type IntoIter = std::slice::Iter<'a, (String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A decoded protocol message: an event name plus its fields.
///
/// The event name is kept as received; the dispatch loop lowercases it
/// before handler lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// First token of the line.
    pub event: String,
    /// Remaining `key=value` tokens, in wire order.
    pub fields: Fields,
}

impl Message {
    /// Create a message with no fields.
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            fields: Fields::new(),
        }
    }

    /// Builder-style field append.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key, value);
        self
    }
}

pub(crate) fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_in_place() {
        let mut fields = Fields::new();
        fields.insert("a", 1);
        fields.insert("b", 2);
        fields.insert("a", 3);

        let keys: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(fields.int("a"), Some(3));
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut base = Fields::new();
        base.insert("chanid", 5);
        base.insert("channel", "Lobby");

        let mut patch = Fields::new();
        patch.insert("channel", "Lounge");
        patch.insert("topic", "news");
        base.merge(&patch);

        let keys: Vec<&str> = base.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["chanid", "channel", "topic"]);
        assert_eq!(base.text("channel"), Some("Lounge"));
    }

    #[test]
    fn test_value_numeric_coercion() {
        assert_eq!(Value::Int(7).as_int(), Some(7));
        assert_eq!(Value::Text("-1".to_string()).as_int(), Some(-1));
        assert_eq!(Value::Text("0.5".to_string()).as_f64(), Some(0.5));
        assert_eq!(Value::List(vec![]).as_int(), None);
    }
}
