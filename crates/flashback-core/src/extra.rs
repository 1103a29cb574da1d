//! Structured key/value payloads carried by spawns, items and blocks.
//!
//! [`ExtraData`] is an insertion-ordered compound of named [`ExtraValue`]s.
//! Encoding preserves insertion order, so a decoded compound re-encodes to
//! the same bytes.

use indexmap::IndexMap;

/// Deepest nesting of lists and compounds accepted by the codec.
pub const MAX_DEPTH: usize = 32;

/// A single structured value.
#[derive(Clone, Debug, PartialEq)]
pub enum ExtraValue {
    /// Signed 8-bit integer.
    Byte(i8),
    /// Signed 16-bit integer.
    Short(i16),
    /// Signed 32-bit integer.
    Int(i32),
    /// Signed 64-bit integer.
    Long(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Ordered list of values (element types may differ).
    List(Vec<ExtraValue>),
    /// Nested compound.
    Compound(ExtraData),
}

impl ExtraValue {
    /// Nesting depth of this value: 0 for scalars.
    pub fn depth(&self) -> usize {
        match self {
            Self::List(items) => 1 + items.iter().map(ExtraValue::depth).max().unwrap_or(0),
            Self::Compound(c) => 1 + c.depth(),
            _ => 0,
        }
    }
}

/// Insertion-ordered compound of named values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtraData {
    entries: IndexMap<String, ExtraValue>,
}

impl ExtraData {
    /// An empty compound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: ExtraValue) -> Option<ExtraValue> {
        self.entries.insert(key.into(), value)
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: ExtraValue) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&ExtraValue> {
        self.entries.get(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the compound has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtraValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Deepest nesting below this compound: 0 when every value is a scalar.
    pub fn depth(&self) -> usize {
        self.entries
            .values()
            .map(ExtraValue::depth)
            .max()
            .unwrap_or(0)
    }
}

impl FromIterator<(String, ExtraValue)> for ExtraData {
    fn from_iter<I: IntoIterator<Item = (String, ExtraValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
