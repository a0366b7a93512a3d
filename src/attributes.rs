//! Attribute dictionaries
//!
//! Any entity (and the model itself) can carry named dictionaries of
//! application data. Keys are unique within a dictionary; dictionary names
//! are unique per owner.

use indexmap::IndexMap;

use crate::types::Point3;

/// Attribute value types
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    /// Seconds since the Unix epoch
    Time(i64),
    Point(Point3),
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Type tag used by the binary container
    pub fn type_tag(&self) -> u8 {
        match self {
            AttributeValue::Bool(_) => 1,
            AttributeValue::Int(_) => 2,
            AttributeValue::Double(_) => 3,
            AttributeValue::String(_) => 4,
            AttributeValue::Time(_) => 5,
            AttributeValue::Point(_) => 6,
            AttributeValue::Array(_) => 7,
        }
    }

    /// The value as text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value as an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The value as a double
    pub fn as_double(&self) -> Option<f64> {
        match self {
            AttributeValue::Double(d) => Some(*d),
            AttributeValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Double(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

/// A named key → value mapping
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeDictionary {
    pub name: String,
    values: IndexMap<String, AttributeValue>,
}

impl AttributeDictionary {
    /// Create a new attribute dictionary
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: IndexMap::new(),
        }
    }

    /// Set a value, replacing any previous value for the key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Look up an entry
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.values.get(key)
    }

    /// Remove an entry, returning it
    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.values.shift_remove(key)
    }

    /// Iterate over the keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no entries
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// All dictionaries attached to one owner
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeDictionaries {
    dictionaries: IndexMap<String, AttributeDictionary>,
}

impl AttributeDictionaries {
    /// Create an empty dictionary set
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the dictionary named `name`, creating an empty one if needed
    pub fn get_or_create(&mut self, name: &str) -> &mut AttributeDictionary {
        self.dictionaries
            .entry(name.to_string())
            .or_insert_with(|| AttributeDictionary::new(name))
    }

    /// Look up an entry
    pub fn get(&self, name: &str) -> Option<&AttributeDictionary> {
        self.dictionaries.get(name)
    }

    /// Look up an entry mutably
    pub fn get_mut(&mut self, name: &str) -> Option<&mut AttributeDictionary> {
        self.dictionaries.get_mut(name)
    }

    /// Insert a whole dictionary, replacing one with the same name
    pub fn insert(&mut self, dictionary: AttributeDictionary) {
        self.dictionaries.insert(dictionary.name.clone(), dictionary);
    }

    /// Remove an entry, returning it
    pub fn remove(&mut self, name: &str) -> Option<AttributeDictionary> {
        self.dictionaries.shift_remove(name)
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = &AttributeDictionary> {
        self.dictionaries.values()
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.dictionaries.len()
    }

    /// Check if there are no entries
    pub fn is_empty(&self) -> bool {
        self.dictionaries.is_empty()
    }

    /// Compare contents ignoring the order dictionaries were created in
    pub fn same_contents(&self, other: &AttributeDictionaries) -> bool {
        self.len() == other.len()
            && self.iter().all(|d| {
                other.get(&d.name).is_some_and(|o| {
                    o.len() == d.len() && d.iter().all(|(k, v)| o.get(k) == Some(v))
                })
            })
    }
}
