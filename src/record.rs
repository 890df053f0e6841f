//! Named, order-preserving record containers carried by messages and contexts.
//!
//! A [`RecordDict`] holds two sections, `config_records` and `metric_records`.
//! Each section keeps entries in insertion order, so the order in which mods
//! append entries is observable afterwards.
//!
//! ```rust
//! use sepal::{ConfigRecord, RecordDict};
//!
//! let mut content = RecordDict::new();
//! content.config_records.insert("mod1", ConfigRecord::new());
//! content.config_records.insert("mod2", ConfigRecord::new());
//! assert_eq!(content.config_records.keys().collect::<Vec<_>>(), ["mod1", "mod2"]);
//! ```

use std::ops::{Deref, DerefMut, Index};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, Violation};

// ── Values ────────────────────────────────────────────────────────────────────

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self { Self::Bool(v) }
}
impl From<i64> for Scalar {
    fn from(v: i64) -> Self { Self::Int(v) }
}
impl From<i32> for Scalar {
    fn from(v: i32) -> Self { Self::Int(v.into()) }
}
impl From<f64> for Scalar {
    fn from(v: f64) -> Self { Self::Float(v) }
}
impl From<&str> for Scalar {
    fn from(v: &str) -> Self { Self::Str(v.to_owned()) }
}
impl From<String> for Scalar {
    fn from(v: String) -> Self { Self::Str(v) }
}
impl From<Vec<u8>> for Scalar {
    fn from(v: Vec<u8>) -> Self { Self::Bytes(v) }
}

/// A single metric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    Int(i64),
    Float(f64),
}

impl Metric {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

impl From<i64> for Metric {
    fn from(v: i64) -> Self { Self::Int(v) }
}
impl From<f64> for Metric {
    fn from(v: f64) -> Self { Self::Float(v) }
}

impl PartialEq<f64> for Metric {
    fn eq(&self, other: &f64) -> bool { self.as_f64() == *other }
}

// ── Records ───────────────────────────────────────────────────────────────────

/// Declares a record type that is an ordered `name -> value` map.
macro_rules! record {
    ($(#[$doc:meta])* $name:ident, $value:ty, $section:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(IndexMap<String, $value>);

        impl $name {
            pub fn new() -> Self { Self::default() }
        }

        impl Record for $name {
            const SECTION: &'static str = $section;
        }

        impl Deref for $name {
            type Target = IndexMap<String, $value>;
            fn deref(&self) -> &Self::Target { &self.0 }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target { &mut self.0 }
        }

        impl<K, V> FromIterator<(K, V)> for $name
        where
            K: Into<String>,
            V: Into<$value>,
        {
            fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
                Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
            }
        }

        impl<K, V, const N: usize> From<[(K, V); N]> for $name
        where
            K: Into<String>,
            V: Into<$value>,
        {
            fn from(entries: [(K, V); N]) -> Self {
                entries.into_iter().collect()
            }
        }
    };
}

record!(
    /// Configuration values, e.g. hyper-parameters sent with a `train` message.
    ConfigRecord, Scalar, "config_records"
);
record!(
    /// Numeric results, e.g. loss and accuracy, or counters kept in context state.
    MetricRecord, Metric, "metric_records"
);

/// A record type that can live in a [`TypedRecords`] section.
pub trait Record {
    /// Section name used in diagnostics.
    const SECTION: &'static str;
}

// ── Sections ──────────────────────────────────────────────────────────────────

/// One ordered section of a [`RecordDict`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypedRecords<T> {
    entries: IndexMap<String, T>,
}

impl<T> Default for TypedRecords<T> {
    fn default() -> Self { Self { entries: IndexMap::new() } }
}

impl<T: Record> TypedRecords<T> {
    /// Inserts or overwrites `name`.
    ///
    /// An overwritten entry keeps its original position. Returns the previous
    /// record, if any.
    pub fn insert(&mut self, name: impl Into<String>, record: T) -> Option<T> {
        self.entries.insert(name.into(), record)
    }

    /// Inserts `name`, rejecting a duplicate instead of overwriting it.
    pub fn try_insert(&mut self, name: impl Into<String>, record: T) -> Result<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(Violation::DuplicateRecord { section: T::SECTION, name }.into());
        }
        self.entries.insert(name, record);
        Ok(())
    }
}

impl<T> TypedRecords<T> {
    pub fn get(&self, name: &str) -> Option<&T> { self.entries.get(name) }
    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> { self.entries.get_mut(name) }
    pub fn contains(&self, name: &str) -> bool { self.entries.contains_key(name) }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Removes `name`, preserving the order of the remaining entries.
    pub fn remove(&mut self, name: &str) -> Option<T> { self.entries.shift_remove(name) }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Panics if `name` is absent, like indexing a map.
impl<T> Index<&str> for TypedRecords<T> {
    type Output = T;
    fn index(&self, name: &str) -> &T {
        self.entries
            .get(name)
            .unwrap_or_else(|| panic!("no record named `{name}`"))
    }
}

/// The payload container of a message, and the state store of a context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordDict {
    #[serde(default)]
    pub config_records: TypedRecords<ConfigRecord>,
    #[serde(default)]
    pub metric_records: TypedRecords<MetricRecord>,
}

impl RecordDict {
    pub fn new() -> Self { Self::default() }

    pub fn is_empty(&self) -> bool {
        self.config_records.is_empty() && self.metric_records.is_empty()
    }
}
