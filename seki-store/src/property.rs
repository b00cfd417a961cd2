//! Value shapes a store property may hold
//!
//! Properties are explicit, typed shapes rather than an open-ended bag:
//! plain JSON values, zero-argument producers evaluated lazily on read,
//! nested-store descriptors materialized on first read, and nested stores.

use crate::store::Store;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Flat path→value mapping carried by a descriptor and accepted by
/// [`Store::write_entries`].
pub type FlatEntries = BTreeMap<String, Value>;

/// Zero-argument producer evaluated on read.
pub type ProducerFn = dyn Fn() -> Node + Send + Sync;

/// A property of a store.
#[derive(Clone)]
pub enum Property {
    /// Plain structured value, stored and returned as-is.
    Value(Value),

    /// Deferred value: invoked with no arguments on every read that
    /// traverses it.
    Producer(Arc<ProducerFn>),

    /// Nested-store descriptor: a flat path→value mapping. The first read
    /// materializes it into a fresh base-kind [`Store`] (bulk-loaded via
    /// `write_entries`) and caches that store in place of the descriptor.
    Descriptor(FlatEntries),

    /// Nested store.
    Store(Store),
}

impl Property {
    /// Wrap a producer closure.
    pub fn producer<F>(produce: F) -> Self
    where
        F: Fn() -> Node + Send + Sync + 'static,
    {
        Property::Producer(Arc::new(produce))
    }

    /// Build a descriptor from flat path→value entries.
    pub fn descriptor<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Property::Descriptor(
            entries
                .into_iter()
                .map(|(path, value)| (path.into(), value))
                .collect(),
        )
    }

    /// Plain-JSON rendering used when a property is assigned inside a plain
    /// value subtree, where deferred shapes cannot live. Descriptors render
    /// as their literal `{"store": …}` object; producers and stores have no
    /// structured rendering and become `null`.
    pub(crate) fn to_json(&self) -> Value {
        match self {
            Property::Value(value) => value.clone(),
            Property::Descriptor(entries) => {
                let mapping: Map<String, Value> =
                    entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                let mut wrapper = Map::new();
                wrapper.insert("store".to_string(), Value::Object(mapping));
                Value::Object(wrapper)
            }
            Property::Producer(_) | Property::Store(_) => {
                tracing::warn!("deferred property flattened to null inside a plain value subtree");
                Value::Null
            }
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Property::Producer(_) => f.write_str("Producer(..)"),
            Property::Descriptor(entries) => f.debug_tuple("Descriptor").field(entries).finish(),
            Property::Store(store) => f.debug_tuple("Store").field(store).finish(),
        }
    }
}

impl From<Value> for Property {
    fn from(value: Value) -> Self {
        Property::Value(value)
    }
}

impl From<Store> for Property {
    fn from(store: Store) -> Self {
        Property::Store(store)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Property::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Property {
    fn from(value: String) -> Self {
        Property::Value(Value::String(value))
    }
}

impl From<bool> for Property {
    fn from(value: bool) -> Self {
        Property::Value(Value::Bool(value))
    }
}

impl From<i64> for Property {
    fn from(value: i64) -> Self {
        Property::Value(Value::from(value))
    }
}

impl From<f64> for Property {
    fn from(value: f64) -> Self {
        Property::Value(Value::from(value))
    }
}

/// Resolved node yielded by one traversal step (and by [`Store::read`]):
/// either a plain value or a store.
#[derive(Clone)]
pub enum Node {
    Value(Value),
    Store(Store),
}

impl Node {
    /// The plain value, if this node is one.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Node::Value(value) => Some(value),
            Node::Store(_) => None,
        }
    }

    /// The store, if this node is one.
    pub fn into_store(self) -> Option<Store> {
        match self {
            Node::Value(_) => None,
            Node::Store(store) => Some(store),
        }
    }

    pub fn is_store(&self) -> bool {
        matches!(self, Node::Store(_))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Node::Store(store) => f.debug_tuple("Store").field(store).finish(),
        }
    }
}
