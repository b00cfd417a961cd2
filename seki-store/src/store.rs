//! The store: a policy-gated, nestable key/value namespace
//!
//! A [`Store`] is both a namespace of named properties and a policy
//! boundary. Reads and writes are gated on the first path segment against
//! the restriction table of the store's kind; unrestricted keys fall back
//! to the instance's default policy. Stores nest: a property may hold
//! another store, and a path descends across the boundary.

use crate::audit::{AccessEvent, AccessOutcome, AuditSink, NullAuditSink};
use crate::path;
use crate::policy::registry::{self, StoreKind};
use crate::policy::resolver::permits;
use crate::property::{Node, Property};
use seki_types::{AccessMode, Permission};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Error raised when the permission gate denies an access.
///
/// Raised before any traversal or mutation: a denied call has no side
/// effects. A missing key is not an error (see [`Store::read`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("reading key '{key}' is not allowed")]
    ReadDenied { key: String },

    #[error("writing key '{key}' is not allowed")]
    WriteDenied { key: String },
}

impl AccessError {
    /// The key that failed the gate.
    pub fn key(&self) -> &str {
        match self {
            AccessError::ReadDenied { key } | AccessError::WriteDenied { key } => key,
        }
    }

    /// The access mode that was requested.
    pub fn mode(&self) -> AccessMode {
        match self {
            AccessError::ReadDenied { .. } => AccessMode::Read,
            AccessError::WriteDenied { .. } => AccessMode::Write,
        }
    }
}

/// A permission-gated hierarchical key/value store.
///
/// `Store` is a cheap-clone handle: clones share the same property mapping
/// and default policy, which is what lets a store be held as a property of
/// another store and be returned from [`Store::read`] at the same time.
///
/// Restrictions are not held by the instance. Every check consults the
/// live table of the store's [`StoreKind`], so declarations made after an
/// instance exists apply to it immediately.
///
/// # Example
///
/// ```rust
/// use seki_store::{Restrictions, Store, StoreKind};
/// use serde_json::json;
///
/// let kind = StoreKind::named("quickstart-session");
/// Restrictions::for_kind(&kind).deny("secret").apply();
///
/// let store = Store::of_kind(kind);
/// store.write("name", json!("alice")).unwrap();
/// assert_eq!(
///     store.read("name").unwrap().and_then(|node| node.into_value()),
///     Some(json!("alice"))
/// );
/// assert!(store.write("secret", json!("x")).is_err());
/// assert_eq!(store.read("missing:path").unwrap().map(|_| ()), None);
/// ```
#[derive(Clone)]
pub struct Store {
    kind: StoreKind,
    inner: Arc<RwLock<StoreInner>>,
}

struct StoreInner {
    properties: BTreeMap<String, Property>,
    default_policy: Permission,
    audit: Arc<dyn AuditSink>,
}

impl Store {
    /// Create an empty store of the base kind.
    pub fn new() -> Self {
        Self::of_kind(StoreKind::base())
    }

    /// Create an empty store of the given kind, creating the kind's
    /// restriction table if this is the first instance.
    pub fn of_kind(kind: StoreKind) -> Self {
        registry::ensure_kind(&kind);
        Self {
            kind,
            inner: Arc::new(RwLock::new(StoreInner {
                properties: BTreeMap::new(),
                default_policy: Permission::ReadWrite,
                audit: Arc::new(NullAuditSink),
            })),
        }
    }

    /// The store's kind.
    pub fn kind(&self) -> &StoreKind {
        &self.kind
    }

    /// The fallback permission for keys without a declared restriction.
    /// Defaults to [`Permission::ReadWrite`].
    pub fn default_policy(&self) -> Permission {
        self.inner.read().unwrap().default_policy
    }

    /// Replace the default policy.
    pub fn set_default_policy(&self, policy: Permission) {
        self.inner.write().unwrap().default_policy = policy;
    }

    /// Builder form of [`Store::set_default_policy`].
    pub fn with_default_policy(self, policy: Permission) -> Self {
        self.set_default_policy(policy);
        self
    }

    /// Seed a property while building the store, bypassing the write gate.
    ///
    /// This is the construction-time analogue of initializing a field when
    /// a kind is defined: restricted keys (holding, say, a nested store)
    /// have to receive their value somewhere, and `write` would refuse.
    pub fn with_property(self, key: impl Into<String>, property: impl Into<Property>) -> Self {
        self.inner
            .write()
            .unwrap()
            .properties
            .insert(key.into(), property.into());
        self
    }

    /// Route access events to the given sink. Default is the null sink.
    pub fn set_audit(&self, sink: impl AuditSink + 'static) {
        self.inner.write().unwrap().audit = Arc::new(sink);
    }

    /// Builder form of [`Store::set_audit`].
    pub fn with_audit(self, sink: impl AuditSink + 'static) -> Self {
        self.set_audit(sink);
        self
    }

    /// Whether `key` may be read, judged against the own kind's table and
    /// this instance's default policy only. No nested fallback applies.
    pub fn allowed_to_read(&self, key: &str) -> bool {
        self.allowed(key, AccessMode::Read)
    }

    /// Whether `key` may be written. Same scope as [`Store::allowed_to_read`].
    pub fn allowed_to_write(&self, key: &str) -> bool {
        self.allowed(key, AccessMode::Write)
    }

    fn allowed(&self, key: &str, mode: AccessMode) -> bool {
        permits(
            registry::restriction_of(&self.kind, key),
            mode,
            self.default_policy(),
        )
    }

    /// Read the value at `path`.
    ///
    /// Returns `Ok(None)` when any segment is absent: a missing key is a
    /// non-error, distinguishable from the denial error. Value shapes are
    /// resolved per step: producers are invoked, and descriptors
    /// materialize into nested stores cached in place of the descriptor.
    /// A plain object value is traversed by key like a store, yielding
    /// plain values.
    ///
    /// # Errors
    ///
    /// [`AccessError::ReadDenied`] when the gate on the first segment
    /// fails; nothing is traversed in that case. A denial raised while a
    /// descriptor bulk-loads its entries also propagates.
    pub fn read(&self, path: &str) -> Result<Option<Node>, AccessError> {
        let keys = path::segments(path);
        self.gate(&keys, path, AccessMode::Read)?;

        let mut node = Node::Store(self.clone());
        for key in keys {
            let next = match node {
                Node::Store(store) => store.resolve_step(key)?,
                Node::Value(Value::Object(map)) => map.get(key).cloned().map(Node::Value),
                Node::Value(_) => None,
            };
            node = match next {
                Some(next) => next,
                None => return Ok(None),
            };
        }
        Ok(Some(node))
    }

    /// Write `value` at `path`, returning the stored property.
    ///
    /// The gate applies to the first segment only; intermediate segments
    /// are not independently checked. Traversal descends through nested
    /// stores and plain object values; an absent or non-container
    /// intermediate is replaced by a fresh empty store of the base kind.
    /// The value is stored raw: no shape resolution happens on write.
    ///
    /// # Errors
    ///
    /// [`AccessError::WriteDenied`] when the gate fails; nothing is
    /// mutated in that case.
    pub fn write(&self, path: &str, value: impl Into<Property>) -> Result<Property, AccessError> {
        let keys = path::segments(path);
        self.gate(&keys, path, AccessMode::Write)?;
        Ok(self.write_segments(&keys, value.into()))
    }

    /// Write a flat path→value mapping, one gated `write` per entry in
    /// iteration order. Fail-fast and not atomic: the first denial
    /// propagates and leaves earlier entries written.
    pub fn write_entries<K, P, I>(&self, entries: I) -> Result<(), AccessError>
    where
        K: AsRef<str>,
        P: Into<Property>,
        I: IntoIterator<Item = (K, P)>,
    {
        for (entry_path, value) in entries {
            self.write(entry_path.as_ref(), value)?;
        }
        Ok(())
    }

    /// Snapshot of the store's own properties whose key passes
    /// [`Store::allowed_to_read`]. The check is on the key name alone;
    /// producers, descriptors, and nested stores are returned unresolved.
    pub fn entries(&self) -> BTreeMap<String, Property> {
        let inner = self.inner.read().unwrap();
        inner
            .properties
            .iter()
            .filter(|(key, _)| {
                permits(
                    registry::restriction_of(&self.kind, key),
                    AccessMode::Read,
                    inner.default_policy,
                )
            })
            .map(|(key, property)| (key.clone(), property.clone()))
            .collect()
    }

    /// Render the readable entries as a JSON object. Nested stores render
    /// as their own readable entries, descriptors as their literal
    /// `{"store": …}` object, producers as `null` (a snapshot must not run
    /// caller code). Cyclic nesting is not supported here.
    pub fn entries_json(&self) -> Value {
        let mut rendered = Map::new();
        for (key, property) in self.entries() {
            let value = match property {
                Property::Value(value) => value,
                descriptor @ Property::Descriptor(_) => descriptor.to_json(),
                Property::Producer(_) => Value::Null,
                Property::Store(store) => store.entries_json(),
            };
            rendered.insert(key, value);
        }
        Value::Object(rendered)
    }

    /// Gate an access on the first path segment, recording the outcome.
    fn gate(&self, keys: &[&str], full_path: &str, mode: AccessMode) -> Result<(), AccessError> {
        let key = keys[0];
        let default_policy = self.default_policy();
        let own = permits(registry::restriction_of(&self.kind, key), mode, default_policy);
        if own || self.children_allow(keys, mode, default_policy) {
            self.record(full_path, key, mode, AccessOutcome::Allowed);
            Ok(())
        } else {
            tracing::debug!(kind = %self.kind, key = %key, mode = %mode, "access denied");
            self.record(full_path, key, mode, AccessOutcome::Denied);
            Err(match mode {
                AccessMode::Read => AccessError::ReadDenied {
                    key: key.to_string(),
                },
                AccessMode::Write => AccessError::WriteDenied {
                    key: key.to_string(),
                },
            })
        }
    }

    /// Nested-store fallback, consulted only after the own-table check
    /// denied: if the first segment's property already holds a store, the
    /// whole path is allowed when *any* of its segments is permitted under
    /// that store's kind table, judged against the parent's default
    /// policy. Deliberately permissive; kept for compatibility and pinned
    /// down by the `nested_fallback_*` tests.
    fn children_allow(&self, keys: &[&str], mode: AccessMode, default_policy: Permission) -> bool {
        let first = {
            let inner = self.inner.read().unwrap();
            inner.properties.get(keys[0]).cloned()
        };
        let Some(Property::Store(child)) = first else {
            return false;
        };
        let table = registry::restrictions_of(child.kind());
        keys.iter()
            .any(|key| permits(table.get(*key).copied(), mode, default_policy))
    }

    /// Fetch and resolve one property of this store.
    fn resolve_step(&self, key: &str) -> Result<Option<Node>, AccessError> {
        let property = {
            let inner = self.inner.read().unwrap();
            inner.properties.get(key).cloned()
        };
        match property {
            None => Ok(None),
            Some(Property::Value(value)) => Ok(Some(Node::Value(value))),
            Some(Property::Store(store)) => Ok(Some(Node::Store(store))),
            Some(Property::Producer(produce)) => Ok(Some(produce())),
            Some(Property::Descriptor(entries)) => {
                let child = Store::new();
                child.write_entries(entries)?;
                tracing::debug!(kind = %self.kind, key = %key, "descriptor materialized into nested store");
                self.inner
                    .write()
                    .unwrap()
                    .properties
                    .insert(key.to_string(), Property::Store(child.clone()));
                Ok(Some(Node::Store(child)))
            }
        }
    }

    /// Ungated writer walking the remaining segments. `self` owns the
    /// first of `keys`.
    fn write_segments(&self, keys: &[&str], value: Property) -> Property {
        let head = keys[0];
        let child = {
            let mut inner = self.inner.write().unwrap();
            if keys.len() == 1 {
                inner.properties.insert(head.to_string(), value.clone());
                return value;
            }
            if let Some(Property::Value(root @ Value::Object(_))) = inner.properties.get_mut(head)
            {
                return write_json_path(root, &keys[1..], value);
            }
            match inner.properties.get(head) {
                Some(Property::Store(child)) => child.clone(),
                // absent, or a non-container shape (scalar, array,
                // producer, descriptor): vivify a fresh store in its place
                _ => {
                    let child = Store::new();
                    inner
                        .properties
                        .insert(head.to_string(), Property::Store(child.clone()));
                    child
                }
            }
        };
        child.write_segments(&keys[1..], value)
    }

    fn record(&self, full_path: &str, key: &str, mode: AccessMode, outcome: AccessOutcome) {
        let sink = self.inner.read().unwrap().audit.clone();
        let event = AccessEvent::new(self.kind.as_str(), full_path, key, mode, outcome);
        if let Err(error) = sink.record(event) {
            tracing::warn!(%error, "failed to record access event");
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().unwrap();
        f.debug_struct("Store")
            .field("kind", &self.kind)
            .field("len", &inner.properties.len())
            .field("default_policy", &inner.default_policy)
            .finish()
    }
}

/// Continue a write inside a plain JSON value subtree, vivifying empty
/// objects along the way. Deferred shapes cannot live inside plain data;
/// they are stored as their JSON rendering (see [`Property::to_json`]).
fn write_json_path(root: &mut Value, keys: &[&str], value: Property) -> Property {
    let mut cursor = root;
    for key in &keys[..keys.len() - 1] {
        cursor = object_map(cursor)
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    let rendered = value.to_json();
    object_map(cursor).insert(keys[keys.len() - 1].to_string(), rendered.clone());
    Property::Value(rendered)
}

/// View a slot as a mutable JSON object, replacing any non-object value.
fn object_map(slot: &mut Value) -> &mut Map<String, Value> {
    if !matches!(slot, Value::Object(_)) {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::registry::Restrictions;
    use serde_json::json;

    fn read_value(store: &Store, key_path: &str) -> Option<Value> {
        store.read(key_path).unwrap().and_then(Node::into_value)
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let store = Store::new();
        store.write("name", json!("alice")).unwrap();
        assert_eq!(read_value(&store, "name"), Some(json!("alice")));

        store.write("answer", json!({"deep": [1, 2, 3]})).unwrap();
        assert_eq!(read_value(&store, "answer"), Some(json!({"deep": [1, 2, 3]})));
    }

    #[test]
    fn test_missing_key_reads_as_none() {
        let store = Store::new();
        assert!(store.read("absent").unwrap().is_none());

        store.write("a", json!(1)).unwrap();
        // first segment exists, deeper segment does not
        assert!(store.read("a:missing").unwrap().is_none());
    }

    #[test]
    fn test_empty_path_addresses_the_empty_key() {
        let store = Store::new();
        assert!(store.read("").unwrap().is_none());
        store.write("", json!("blank")).unwrap();
        assert_eq!(read_value(&store, ""), Some(json!("blank")));
    }

    #[test]
    fn test_denied_read_and_write() {
        let kind = StoreKind::named("store-test-denied");
        Restrictions::for_kind(&kind).deny("secret").apply();
        let store = Store::of_kind(kind);

        assert_eq!(
            store.read("secret").unwrap_err(),
            AccessError::ReadDenied {
                key: "secret".to_string()
            }
        );
        assert_eq!(
            store.write("secret", json!(1)).unwrap_err(),
            AccessError::WriteDenied {
                key: "secret".to_string()
            }
        );
    }

    #[test]
    fn test_denied_write_mutates_nothing() {
        let kind = StoreKind::named("store-test-no-mutation");
        Restrictions::for_kind(&kind).read_only("locked").apply();
        let store = Store::of_kind(kind);
        store.write("open", json!("before")).unwrap();

        assert!(store.write("locked:deep", json!(1)).is_err());
        assert_eq!(read_value(&store, "open"), Some(json!("before")));
        assert!(store.entries().get("locked").is_none());
    }

    #[test]
    fn test_auto_vivification_creates_nested_stores() {
        let store = Store::new();
        store.write("a:b:c", json!(5)).unwrap();
        assert_eq!(read_value(&store, "a:b:c"), Some(json!(5)));

        let a = store.read("a").unwrap().unwrap().into_store().unwrap();
        assert_eq!(read_value(&a, "b:c"), Some(json!(5)));
    }

    #[test]
    fn test_write_descends_into_plain_objects() {
        let store = Store::new();
        store.write("config", json!({"port": 1, "host": "x"})).unwrap();
        store.write("config:port", json!(8080)).unwrap();

        assert_eq!(read_value(&store, "config:port"), Some(json!(8080)));
        // untouched sibling survives
        assert_eq!(read_value(&store, "config:host"), Some(json!("x")));
    }

    #[test]
    fn test_write_returns_the_stored_property() {
        let store = Store::new();
        let stored = store.write("k", json!(7)).unwrap();
        assert!(matches!(stored, Property::Value(value) if value == json!(7)));
    }

    #[test]
    fn test_producer_is_invoked_on_read() {
        let store = Store::new();
        store
            .write("lazy", Property::producer(|| Node::Value(json!(99))))
            .unwrap();
        assert_eq!(read_value(&store, "lazy"), Some(json!(99)));
    }

    #[test]
    fn test_producer_can_yield_a_store() {
        let nested = Store::new();
        nested.write("x", json!("inner")).unwrap();
        let handle = nested.clone();

        let store = Store::new();
        store
            .write("lazy", Property::producer(move || Node::Store(handle.clone())))
            .unwrap();
        assert_eq!(read_value(&store, "lazy:x"), Some(json!("inner")));
    }

    #[test]
    fn test_descriptor_materializes_and_is_cached() {
        let store = Store::new();
        store
            .write("sub", Property::descriptor([("x:y", json!(5))]))
            .unwrap();

        // raw shape before the first read
        assert!(matches!(
            store.entries().get("sub"),
            Some(Property::Descriptor(_))
        ));

        let sub = store.read("sub").unwrap().unwrap().into_store().unwrap();
        assert_eq!(read_value(&sub, "x:y"), Some(json!(5)));

        // the descriptor was replaced by the materialized store
        assert!(matches!(store.entries().get("sub"), Some(Property::Store(_))));
        let again = store.read("sub").unwrap().unwrap().into_store().unwrap();
        again.write("x:y", json!(6)).unwrap();
        assert_eq!(read_value(&sub, "x:y"), Some(json!(6)));
    }

    #[test]
    fn test_descriptor_resolves_mid_path() {
        let store = Store::new();
        store
            .write("sub", Property::descriptor([("x:y", json!(5))]))
            .unwrap();
        assert_eq!(read_value(&store, "sub:x:y"), Some(json!(5)));
    }

    #[test]
    fn test_entries_filters_unreadable_keys() {
        let kind = StoreKind::named("store-test-entries");
        Restrictions::for_kind(&kind)
            .deny("hidden")
            .write_only("inbox")
            .apply();
        let store = Store::of_kind(kind)
            .with_property("hidden", json!(1))
            .with_property("inbox", json!(2));
        store.write("visible", json!(3)).unwrap();

        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("visible"));
    }

    #[test]
    fn test_default_policy_governs_undeclared_keys() {
        let store = Store::new().with_default_policy(Permission::ReadOnly);
        assert!(store.allowed_to_read("anything"));
        assert!(!store.allowed_to_write("anything"));
        assert!(store.write("anything", json!(1)).is_err());
    }

    #[test]
    fn test_entries_json_renders_shapes() {
        let nested = Store::new();
        nested.write("inner", json!(true)).unwrap();

        let store = Store::new()
            .with_property("plain", json!(1))
            .with_property("lazy", Property::producer(|| Node::Value(json!(0))))
            .with_property("sub", nested)
            .with_property("desc", Property::descriptor([("x", json!(2))]));

        assert_eq!(
            store.entries_json(),
            json!({
                "plain": 1,
                "lazy": null,
                "sub": { "inner": true },
                "desc": { "store": { "x": 2 } },
            })
        );
    }

    #[test]
    fn test_clone_shares_state() {
        let store = Store::new();
        let handle = store.clone();
        handle.write("k", json!(1)).unwrap();
        assert_eq!(read_value(&store, "k"), Some(json!(1)));
    }

    #[test]
    fn test_access_error_accessors() {
        let error = AccessError::WriteDenied {
            key: "secret".to_string(),
        };
        assert_eq!(error.key(), "secret");
        assert_eq!(error.mode(), AccessMode::Write);
        assert_eq!(error.to_string(), "writing key 'secret' is not allowed");
    }
}
