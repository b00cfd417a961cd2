//! Process-wide restriction registry, keyed by store kind
//!
//! One table per kind for the lifetime of the process. Tables are created
//! lazily, by the first declaration for the kind or the first construction
//! of a store of that kind (whichever comes first), and are never reset.
//! Stores hold no private copy: a check always reads the live table, so a
//! declaration made after instances exist applies to them as well.

use once_cell::sync::Lazy;
use seki_types::Permission;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Restriction table of one kind: key name → declared permission.
pub type RestrictionTable = HashMap<String, Permission>;

/// Tag of the base kind used by [`crate::Store::new`] and by stores
/// materialized from descriptors.
pub const BASE_KIND: &str = "store";

static REGISTRY: Lazy<RwLock<HashMap<StoreKind, RestrictionTable>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Identity of a concrete store type.
///
/// A kind is a stable tag chosen by the application, not derived from any
/// language reflection. Two `StoreKind` values with the same tag address
/// the same restriction table.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StoreKind(Arc<str>);

impl StoreKind {
    /// Create a kind from its tag.
    pub fn named(tag: impl Into<String>) -> Self {
        Self(Arc::from(tag.into()))
    }

    /// The base kind, shared by plain stores and descriptor-materialized
    /// stores.
    pub fn base() -> Self {
        Self::named(BASE_KIND)
    }

    /// The kind's tag.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StoreKind {
    fn default() -> Self {
        Self::base()
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StoreKind").field(&self.as_str()).finish()
    }
}

/// Declare a restriction for one key of a kind, creating the kind's table
/// if this is its first declaration. Re-declaring a key overwrites the
/// previous value.
pub fn restrict(kind: &StoreKind, key: impl Into<String>, permission: Permission) {
    let key = key.into();
    tracing::debug!(kind = %kind, key = %key, permission = %permission, "restriction declared");
    let mut registry = REGISTRY.write().unwrap();
    registry.entry(kind.clone()).or_default().insert(key, permission);
}

/// Declared restriction for a key, if any.
pub fn restriction_of(kind: &StoreKind, key: &str) -> Option<Permission> {
    let registry = REGISTRY.read().unwrap();
    registry.get(kind).and_then(|table| table.get(key).copied())
}

/// Snapshot of a kind's full restriction table. Empty if the kind has no
/// declarations.
pub fn restrictions_of(kind: &StoreKind) -> RestrictionTable {
    let registry = REGISTRY.read().unwrap();
    registry.get(kind).cloned().unwrap_or_default()
}

/// Ensure a kind's table exists. Called on store construction so that the
/// table's lifetime starts no later than the first instance of the kind.
pub(crate) fn ensure_kind(kind: &StoreKind) {
    let mut registry = REGISTRY.write().unwrap();
    registry.entry(kind.clone()).or_default();
}

/// Chaining declaration builder, the registration surface to use right
/// after defining a kind.
///
/// # Example
///
/// ```rust
/// use seki_store::{Permission, Restrictions, StoreKind};
///
/// let kind = StoreKind::named("doc-session");
/// Restrictions::for_kind(&kind)
///     .deny("secret")
///     .read_only("token")
///     .restrict("draft", Permission::WriteOnly)
///     .apply();
/// ```
#[derive(Debug)]
pub struct Restrictions {
    kind: StoreKind,
    entries: Vec<(String, Permission)>,
}

impl Restrictions {
    /// Start declaring restrictions for a kind.
    pub fn for_kind(kind: &StoreKind) -> Self {
        Self {
            kind: kind.clone(),
            entries: Vec::new(),
        }
    }

    /// Declare an explicit permission for a key.
    pub fn restrict(mut self, key: impl Into<String>, permission: Permission) -> Self {
        self.entries.push((key.into(), permission));
        self
    }

    /// Declare a key fully inaccessible (`none`).
    pub fn deny(self, key: impl Into<String>) -> Self {
        self.restrict(key, Permission::None)
    }

    /// Declare a key readable but not writable.
    pub fn read_only(self, key: impl Into<String>) -> Self {
        self.restrict(key, Permission::ReadOnly)
    }

    /// Declare a key writable but not readable.
    pub fn write_only(self, key: impl Into<String>) -> Self {
        self.restrict(key, Permission::WriteOnly)
    }

    /// Commit all declarations to the kind's table.
    pub fn apply(self) {
        for (key, permission) in self.entries {
            restrict(&self.kind, key, permission);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_equality_is_by_tag() {
        assert_eq!(StoreKind::named("a"), StoreKind::named("a"));
        assert_ne!(StoreKind::named("a"), StoreKind::named("b"));
        assert_eq!(StoreKind::default(), StoreKind::base());
    }

    #[test]
    fn test_restriction_lookup() {
        let kind = StoreKind::named("registry-lookup-test");
        assert_eq!(restriction_of(&kind, "token"), None);

        restrict(&kind, "token", Permission::ReadOnly);
        assert_eq!(restriction_of(&kind, "token"), Some(Permission::ReadOnly));
        assert_eq!(restriction_of(&kind, "other"), None);
    }

    #[test]
    fn test_redeclaration_overwrites() {
        let kind = StoreKind::named("registry-overwrite-test");
        restrict(&kind, "key", Permission::None);
        restrict(&kind, "key", Permission::ReadWrite);
        assert_eq!(restriction_of(&kind, "key"), Some(Permission::ReadWrite));
    }

    #[test]
    fn test_kinds_are_isolated() {
        let left = StoreKind::named("registry-isolated-left");
        let right = StoreKind::named("registry-isolated-right");
        restrict(&left, "key", Permission::None);
        assert_eq!(restriction_of(&right, "key"), None);
    }

    #[test]
    fn test_builder_applies_all_entries() {
        let kind = StoreKind::named("registry-builder-test");
        Restrictions::for_kind(&kind)
            .deny("secret")
            .read_only("token")
            .write_only("inbox")
            .restrict("open", Permission::ReadWrite)
            .apply();

        let table = restrictions_of(&kind);
        assert_eq!(table.len(), 4);
        assert_eq!(table["secret"], Permission::None);
        assert_eq!(table["token"], Permission::ReadOnly);
        assert_eq!(table["inbox"], Permission::WriteOnly);
        assert_eq!(table["open"], Permission::ReadWrite);
    }

    #[test]
    fn test_ensure_kind_creates_empty_table() {
        let kind = StoreKind::named("registry-ensure-test");
        ensure_kind(&kind);
        assert!(restrictions_of(&kind).is_empty());
    }
}
