//! # seki-store: permission-gated hierarchical key/value store
//!
//! An in-memory object graph for configuration and state where some keys
//! must be hidden or read-only for parts of the application. Every key
//! carries a [`Permission`], declared per store *kind* or falling back to
//! the instance's default policy, and `:`-delimited paths descend across
//! nested stores so access rules can be scoped per sub-tree.
//!
//! Checks are key-based only: there is no caller identity, no persistence,
//! and no wire protocol. Host applications supply their own entry points.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use seki_store::{Permission, Restrictions, Store, StoreKind};
//! use serde_json::json;
//!
//! // Define a kind and declare its restrictions right away.
//! let session = StoreKind::named("session");
//! Restrictions::for_kind(&session)
//!     .deny("secret")
//!     .read_only("token")
//!     .apply();
//!
//! let store = Store::of_kind(session)
//!     .with_property("token", json!("t-123"));
//!
//! store.write("user:name", json!("alice"))?;          // nested write
//! let name = store.read("user:name")?;                // Some(Value)
//! let gone = store.read("user:missing")?;             // None, not an error
//! store.write("secret", json!("x")).unwrap_err();     // AccessError
//! ```
//!
//! ## Pieces
//!
//! - [`policy`]: per-kind restriction registry, declaration builder, and
//!   the permission resolver.
//! - [`store`]: the [`Store`] façade and path traversal.
//! - [`property`]: the four value shapes a property may hold.
//! - [`audit`]: optional sinks receiving one event per gate decision.

pub mod audit;
pub mod path;
pub mod policy;
pub mod property;
pub mod store;

pub use policy::{
    permits, restrict, restriction_of, restrictions_of, Restrictions, RestrictionTable, StoreKind,
};
pub use property::{FlatEntries, Node, Property};
pub use store::{AccessError, Store};

pub use seki_types::{AccessMode, Permission};
