//! Permission policy for store keys
//!
//! Restrictions are declared per *store kind* (a stable string tag), not per
//! instance: every store of the same kind consults the same live table.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Restriction registry                      │
//! │   kind "session"  →  { "token": read-only, "secret": none }  │
//! │   kind "profile"  →  { "email": write-only }                 │
//! └─────────────────────────────────────────────────────────────┘
//!            ▲ declared once, at kind-definition time
//!            │
//!   Restrictions::for_kind(&kind)      permits(restriction, mode,
//!       .deny("secret")                        default_policy)
//!       .read_only("token")                    ▲ consulted on every
//!       .apply();                              │ read/write gate
//! ```
//!
//! Declarations normally happen right after a kind is defined, before any
//! store of that kind is shared. Declaring later is allowed and affects
//! every existing instance of the kind immediately.

pub mod registry;
pub mod resolver;

pub use registry::{
    restrict, restriction_of, restrictions_of, Restrictions, RestrictionTable, StoreKind,
};
pub use resolver::permits;
