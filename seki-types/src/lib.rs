//! seki-types: Shared vocabulary for the seki scoped store
//!
//! This crate defines the permission values attached to store keys and the
//! access modes callers request. It carries no engine logic; the resolution
//! rules live in `seki-store`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Permission declared for a key, or used as a store's default policy.
///
/// There is no ordering between permissions; the resolver in `seki-store`
/// applies explicit case logic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    /// Key may be read, never written.
    ReadOnly,

    /// Key may be written, never read.
    WriteOnly,

    /// Key may be read and written. Default policy of a fresh store.
    #[default]
    ReadWrite,

    /// Key may be neither read nor written.
    None,
}

impl Permission {
    /// Whether this permission contains the requested access mode.
    pub fn allows(self, mode: AccessMode) -> bool {
        match (self, mode) {
            (Permission::ReadWrite, _) => true,
            (Permission::ReadOnly, AccessMode::Read) => true,
            (Permission::WriteOnly, AccessMode::Write) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::ReadOnly => "read-only",
            Permission::WriteOnly => "write-only",
            Permission::ReadWrite => "read-write",
            Permission::None => "none",
        };
        f.write_str(name)
    }
}

impl FromStr for Permission {
    type Err = ParsePermissionError;

    /// Parses the canonical kebab-case names and the short forms
    /// `r`, `w`, `rw` used by existing restriction tables.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read-only" | "r" => Ok(Permission::ReadOnly),
            "write-only" | "w" => Ok(Permission::WriteOnly),
            "read-write" | "rw" => Ok(Permission::ReadWrite),
            "none" => Ok(Permission::None),
            other => Err(ParsePermissionError(other.to_string())),
        }
    }
}

/// Error returned when parsing an unknown permission name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown permission '{0}', expected one of: read-only, write-only, read-write, none")]
pub struct ParsePermissionError(pub String);

/// Access mode requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    Read,
    Write,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Read => f.write_str("read"),
            AccessMode::Write => f.write_str("write"),
        }
    }
}
