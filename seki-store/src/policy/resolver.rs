//! Permission resolution for a single key
//!
//! Pure decision logic: given the key's declared restriction (if any), the
//! requested access mode, and the store's default policy, decide allow or
//! deny. An explicit restriction always wins; only an undeclared key falls
//! back to the default policy.

use seki_types::{AccessMode, Permission};

/// Decide whether an access is allowed.
///
/// The cases are evaluated in declaration-precedence order:
///
/// 1. a `read-write` restriction allows both modes;
/// 2. a restriction matching the requested mode allows it;
/// 3. `none` denies both modes;
/// 4. `read-only` denies a write;
/// 5. `write-only` denies a read;
/// 6. an undeclared key is governed by `default_policy`.
///
/// Note that `default_policy` never overrides a declared restriction: a
/// `none` key stays inaccessible under a `read-write` default, and a
/// declared `read-write` key stays open under a `none` default.
pub fn permits(
    restriction: Option<Permission>,
    mode: AccessMode,
    default_policy: Permission,
) -> bool {
    match restriction {
        Some(Permission::ReadWrite) => true,
        Some(Permission::ReadOnly) if mode == AccessMode::Read => true,
        Some(Permission::WriteOnly) if mode == AccessMode::Write => true,
        Some(Permission::None) => false,
        Some(Permission::ReadOnly) | Some(Permission::WriteOnly) => false,
        None => default_policy.allows(mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_allows_both() {
        for mode in [AccessMode::Read, AccessMode::Write] {
            assert!(permits(Some(Permission::ReadWrite), mode, Permission::None));
        }
    }

    #[test]
    fn test_none_denies_both_regardless_of_default() {
        for default_policy in [
            Permission::ReadOnly,
            Permission::WriteOnly,
            Permission::ReadWrite,
            Permission::None,
        ] {
            assert!(!permits(Some(Permission::None), AccessMode::Read, default_policy));
            assert!(!permits(Some(Permission::None), AccessMode::Write, default_policy));
        }
    }

    #[test]
    fn test_read_only_blocks_write() {
        assert!(permits(Some(Permission::ReadOnly), AccessMode::Read, Permission::None));
        assert!(!permits(
            Some(Permission::ReadOnly),
            AccessMode::Write,
            Permission::ReadWrite
        ));
    }

    #[test]
    fn test_write_only_blocks_read() {
        assert!(permits(Some(Permission::WriteOnly), AccessMode::Write, Permission::None));
        assert!(!permits(
            Some(Permission::WriteOnly),
            AccessMode::Read,
            Permission::ReadWrite
        ));
    }

    #[test]
    fn test_undeclared_key_follows_default_policy() {
        for (default_policy, read, write) in [
            (Permission::ReadWrite, true, true),
            (Permission::ReadOnly, true, false),
            (Permission::WriteOnly, false, true),
            (Permission::None, false, false),
        ] {
            assert_eq!(permits(None, AccessMode::Read, default_policy), read);
            assert_eq!(permits(None, AccessMode::Write, default_policy), write);
        }
    }
}
