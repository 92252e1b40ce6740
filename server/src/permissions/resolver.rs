//! Permission resolution logic.
//!
//! Computes effective permissions for an account from its role template and
//! its grant/revoke overrides, and derives new overrides from single
//! checkbox toggles.

use super::access::AccessLevel;
use super::catalog::Module;
use super::models::Overrides;
use super::set::PermissionSet;

/// Compute the effective permission set for an account.
///
/// Resolution order:
/// 1. Start from a copy of the role's base permissions
/// 2. Union every granted override into it
/// 3. Subtract every revoked override (revoke wins)
///
/// Modules left without access are dropped, so the result never holds an
/// empty entry.
#[must_use]
pub fn resolve(
    base: &PermissionSet,
    granted: &PermissionSet,
    revoked: &PermissionSet,
) -> PermissionSet {
    let mut effective = base.clone();

    for (module, levels) in granted.iter() {
        effective.insert(module, levels);
    }

    for (module, levels) in revoked.iter() {
        effective.remove(module, levels);
    }

    effective
}

/// Apply one capability toggle to an account's overrides.
///
/// Whether a capability is "ground" is decided against `base` only, never
/// against the resolved set:
/// - ground, checked: un-revoke
/// - ground, unchecked: revoke
/// - not ground, checked: grant, and drop any leftover revoke of it
/// - not ground, unchecked: un-grant
///
/// Ground toggles never touch `granted`. A capability is never left in both
/// `granted` and `revoked`, so the checkbox state always matches the
/// resolved set.
#[must_use]
pub fn toggle_capability(
    module: Module,
    access: AccessLevel,
    checked: bool,
    base: &PermissionSet,
    overrides: &Overrides,
) -> Overrides {
    let mut next = overrides.clone();
    let ground = base.contains(module, access);

    match (ground, checked) {
        (true, true) => next.revoked.remove(module, access),
        (true, false) => next.revoked.insert(module, access),
        (false, true) => {
            next.granted.insert(module, access);
            next.revoked.remove(module, access);
        }
        (false, false) => next.granted.remove(module, access),
    }

    next
}
