//! Permission sets keyed by module.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::access::{AccessLevel, AccessLevels};
use super::catalog::{parse_entries, CatalogError, Module, RawPermissionEntry};

/// One module and the access levels held on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionEntry {
    pub module: Module,
    pub access: AccessLevels,
}

/// Module to access-level mapping.
///
/// Never holds a module with an empty access set: mutations that empty an
/// entry remove it. Deserialization runs through the access catalog, so
/// malformed stored data fails to decode instead of being coerced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<RawPermissionEntry>",
    into = "Vec<PermissionEntry>"
)]
pub struct PermissionSet {
    entries: BTreeMap<Module, AccessLevels>,
}

impl PermissionSet {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Access levels held on `module`, if any.
    #[must_use]
    pub fn get(&self, module: Module) -> Option<AccessLevels> {
        self.entries.get(&module).copied()
    }

    #[must_use]
    pub fn contains(&self, module: Module, access: AccessLevel) -> bool {
        self.get(module).is_some_and(|levels| levels.has(access))
    }

    /// Union `levels` into the entry for `module`, creating it if absent.
    pub fn insert(&mut self, module: Module, levels: impl Into<AccessLevels>) {
        let levels = levels.into();
        if levels.is_empty() {
            return;
        }
        *self.entries.entry(module).or_default() |= levels;
    }

    /// Subtract `levels` from the entry for `module`, dropping it once empty.
    pub fn remove(&mut self, module: Module, levels: impl Into<AccessLevels>) {
        let levels = levels.into();
        if let Some(current) = self.entries.get_mut(&module) {
            current.remove(levels);
            if current.is_empty() {
                self.entries.remove(&module);
            }
        }
    }

    pub fn modules(&self) -> impl Iterator<Item = Module> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Module, AccessLevels)> + '_ {
        self.entries.iter().map(|(module, levels)| (*module, *levels))
    }

    #[must_use]
    pub fn entries(&self) -> Vec<PermissionEntry> {
        self.iter()
            .map(|(module, access)| PermissionEntry { module, access })
            .collect()
    }

    /// First module where both sets hold a common access level.
    #[must_use]
    pub fn overlap(&self, other: &Self) -> Option<(Module, AccessLevels)> {
        self.iter().find_map(|(module, levels)| {
            let shared = levels & other.get(module).unwrap_or_default();
            (!shared.is_empty()).then_some((module, shared))
        })
    }
}

impl FromIterator<(Module, AccessLevels)> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = (Module, AccessLevels)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (module, levels) in iter {
            set.insert(module, levels);
        }
        set
    }
}

impl TryFrom<Vec<RawPermissionEntry>> for PermissionSet {
    type Error = CatalogError;

    fn try_from(raw: Vec<RawPermissionEntry>) -> Result<Self, Self::Error> {
        parse_entries(&raw)
    }
}

impl From<PermissionSet> for Vec<PermissionEntry> {
    fn from(set: PermissionSet) -> Self {
        set.entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_unions_levels() {
        let mut set = PermissionSet::new();
        set.insert(Module::Accounts, AccessLevel::View);
        set.insert(Module::Accounts, AccessLevels::EDIT | AccessLevels::VIEW);

        assert_eq!(
            set.get(Module::Accounts),
            Some(AccessLevels::VIEW | AccessLevels::EDIT)
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_insert_empty_is_ignored() {
        let mut set = PermissionSet::new();
        set.insert(Module::Chat, AccessLevels::empty());
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_drops_emptied_module() {
        let mut set: PermissionSet = [(Module::Campus, AccessLevels::VIEW | AccessLevels::EDIT)]
            .into_iter()
            .collect();

        set.remove(Module::Campus, AccessLevel::Edit);
        assert_eq!(set.get(Module::Campus), Some(AccessLevels::VIEW));

        set.remove(Module::Campus, AccessLevel::View);
        assert_eq!(set.get(Module::Campus), None);
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_absent_module_is_noop() {
        let mut set: PermissionSet = [(Module::Tours, AccessLevels::VIEW)].into_iter().collect();
        set.remove(Module::Reports, AccessLevels::all());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_overlap_reports_shared_levels() {
        let a: PermissionSet = [
            (Module::Accounts, AccessLevels::VIEW),
            (Module::Documents, AccessLevels::UPLOAD | AccessLevels::DELETE),
        ]
        .into_iter()
        .collect();
        let b: PermissionSet = [(Module::Documents, AccessLevels::DELETE)].into_iter().collect();

        assert_eq!(
            a.overlap(&b),
            Some((Module::Documents, AccessLevels::DELETE))
        );
        assert_eq!(a.overlap(&PermissionSet::new()), None);
    }

    #[test]
    fn test_json_shape() {
        let set: PermissionSet = [(Module::Accounts, AccessLevels::VIEW | AccessLevels::EDIT)]
            .into_iter()
            .collect();

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "module": "accounts", "access": ["view", "edit"] }])
        );

        let decoded: PermissionSet = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, set);
    }

    #[test]
    fn test_decode_rejects_empty_access() {
        let json = serde_json::json!([{ "module": "accounts", "access": [] }]);
        assert!(serde_json::from_value::<PermissionSet>(json).is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_module() {
        let json = serde_json::json!([{ "module": "payroll", "access": ["view"] }]);
        assert!(serde_json::from_value::<PermissionSet>(json).is_err());
    }
}
