//! Access catalog.
//!
//! Static enumeration of the console's modules and the access levels each
//! one supports. This is the only place module names and access tags are
//! parsed from strings: everything past this boundary works with the
//! canonical [`Module`] and [`AccessLevel`] types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::access::{AccessLevel, AccessLevels};
use super::set::PermissionSet;

/// A functional area of the console that permissions are scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Accounts,
    Roles,
    Campus,
    Documents,
    Tours,
    Chat,
    Reports,
}

impl Module {
    /// Canonical lowercase key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accounts => "accounts",
            Self::Roles => "roles",
            Self::Campus => "campus",
            Self::Documents => "documents",
            Self::Tours => "tours",
            Self::Chat => "chat",
            Self::Reports => "reports",
        }
    }

    /// Human-readable label used by the console.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Accounts => "Accounts",
            Self::Roles => "Roles",
            Self::Campus => "Campus",
            Self::Documents => "Documents",
            Self::Tours => "Virtual Tours",
            Self::Chat => "Chat",
            Self::Reports => "Reports",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = CatalogError;

    /// Parse a module name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        CATALOG
            .iter()
            .map(|descriptor| descriptor.module)
            .find(|module| module.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| CatalogError::UnknownModule(s.to_string()))
    }
}

/// Catalog entry describing one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    pub module: Module,
    pub label: &'static str,
    pub access_levels: AccessLevels,
}

const fn descriptor(module: Module, access_levels: AccessLevels) -> ModuleDescriptor {
    ModuleDescriptor {
        module,
        label: module.label(),
        access_levels,
    }
}

const CRUD: AccessLevels = AccessLevels::VIEW
    .union(AccessLevels::CREATE)
    .union(AccessLevels::EDIT)
    .union(AccessLevels::DELETE);

/// Modules in console rendering order.
static CATALOG: [ModuleDescriptor; 7] = [
    descriptor(Module::Accounts, CRUD),
    descriptor(Module::Roles, CRUD),
    descriptor(Module::Campus, CRUD),
    descriptor(
        Module::Documents,
        AccessLevels::VIEW
            .union(AccessLevels::UPLOAD)
            .union(AccessLevels::EDIT)
            .union(AccessLevels::DELETE),
    ),
    descriptor(Module::Tours, CRUD),
    descriptor(
        Module::Chat,
        AccessLevels::VIEW
            .union(AccessLevels::CREATE)
            .union(AccessLevels::DELETE),
    ),
    descriptor(Module::Reports, AccessLevels::VIEW.union(AccessLevels::EXPORT)),
];

/// All modules with their supported access levels, in rendering order.
#[must_use]
pub fn list_modules() -> &'static [ModuleDescriptor] {
    &CATALOG
}

/// Access levels a module supports.
#[must_use]
pub fn access_levels(module: Module) -> AccessLevels {
    CATALOG
        .iter()
        .find(|descriptor| descriptor.module == module)
        .map_or_else(AccessLevels::empty, |descriptor| descriptor.access_levels)
}

/// Wire form of a permission entry, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPermissionEntry {
    pub module: String,
    #[serde(default)]
    pub access: Vec<String>,
}

impl RawPermissionEntry {
    pub fn new(module: impl Into<String>, access: &[&str]) -> Self {
        Self {
            module: module.into(),
            access: access.iter().map(|tag| (*tag).to_string()).collect(),
        }
    }
}

/// Catalog validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Unknown access level: {0}")]
    UnknownAccess(String),

    #[error("Module {module} does not support {access} access")]
    UnsupportedAccess { module: Module, access: AccessLevel },

    #[error("Module {0} has no access levels")]
    EmptyAccess(Module),

    #[error("Module {0} is listed more than once")]
    DuplicateModule(Module),
}

/// Parse a module name into its canonical form.
pub fn parse_module(name: &str) -> Result<Module, CatalogError> {
    name.parse()
}

/// Parse an access tag and check the module supports it.
pub fn parse_access(module: Module, tag: &str) -> Result<AccessLevel, CatalogError> {
    let access: AccessLevel = tag.parse()?;
    if access_levels(module).has(access) {
        Ok(access)
    } else {
        Err(CatalogError::UnsupportedAccess { module, access })
    }
}

/// Validate one raw entry. Repeated tags collapse into one.
pub fn parse_entry(raw: &RawPermissionEntry) -> Result<(Module, AccessLevels), CatalogError> {
    let module = parse_module(&raw.module)?;
    let levels = raw
        .access
        .iter()
        .map(|tag| parse_access(module, tag))
        .collect::<Result<AccessLevels, _>>()?;

    if levels.is_empty() {
        return Err(CatalogError::EmptyAccess(module));
    }
    Ok((module, levels))
}

/// Validate raw entries into a [`PermissionSet`].
///
/// Module names are compared case-insensitively; two entries naming the
/// same module are rejected rather than merged.
pub fn parse_entries(raw: &[RawPermissionEntry]) -> Result<PermissionSet, CatalogError> {
    let mut set = PermissionSet::new();
    for entry in raw {
        let (module, levels) = parse_entry(entry)?;
        if set.get(module).is_some() {
            return Err(CatalogError::DuplicateModule(module));
        }
        set.insert(module, levels);
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lists_every_module_once() {
        let modules: Vec<Module> = list_modules().iter().map(|d| d.module).collect();
        assert_eq!(modules.len(), 7);
        for module in &modules {
            assert_eq!(modules.iter().filter(|m| *m == module).count(), 1);
        }
    }

    #[test]
    fn test_every_module_supports_view() {
        for descriptor in list_modules() {
            assert!(
                descriptor.access_levels.has(AccessLevel::View),
                "{} should support view",
                descriptor.module
            );
        }
    }

    #[test]
    fn test_module_parse_normalizes_case() {
        assert_eq!(parse_module("Accounts"), Ok(Module::Accounts));
        assert_eq!(parse_module("ACCOUNTS"), Ok(Module::Accounts));
        assert_eq!(parse_module("  campus "), Ok(Module::Campus));
        assert_eq!(
            parse_module("Acounts"),
            Err(CatalogError::UnknownModule("Acounts".into()))
        );
    }

    #[test]
    fn test_parse_access_checks_module_support() {
        assert_eq!(
            parse_access(Module::Documents, "upload"),
            Ok(AccessLevel::Upload)
        );
        assert_eq!(
            parse_access(Module::Reports, "delete"),
            Err(CatalogError::UnsupportedAccess {
                module: Module::Reports,
                access: AccessLevel::Delete,
            })
        );
    }

    #[test]
    fn test_parse_entries_builds_set() {
        let raw = vec![
            RawPermissionEntry::new("Accounts", &["view", "Edit", "view"]),
            RawPermissionEntry::new("reports", &["export"]),
        ];
        let set = parse_entries(&raw).unwrap();

        assert_eq!(
            set.get(Module::Accounts),
            Some(AccessLevels::VIEW | AccessLevels::EDIT)
        );
        assert_eq!(set.get(Module::Reports), Some(AccessLevels::EXPORT));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_parse_entries_rejects_empty_access() {
        let raw = vec![RawPermissionEntry::new("campus", &[])];
        assert_eq!(
            parse_entries(&raw),
            Err(CatalogError::EmptyAccess(Module::Campus))
        );
    }

    #[test]
    fn test_parse_entries_rejects_case_insensitive_duplicates() {
        let raw = vec![
            RawPermissionEntry::new("Accounts", &["view"]),
            RawPermissionEntry::new("accounts", &["edit"]),
        ];
        assert_eq!(
            parse_entries(&raw),
            Err(CatalogError::DuplicateModule(Module::Accounts))
        );
    }

    #[test]
    fn test_parse_entries_rejects_unknown_access() {
        let raw = vec![RawPermissionEntry::new("chat", &["moderate"])];
        assert_eq!(
            parse_entries(&raw),
            Err(CatalogError::UnknownAccess("moderate".into()))
        );
    }
}
