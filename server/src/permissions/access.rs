//! Access levels using bitflags.
//!
//! Each module in the catalog supports a subset of these capability tags.
//! The tags travel as lowercase strings (`"view"`, `"edit"`, ...) and are
//! held in memory as a compact bitfield.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Serialize, Serializer};

use super::catalog::CatalogError;

/// A single capability tag within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    View,
    Create,
    Edit,
    Delete,
    Upload,
    Export,
}

impl AccessLevel {
    /// Every access level, in display order.
    pub const ALL: [Self; 6] = [
        Self::View,
        Self::Create,
        Self::Edit,
        Self::Delete,
        Self::Upload,
        Self::Export,
    ];

    /// Canonical lowercase tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Upload => "upload",
            Self::Export => "export",
        }
    }

    /// The bit representing this level.
    #[must_use]
    pub const fn flag(self) -> AccessLevels {
        match self {
            Self::View => AccessLevels::VIEW,
            Self::Create => AccessLevels::CREATE,
            Self::Edit => AccessLevels::EDIT,
            Self::Delete => AccessLevels::DELETE,
            Self::Upload => AccessLevels::UPLOAD,
            Self::Export => AccessLevels::EXPORT,
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = CatalogError;

    /// Parse a tag, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| CatalogError::UnknownAccess(s.to_string()))
    }
}

bitflags! {
    /// A set of access levels held for one module.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessLevels: u8 {
        const VIEW   = 1 << 0;
        const CREATE = 1 << 1;
        const EDIT   = 1 << 2;
        const DELETE = 1 << 3;
        const UPLOAD = 1 << 4;
        const EXPORT = 1 << 5;
    }
}

impl AccessLevels {
    /// Check if this set includes the given level.
    ///
    /// # Examples
    ///
    /// ```
    /// use atrium_server::permissions::{AccessLevel, AccessLevels};
    ///
    /// let levels = AccessLevels::VIEW | AccessLevels::EDIT;
    /// assert!(levels.has(AccessLevel::Edit));
    /// assert!(!levels.has(AccessLevel::Delete));
    /// ```
    #[must_use]
    pub const fn has(self, level: AccessLevel) -> bool {
        self.contains(level.flag())
    }

    /// Iterate the individual levels in this set, in display order.
    pub fn levels(self) -> impl Iterator<Item = AccessLevel> {
        AccessLevel::ALL
            .into_iter()
            .filter(move |level| self.has(*level))
    }
}

impl Default for AccessLevels {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<AccessLevel> for AccessLevels {
    fn from(level: AccessLevel) -> Self {
        level.flag()
    }
}

impl FromIterator<AccessLevel> for AccessLevels {
    fn from_iter<I: IntoIterator<Item = AccessLevel>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |acc, level| acc | level.flag())
    }
}

impl fmt::Display for AccessLevels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for level in self.levels() {
            if !first {
                f.write_str(", ")?;
            }
            f.write_str(level.as_str())?;
            first = false;
        }
        Ok(())
    }
}

// Serialized as a list of tags so stored sets stay readable in JSONB.
impl Serialize for AccessLevels {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.levels().map(AccessLevel::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_level_bits() {
        assert_eq!(AccessLevels::VIEW.bits(), 1 << 0);
        assert_eq!(AccessLevels::CREATE.bits(), 1 << 1);
        assert_eq!(AccessLevels::EDIT.bits(), 1 << 2);
        assert_eq!(AccessLevels::DELETE.bits(), 1 << 3);
        assert_eq!(AccessLevels::UPLOAD.bits(), 1 << 4);
        assert_eq!(AccessLevels::EXPORT.bits(), 1 << 5);
    }

    #[test]
    fn test_every_level_has_distinct_flag() {
        let all: AccessLevels = AccessLevel::ALL.into_iter().collect();
        assert_eq!(all, AccessLevels::all());
        assert_eq!(all.levels().count(), AccessLevel::ALL.len());
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("VIEW".parse::<AccessLevel>(), Ok(AccessLevel::View));
        assert_eq!(" Edit ".parse::<AccessLevel>(), Ok(AccessLevel::Edit));
        assert_eq!("delete".parse::<AccessLevel>(), Ok(AccessLevel::Delete));
    }

    #[test]
    fn test_parse_unknown_tag() {
        let err = "approve".parse::<AccessLevel>().unwrap_err();
        assert_eq!(err, CatalogError::UnknownAccess("approve".into()));
    }

    #[test]
    fn test_display_lists_tags_in_order() {
        let levels = AccessLevels::DELETE | AccessLevels::VIEW;
        assert_eq!(levels.to_string(), "view, delete");
        assert_eq!(AccessLevels::empty().to_string(), "");
    }

    #[test]
    fn test_serialize_as_tag_list() {
        let json = serde_json::to_value(AccessLevels::VIEW | AccessLevels::EXPORT).unwrap();
        assert_eq!(json, serde_json::json!(["view", "export"]));
    }
}
