//! Role and override records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::catalog::RawPermissionEntry;
use super::resolver::resolve;
use super::set::PermissionSet;

/// Role template with its baseline permissions.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Role {
    pub id: Uuid,
    pub role_type: String,
    #[sqlx(json)]
    pub permissions: PermissionSet,
    /// Set when the role is soft-deleted. Deleted roles are never removed.
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Build a new, not yet persisted role.
    #[must_use]
    pub fn new(role_type: impl Into<String>, permissions: PermissionSet) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            role_type: role_type.into(),
            permissions,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Per-account grant and revoke sets layered on top of a role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    pub granted: PermissionSet,
    pub revoked: PermissionSet,
}

impl Overrides {
    #[must_use]
    pub const fn new(granted: PermissionSet, revoked: PermissionSet) -> Self {
        Self { granted, revoked }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.granted.is_empty() && self.revoked.is_empty()
    }

    /// Effective permissions of these overrides applied to `base`.
    #[must_use]
    pub fn resolve(&self, base: &PermissionSet) -> PermissionSet {
        resolve(base, &self.granted, &self.revoked)
    }
}

/// Stored per-account record: assigned role plus overrides.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct AccountOverride {
    pub account_id: Uuid,
    pub role_id: Option<Uuid>,
    #[sqlx(json)]
    pub granted: PermissionSet,
    #[sqlx(json)]
    pub revoked: PermissionSet,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AccountOverride {
    /// Record for an account that has never been assigned a role.
    #[must_use]
    pub const fn empty(account_id: Uuid) -> Self {
        Self {
            account_id,
            role_id: None,
            granted: PermissionSet::new(),
            revoked: PermissionSet::new(),
            updated_at: None,
        }
    }

    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides::new(self.granted.clone(), self.revoked.clone())
    }
}

/// Request types for the admin console
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 64, message = "Role type must be 1-64 characters"))]
    pub role_type: String,
    #[serde(default)]
    pub permissions: Vec<RawPermissionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRolePermissionsRequest {
    pub permissions: Vec<RawPermissionEntry>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssignRoleRequest {
    #[validate(length(max = 500, message = "Too many accounts in one batch"))]
    pub account_ids: Vec<Uuid>,
    pub role_id: Uuid,
    #[serde(default)]
    pub granted: Vec<RawPermissionEntry>,
    #[serde(default)]
    pub revoked: Vec<RawPermissionEntry>,
}

/// One checkbox flip in the customization panel.
#[derive(Debug, Clone, Deserialize)]
pub struct ToggleCapabilityRequest {
    pub module: String,
    pub access: String,
    pub checked: bool,
    /// Whether the administrator has customization switched on.
    #[serde(default)]
    pub customize: bool,
}
