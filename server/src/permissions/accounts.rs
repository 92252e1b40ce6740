//! Account-level permission operations for the admin console.
//!
//! Wraps the pure resolver with store reads and writes. The customization
//! switch is enforced here, by the calling layer, not by the resolver.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::catalog::{parse_access, parse_module, CatalogError};
use super::models::{Overrides, ToggleCapabilityRequest};
use super::resolver::{resolve, toggle_capability};
use super::set::PermissionSet;
use super::store::{OverrideStore, RoleStore, StoreError};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Permission customization is not enabled")]
    CustomizationDisabled,

    #[error("Account role changed while editing, reload and retry")]
    RoleChanged,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a persisted capability toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomizationOutcome {
    pub overrides: Overrides,
    pub effective: PermissionSet,
}

/// Base permissions for a role, or an empty set when the account has no
/// role or the role no longer exists.
async fn role_base<R: RoleStore>(
    roles: &R,
    role_id: Option<Uuid>,
) -> Result<PermissionSet, StoreError> {
    let Some(role_id) = role_id else {
        return Ok(PermissionSet::new());
    };

    match roles.get_role(role_id).await {
        Ok(Some(role)) => Ok(role.permissions),
        Ok(None) | Err(StoreError::NotFound) => {
            tracing::warn!(%role_id, "Assigned role not found, resolving with empty base");
            Ok(PermissionSet::new())
        }
        Err(e) => Err(e),
    }
}

/// Effective permissions an account actually holds.
#[tracing::instrument(skip(roles, overrides))]
pub async fn get_effective_permissions<R: RoleStore, O: OverrideStore>(
    roles: &R,
    overrides: &O,
    account_id: Uuid,
) -> Result<PermissionSet, StoreError> {
    let record = overrides.get_override(account_id).await?;
    let base = role_base(roles, record.role_id).await?;
    Ok(resolve(&base, &record.granted, &record.revoked))
}

/// Flip one capability for an account and persist the new overrides.
///
/// Refused with [`AccountError::CustomizationDisabled`] unless the request
/// carries `customize`; nothing is written in that case. The toggle is
/// applied to the overrides as they stand when the record is locked, so
/// concurrent toggles on one account do not overwrite each other. If the
/// account's role was changed in the meantime, [`AccountError::RoleChanged`]
/// is returned and nothing is written.
#[tracing::instrument(
    skip(roles, overrides, request),
    fields(module = %request.module, access = %request.access, checked = request.checked)
)]
pub async fn toggle_account_capability<R: RoleStore, O: OverrideStore>(
    roles: &R,
    overrides: &O,
    account_id: Uuid,
    request: &ToggleCapabilityRequest,
) -> Result<CustomizationOutcome, AccountError> {
    if !request.customize {
        return Err(AccountError::CustomizationDisabled);
    }

    let module = parse_module(&request.module)?;
    let access = parse_access(module, &request.access)?;

    let role_id = overrides.get_override(account_id).await?.role_id;
    let base = role_base(roles, role_id).await?;

    let written = overrides
        .update_override(account_id, |current| {
            (current.role_id == role_id).then(|| {
                toggle_capability(module, access, request.checked, &base, &current.overrides())
            })
        })
        .await?
        .ok_or(AccountError::RoleChanged)?;

    let next = written.overrides();
    let effective = next.resolve(&base);
    Ok(CustomizationOutcome {
        overrides: next,
        effective,
    })
}

/// Turn customization off for an account: both override sets are emptied.
#[tracing::instrument(skip(overrides))]
pub async fn clear_customization<O: OverrideStore>(
    overrides: &O,
    account_id: Uuid,
) -> Result<(), StoreError> {
    overrides.put_override(account_id, &Overrides::default()).await
}
