//! Role template lifecycle.

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use super::catalog::{parse_entries, CatalogError};
use super::models::{CreateRoleRequest, Role, UpdateRolePermissionsRequest};
use super::queries::{self, RoleDeletion};

#[derive(Debug, Error)]
pub enum RoleError {
    #[error("Role not found")]
    NotFound,

    #[error("Role type already exists: {0}")]
    Duplicate(String),

    #[error("Role is still assigned to accounts")]
    InUse,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

/// Create a role from a validated request.
#[tracing::instrument(skip(pool, request), fields(role_type = %request.role_type))]
pub async fn create_role(pool: &PgPool, request: &CreateRoleRequest) -> Result<Role, RoleError> {
    request
        .validate()
        .map_err(|e| RoleError::Validation(e.to_string()))?;

    let role_type = request.role_type.trim();
    if role_type.is_empty() {
        return Err(RoleError::Validation("Role type is required".into()));
    }
    let permissions = parse_entries(&request.permissions)?;

    let role = queries::create_role(pool, role_type, &permissions)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RoleError::Duplicate(role_type.to_string())
            }
            other => RoleError::Database(other),
        })?;

    tracing::info!(role_id = %role.id, "Role created");
    Ok(role)
}

/// Replace a role's baseline permissions.
///
/// Accounts pick up the change the next time their effective set is resolved.
#[tracing::instrument(skip(pool, request))]
pub async fn update_role_permissions(
    pool: &PgPool,
    role_id: Uuid,
    request: &UpdateRolePermissionsRequest,
) -> Result<Role, RoleError> {
    let permissions = parse_entries(&request.permissions)?;

    queries::update_role_permissions(pool, role_id, &permissions)
        .await?
        .ok_or(RoleError::NotFound)
}

/// Soft-delete a role. Refused while any account still references it.
#[tracing::instrument(skip(pool))]
pub async fn delete_role(pool: &PgPool, role_id: Uuid) -> Result<(), RoleError> {
    match queries::soft_delete_role(pool, role_id).await? {
        RoleDeletion::Deleted => {
            tracing::info!(%role_id, "Role soft-deleted");
            Ok(())
        }
        RoleDeletion::InUse => Err(RoleError::InUse),
        RoleDeletion::NotFound => Err(RoleError::NotFound),
    }
}
