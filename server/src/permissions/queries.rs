//! Database queries for roles and account overrides.
//!
//! Provides async functions for managing:
//! - Role templates (create, update baseline, soft delete)
//! - Per-account role assignment and grant/revoke overrides
//!
//! [`PgStore`] exposes the account side through the store traits.

use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{AccountOverride, Overrides, Role};
use super::set::PermissionSet;
use super::store::{OverrideStore, RoleStore, StoreError};

// ============================================================================
// Role Queries
// ============================================================================

/// Get a role by ID, including soft-deleted roles.
pub async fn get_role(pool: &PgPool, role_id: Uuid) -> sqlx::Result<Option<Role>> {
    sqlx::query_as::<_, Role>(
        r"
        SELECT id, role_type, permissions, deleted_at, created_at, updated_at
        FROM roles
        WHERE id = $1
        ",
    )
    .bind(role_id)
    .fetch_optional(pool)
    .await
}

/// List roles that have not been deleted, ordered by role type.
pub async fn list_roles(pool: &PgPool) -> sqlx::Result<Vec<Role>> {
    sqlx::query_as::<_, Role>(
        r"
        SELECT id, role_type, permissions, deleted_at, created_at, updated_at
        FROM roles
        WHERE deleted_at IS NULL
        ORDER BY role_type ASC
        ",
    )
    .fetch_all(pool)
    .await
}

/// Create a new role.
pub async fn create_role(
    pool: &PgPool,
    role_type: &str,
    permissions: &PermissionSet,
) -> sqlx::Result<Role> {
    sqlx::query_as::<_, Role>(
        r"
        INSERT INTO roles (id, role_type, permissions)
        VALUES ($1, $2, $3)
        RETURNING id, role_type, permissions, deleted_at, created_at, updated_at
        ",
    )
    .bind(Uuid::now_v7())
    .bind(role_type)
    .bind(Json(permissions))
    .fetch_one(pool)
    .await
}

/// Replace a role's baseline permissions.
///
/// Returns `None` if the role does not exist or is deleted.
pub async fn update_role_permissions(
    pool: &PgPool,
    role_id: Uuid,
    permissions: &PermissionSet,
) -> sqlx::Result<Option<Role>> {
    sqlx::query_as::<_, Role>(
        r"
        UPDATE roles
        SET permissions = $2,
            updated_at = NOW()
        WHERE id = $1
          AND deleted_at IS NULL
        RETURNING id, role_type, permissions, deleted_at, created_at, updated_at
        ",
    )
    .bind(role_id)
    .bind(Json(permissions))
    .fetch_optional(pool)
    .await
}

/// Outcome of a soft-delete attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleDeletion {
    Deleted,
    InUse,
    NotFound,
}

/// Soft-delete a role if no account references it.
///
/// The role row is locked `FOR UPDATE`, which conflicts with the `FOR SHARE`
/// lock taken by [`assign_account`], so a role cannot be deleted while an
/// assignment to it is in flight.
pub async fn soft_delete_role(pool: &PgPool, role_id: Uuid) -> sqlx::Result<RoleDeletion> {
    let mut tx = pool.begin().await?;

    let locked: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM roles WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
    )
    .bind(role_id)
    .fetch_optional(&mut *tx)
    .await?;

    if locked.is_none() {
        return Ok(RoleDeletion::NotFound);
    }

    let (in_use,): (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM account_permissions WHERE role_id = $1)",
    )
    .bind(role_id)
    .fetch_one(&mut *tx)
    .await?;

    if in_use {
        return Ok(RoleDeletion::InUse);
    }

    sqlx::query("UPDATE roles SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1")
        .bind(role_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(RoleDeletion::Deleted)
}

// ============================================================================
// Account Override Queries
// ============================================================================

/// Get the stored record for an account, if one exists.
pub async fn get_account_override(
    pool: &PgPool,
    account_id: Uuid,
) -> sqlx::Result<Option<AccountOverride>> {
    sqlx::query_as::<_, AccountOverride>(
        r"
        SELECT account_id, role_id, granted, revoked, updated_at
        FROM account_permissions
        WHERE account_id = $1
        ",
    )
    .bind(account_id)
    .fetch_optional(pool)
    .await
}

/// Replace both override sets for an account.
///
/// One statement, so `granted` and `revoked` are never observed half-updated.
pub async fn put_account_override(
    pool: &PgPool,
    account_id: Uuid,
    overrides: &Overrides,
) -> sqlx::Result<()> {
    sqlx::query(
        r"
        INSERT INTO account_permissions (account_id, granted, revoked)
        VALUES ($1, $2, $3)
        ON CONFLICT (account_id) DO UPDATE
        SET revoked = EXCLUDED.revoked,
            granted = EXCLUDED.granted,
            updated_at = NOW()
        ",
    )
    .bind(account_id)
    .bind(Json(&overrides.granted))
    .bind(Json(&overrides.revoked))
    .execute(pool)
    .await?;

    Ok(())
}

/// Read-modify-write an account's overrides in one transaction.
///
/// The record is locked `FOR UPDATE` before `apply` sees it, so concurrent
/// edits of the same account are applied one after the other. A missing
/// record is created empty first; when `apply` returns `None` the
/// transaction is rolled back and nothing is kept.
pub async fn update_account_override<F>(
    pool: &PgPool,
    account_id: Uuid,
    apply: F,
) -> sqlx::Result<Option<AccountOverride>>
where
    F: FnOnce(&AccountOverride) -> Option<Overrides> + Send,
{
    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
        INSERT INTO account_permissions (account_id)
        VALUES ($1)
        ON CONFLICT (account_id) DO NOTHING
        ",
    )
    .bind(account_id)
    .execute(&mut *tx)
    .await?;

    let current = sqlx::query_as::<_, AccountOverride>(
        r"
        SELECT account_id, role_id, granted, revoked, updated_at
        FROM account_permissions
        WHERE account_id = $1
        FOR UPDATE
        ",
    )
    .bind(account_id)
    .fetch_one(&mut *tx)
    .await?;

    let Some(next) = apply(&current) else {
        return Ok(None);
    };

    let written = sqlx::query_as::<_, AccountOverride>(
        r"
        UPDATE account_permissions
        SET revoked = $2,
            granted = $3,
            updated_at = NOW()
        WHERE account_id = $1
        RETURNING account_id, role_id, granted, revoked, updated_at
        ",
    )
    .bind(account_id)
    .bind(Json(&next.revoked))
    .bind(Json(&next.granted))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(written))
}

/// Point an account at a role. New records start with empty overrides.
pub async fn put_account_role(
    pool: &PgPool,
    account_id: Uuid,
    role_id: Uuid,
) -> sqlx::Result<()> {
    sqlx::query(
        r"
        INSERT INTO account_permissions (account_id, role_id)
        VALUES ($1, $2)
        ON CONFLICT (account_id) DO UPDATE
        SET role_id = EXCLUDED.role_id,
            updated_at = NOW()
        ",
    )
    .bind(account_id)
    .bind(role_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Assign a role and overrides to one account in a single transaction.
///
/// Fails with `RowNotFound` if the role is missing or was deleted.
pub async fn assign_account(
    pool: &PgPool,
    account_id: Uuid,
    role_id: Uuid,
    overrides: &Overrides,
) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT id FROM roles WHERE id = $1 AND deleted_at IS NULL FOR SHARE")
        .bind(role_id)
        .fetch_one(&mut *tx)
        .await?;

    sqlx::query(
        r"
        INSERT INTO account_permissions (account_id, role_id, granted, revoked)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (account_id) DO UPDATE
        SET role_id = EXCLUDED.role_id,
            revoked = EXCLUDED.revoked,
            granted = EXCLUDED.granted,
            updated_at = NOW()
        ",
    )
    .bind(account_id)
    .bind(role_id)
    .bind(Json(&overrides.granted))
    .bind(Json(&overrides.revoked))
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

/// Empty both override sets, keeping the assigned role.
///
/// Returns `true` if the account had a record.
pub async fn clear_account_override(pool: &PgPool, account_id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r"
        UPDATE account_permissions
        SET revoked = '[]'::jsonb,
            granted = '[]'::jsonb,
            updated_at = NOW()
        WHERE account_id = $1
        ",
    )
    .bind(account_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Store Implementation
// ============================================================================

/// `PostgreSQL`-backed role and override store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl RoleStore for PgStore {
    #[tracing::instrument(skip(self))]
    async fn get_role(&self, role_id: Uuid) -> Result<Option<Role>, StoreError> {
        Ok(get_role(&self.pool, role_id).await?)
    }
}

impl OverrideStore for PgStore {
    #[tracing::instrument(skip(self))]
    async fn get_override(&self, account_id: Uuid) -> Result<AccountOverride, StoreError> {
        let record = get_account_override(&self.pool, account_id).await?;
        Ok(record.unwrap_or_else(|| AccountOverride::empty(account_id)))
    }

    #[tracing::instrument(skip(self, overrides))]
    async fn put_override(
        &self,
        account_id: Uuid,
        overrides: &Overrides,
    ) -> Result<(), StoreError> {
        Ok(put_account_override(&self.pool, account_id, overrides).await?)
    }

    #[tracing::instrument(skip(self))]
    async fn put_account_role(&self, account_id: Uuid, role_id: Uuid) -> Result<(), StoreError> {
        Ok(put_account_role(&self.pool, account_id, role_id).await?)
    }

    #[tracing::instrument(skip(self, apply))]
    async fn update_override<F>(
        &self,
        account_id: Uuid,
        apply: F,
    ) -> Result<Option<AccountOverride>, StoreError>
    where
        F: FnOnce(&AccountOverride) -> Option<Overrides> + Send,
    {
        Ok(update_account_override(&self.pool, account_id, apply).await?)
    }

    #[tracing::instrument(skip(self, overrides))]
    async fn apply_assignment(
        &self,
        account_id: Uuid,
        role_id: Uuid,
        overrides: &Overrides,
    ) -> Result<(), StoreError> {
        Ok(assign_account(&self.pool, account_id, role_id, overrides).await?)
    }
}
