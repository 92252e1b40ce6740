//! Store contracts for role templates and account overrides.
//!
//! The resolution engine only consumes these traits. [`super::PgStore`]
//! backs them with `PostgreSQL`; [`MemoryStore`] keeps everything in
//! process.

use std::future::Future;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use super::models::{AccountOverride, Overrides, Role};
use super::set::PermissionSet;

/// Store-level errors. Propagated unchanged to callers; nothing here retries.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Stored permissions are invalid: {0}")]
    InvalidData(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(err.to_string())
            }
            // JSONB permission columns decode through the catalog; a rejected
            // entry surfaces as a serde_json error on that column.
            sqlx::Error::ColumnDecode { index, source }
                if source.downcast_ref::<serde_json::Error>().is_some() =>
            {
                Self::InvalidData(format!("column {index}: {source}"))
            }
            other => Self::Database(other),
        }
    }
}

/// Source of role templates.
pub trait RoleStore: Send + Sync {
    /// Fetch a role by id, including soft-deleted roles.
    fn get_role(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = Result<Option<Role>, StoreError>> + Send;
}

/// Persistence for per-account role assignments and overrides.
pub trait OverrideStore: Send + Sync {
    /// Fetch an account's record; accounts never written return
    /// [`AccountOverride::empty`].
    fn get_override(
        &self,
        account_id: Uuid,
    ) -> impl Future<Output = Result<AccountOverride, StoreError>> + Send;

    /// Replace both override sets for an account.
    fn put_override(
        &self,
        account_id: Uuid,
        overrides: &Overrides,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Point an account at a role, leaving its overrides untouched.
    fn put_account_role(
        &self,
        account_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Read-modify-write an account's overrides under a lock on its record.
    ///
    /// `apply` sees the current record and returns the overrides to store,
    /// or `None` to leave the record untouched. Returns the record as
    /// written, or `None` when nothing was written.
    ///
    /// The default reads then writes without locking.
    fn update_override<F>(
        &self,
        account_id: Uuid,
        apply: F,
    ) -> impl Future<Output = Result<Option<AccountOverride>, StoreError>> + Send
    where
        F: FnOnce(&AccountOverride) -> Option<Overrides> + Send,
    {
        async move {
            let current = self.get_override(account_id).await?;
            let Some(next) = apply(&current) else {
                return Ok(None);
            };
            self.put_override(account_id, &next).await?;
            Ok(Some(AccountOverride {
                granted: next.granted,
                revoked: next.revoked,
                ..current
            }))
        }
    }

    /// Write role and overrides for one account.
    ///
    /// The default issues two writes. Stores that can write all fields
    /// atomically should override this.
    fn apply_assignment(
        &self,
        account_id: Uuid,
        role_id: Uuid,
        overrides: &Overrides,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        async move {
            self.put_account_role(account_id, role_id).await?;
            self.put_override(account_id, overrides).await
        }
    }
}

/// In-process store backed by `DashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    roles: DashMap<Uuid, Role>,
    accounts: DashMap<Uuid, AccountOverride>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a role.
    pub fn insert_role(&self, role: Role) {
        self.roles.insert(role.id, role);
    }

    /// Create and store a role, returning a copy.
    pub fn create_role(&self, role_type: &str, permissions: PermissionSet) -> Role {
        let role = Role::new(role_type, permissions);
        self.insert_role(role.clone());
        role
    }

    /// Soft-delete a role unless an account still references it.
    ///
    /// Returns `true` if the role was marked deleted.
    pub fn soft_delete_role(&self, role_id: Uuid) -> bool {
        let in_use = self
            .accounts
            .iter()
            .any(|record| record.role_id == Some(role_id));
        if in_use {
            return false;
        }

        match self.roles.get_mut(&role_id) {
            Some(mut role) if !role.is_deleted() => {
                role.deleted_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }
}

impl RoleStore for MemoryStore {
    async fn get_role(&self, role_id: Uuid) -> Result<Option<Role>, StoreError> {
        Ok(self.roles.get(&role_id).map(|role| role.clone()))
    }
}

impl OverrideStore for MemoryStore {
    async fn get_override(&self, account_id: Uuid) -> Result<AccountOverride, StoreError> {
        Ok(self
            .accounts
            .get(&account_id)
            .map_or_else(|| AccountOverride::empty(account_id), |record| record.clone()))
    }

    async fn put_override(
        &self,
        account_id: Uuid,
        overrides: &Overrides,
    ) -> Result<(), StoreError> {
        let mut record = self
            .accounts
            .entry(account_id)
            .or_insert_with(|| AccountOverride::empty(account_id));
        record.revoked = overrides.revoked.clone();
        record.granted = overrides.granted.clone();
        record.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn put_account_role(&self, account_id: Uuid, role_id: Uuid) -> Result<(), StoreError> {
        let mut record = self
            .accounts
            .entry(account_id)
            .or_insert_with(|| AccountOverride::empty(account_id));
        record.role_id = Some(role_id);
        record.updated_at = Some(Utc::now());
        Ok(())
    }

    // Holds the shard lock for the whole read-modify-write.
    async fn update_override<F>(
        &self,
        account_id: Uuid,
        apply: F,
    ) -> Result<Option<AccountOverride>, StoreError>
    where
        F: FnOnce(&AccountOverride) -> Option<Overrides> + Send,
    {
        match self.accounts.entry(account_id) {
            Entry::Occupied(mut entry) => {
                let Some(next) = apply(entry.get()) else {
                    return Ok(None);
                };
                let record = entry.get_mut();
                record.revoked = next.revoked;
                record.granted = next.granted;
                record.updated_at = Some(Utc::now());
                Ok(Some(record.clone()))
            }
            Entry::Vacant(entry) => {
                let Some(next) = apply(&AccountOverride::empty(account_id)) else {
                    return Ok(None);
                };
                let record = AccountOverride {
                    granted: next.granted,
                    revoked: next.revoked,
                    updated_at: Some(Utc::now()),
                    ..AccountOverride::empty(account_id)
                };
                entry.insert(record.clone());
                Ok(Some(record))
            }
        }
    }

    // Single entry guard, so readers never see a half-applied record.
    async fn apply_assignment(
        &self,
        account_id: Uuid,
        role_id: Uuid,
        overrides: &Overrides,
    ) -> Result<(), StoreError> {
        let mut record = self
            .accounts
            .entry(account_id)
            .or_insert_with(|| AccountOverride::empty(account_id));
        record.role_id = Some(role_id);
        record.revoked = overrides.revoked.clone();
        record.granted = overrides.granted.clone();
        record.updated_at = Some(Utc::now());
        Ok(())
    }
}
