//! Reusable test helpers for permission integration tests.
//!
//! Provides store wrappers that fail on demand, so bulk assignment can be
//! exercised against partial and total store outages.
#![allow(dead_code)]

use std::collections::HashSet;

use atrium_server::permissions::{
    AccessLevels, AccountOverride, MemoryStore, Module, OverrideStore, Overrides, PermissionSet,
    Role, RoleStore, StoreError,
};
use uuid::Uuid;

/// Build a permission set from `(module, levels)` pairs.
pub fn perms(entries: &[(Module, AccessLevels)]) -> PermissionSet {
    entries.iter().copied().collect()
}

/// In-memory store whose writes fail for selected accounts.
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing: HashSet<Uuid>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write for `account_id` fail.
    pub fn fail_writes_for(&mut self, account_id: Uuid) {
        self.failing.insert(account_id);
    }

    fn check(&self, account_id: Uuid) -> Result<(), StoreError> {
        if self.failing.contains(&account_id) {
            Err(StoreError::Unavailable("connection reset by peer".into()))
        } else {
            Ok(())
        }
    }
}

impl RoleStore for FlakyStore {
    async fn get_role(&self, role_id: Uuid) -> Result<Option<Role>, StoreError> {
        self.inner.get_role(role_id).await
    }
}

impl OverrideStore for FlakyStore {
    async fn get_override(&self, account_id: Uuid) -> Result<AccountOverride, StoreError> {
        self.inner.get_override(account_id).await
    }

    async fn put_override(
        &self,
        account_id: Uuid,
        overrides: &Overrides,
    ) -> Result<(), StoreError> {
        self.check(account_id)?;
        self.inner.put_override(account_id, overrides).await
    }

    async fn put_account_role(&self, account_id: Uuid, role_id: Uuid) -> Result<(), StoreError> {
        self.check(account_id)?;
        self.inner.put_account_role(account_id, role_id).await
    }

    async fn apply_assignment(
        &self,
        account_id: Uuid,
        role_id: Uuid,
        overrides: &Overrides,
    ) -> Result<(), StoreError> {
        self.check(account_id)?;
        self.inner
            .apply_assignment(account_id, role_id, overrides)
            .await
    }
}

/// Store that is entirely unreachable.
#[derive(Debug, Default)]
pub struct DownStore;

impl RoleStore for DownStore {
    async fn get_role(&self, _role_id: Uuid) -> Result<Option<Role>, StoreError> {
        Err(StoreError::Unavailable("pool timed out".into()))
    }
}

impl OverrideStore for DownStore {
    async fn get_override(&self, _account_id: Uuid) -> Result<AccountOverride, StoreError> {
        Err(StoreError::Unavailable("pool timed out".into()))
    }

    async fn put_override(
        &self,
        _account_id: Uuid,
        _overrides: &Overrides,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("pool timed out".into()))
    }

    async fn put_account_role(&self, _account_id: Uuid, _role_id: Uuid) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("pool timed out".into()))
    }
}
