//! Bulk role assignment.
//!
//! Applies one role and one shared override payload to a list of accounts.
//! Each account is written independently: a failure is recorded against
//! that account and never rolls back or blocks the others. Nothing here
//! resolves effective permissions; resolution happens wherever an
//! effective set is read.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use super::access::AccessLevels;
use super::catalog::{parse_entries, CatalogError, Module};
use super::models::{AssignRoleRequest, Overrides};
use super::set::PermissionSet;
use super::store::{OverrideStore, RoleStore, StoreError};

/// Writes in flight at once when no concurrency is configured.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Errors that stop a batch before any account is written.
#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("No accounts selected")]
    EmptyBatch,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Module {module} has {access} both granted and revoked")]
    OverlappingOverrides { module: Module, access: AccessLevels },

    #[error("Role {0} not found")]
    RoleNotFound(Uuid),

    #[error("Role {0} has been deleted")]
    RoleDeleted(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One account whose write failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentFailure {
    pub account_id: Uuid,
    pub reason: String,
}

/// How much of a batch landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Complete,
    Partial,
    Failed,
}

/// Per-account outcome of a bulk assignment, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentResult {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<AssignmentFailure>,
}

impl AssignmentResult {
    #[must_use]
    pub fn status(&self) -> BatchStatus {
        match (self.succeeded.is_empty(), self.failed.is_empty()) {
            (_, true) => BatchStatus::Complete,
            (true, false) => BatchStatus::Failed,
            (false, false) => BatchStatus::Partial,
        }
    }
}

/// Coordinates role assignment across many accounts.
pub struct BulkAssigner<'a, R, O> {
    roles: &'a R,
    overrides: &'a O,
    concurrency: usize,
}

impl<'a, R: RoleStore, O: OverrideStore> BulkAssigner<'a, R, O> {
    pub const fn new(roles: &'a R, overrides: &'a O) -> Self {
        Self {
            roles,
            overrides,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Bound the number of account writes in flight. Zero is treated as one.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Validate a console request and run the assignment.
    pub async fn assign(
        &self,
        request: &AssignRoleRequest,
    ) -> Result<AssignmentResult, AssignmentError> {
        request
            .validate()
            .map_err(|e| AssignmentError::Validation(e.to_string()))?;

        let granted = parse_entries(&request.granted)?;
        let revoked = parse_entries(&request.revoked)?;

        self.assign_role(&request.account_ids, request.role_id, granted, revoked)
            .await
    }

    /// Write `role_id` and the shared `granted`/`revoked` pair to every
    /// account in `account_ids`.
    ///
    /// Duplicate ids are written once. A failure loading the role is
    /// returned as-is; failures writing an account end up in
    /// [`AssignmentResult::failed`].
    #[tracing::instrument(
        skip(self, account_ids, granted, revoked),
        fields(accounts = account_ids.len())
    )]
    pub async fn assign_role(
        &self,
        account_ids: &[Uuid],
        role_id: Uuid,
        granted: PermissionSet,
        revoked: PermissionSet,
    ) -> Result<AssignmentResult, AssignmentError> {
        if account_ids.is_empty() {
            return Err(AssignmentError::EmptyBatch);
        }

        if let Some((module, access)) = granted.overlap(&revoked) {
            return Err(AssignmentError::OverlappingOverrides { module, access });
        }

        let role = match self.roles.get_role(role_id).await {
            Ok(Some(role)) => role,
            Ok(None) | Err(StoreError::NotFound) => {
                return Err(AssignmentError::RoleNotFound(role_id))
            }
            Err(e) => return Err(e.into()),
        };
        if role.is_deleted() {
            return Err(AssignmentError::RoleDeleted(role_id));
        }

        let mut seen = HashSet::with_capacity(account_ids.len());
        let pending: Vec<Uuid> = account_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        let overrides = Overrides::new(granted, revoked);
        let outcomes: Vec<(Uuid, Result<(), StoreError>)> = stream::iter(pending)
            .map(|account_id| {
                let overrides = &overrides;
                async move {
                    let outcome = self
                        .overrides
                        .apply_assignment(account_id, role_id, overrides)
                        .await;
                    (account_id, outcome)
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut result = AssignmentResult::default();
        for (account_id, outcome) in outcomes {
            match outcome {
                Ok(()) => result.succeeded.push(account_id),
                Err(e) => {
                    tracing::warn!(%account_id, error = %e, "Failed to assign role to account");
                    result.failed.push(AssignmentFailure {
                        account_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "Bulk role assignment finished"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{MemoryStore, RawPermissionEntry};

    fn base() -> PermissionSet {
        [(Module::Accounts, AccessLevels::VIEW | AccessLevels::EDIT)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_batch_status() {
        let id = Uuid::now_v7();
        let failure = AssignmentFailure {
            account_id: id,
            reason: "down".into(),
        };

        let complete = AssignmentResult {
            succeeded: vec![id],
            failed: vec![],
        };
        assert_eq!(complete.status(), BatchStatus::Complete);

        let partial = AssignmentResult {
            succeeded: vec![id],
            failed: vec![failure.clone()],
        };
        assert_eq!(partial.status(), BatchStatus::Partial);

        let failed = AssignmentResult {
            succeeded: vec![],
            failed: vec![failure],
        };
        assert_eq!(failed.status(), BatchStatus::Failed);
    }

    #[tokio::test]
    async fn test_assigns_every_account() {
        let store = MemoryStore::new();
        let role = store.create_role("Staff", base());
        let ids = [Uuid::now_v7(), Uuid::now_v7()];
        let revoked: PermissionSet = [(Module::Accounts, AccessLevels::EDIT)].into_iter().collect();

        let result = BulkAssigner::new(&store, &store)
            .assign_role(&ids, role.id, PermissionSet::new(), revoked.clone())
            .await
            .unwrap();

        assert_eq!(result.succeeded, ids);
        assert_eq!(result.status(), BatchStatus::Complete);
        for id in ids {
            let record = store.get_override(id).await.unwrap();
            assert_eq!(record.role_id, Some(role.id));
            assert_eq!(record.revoked, revoked);
            assert!(record.granted.is_empty());
        }
    }

    #[tokio::test]
    async fn test_duplicate_ids_written_once() {
        let store = MemoryStore::new();
        let role = store.create_role("Staff", base());
        let id = Uuid::now_v7();

        let result = BulkAssigner::new(&store, &store)
            .assign_role(&[id, id], role.id, PermissionSet::new(), PermissionSet::new())
            .await
            .unwrap();

        assert_eq!(result.succeeded, vec![id]);
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let store = MemoryStore::new();
        let role = store.create_role("Staff", base());

        let err = BulkAssigner::new(&store, &store)
            .assign_role(&[], role.id, PermissionSet::new(), PermissionSet::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AssignmentError::EmptyBatch));
    }

    #[tokio::test]
    async fn test_unknown_role_rejected() {
        let store = MemoryStore::new();
        let role_id = Uuid::now_v7();

        let err = BulkAssigner::new(&store, &store)
            .assign_role(&[Uuid::now_v7()], role_id, PermissionSet::new(), PermissionSet::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AssignmentError::RoleNotFound(id) if id == role_id));
    }

    #[tokio::test]
    async fn test_deleted_role_rejected_before_writes() {
        let store = MemoryStore::new();
        let role = store.create_role("Retired", base());
        assert!(store.soft_delete_role(role.id));
        let account_id = Uuid::now_v7();

        let err = BulkAssigner::new(&store, &store)
            .assign_role(&[account_id], role.id, PermissionSet::new(), PermissionSet::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AssignmentError::RoleDeleted(_)));
        assert_eq!(store.get_override(account_id).await.unwrap().role_id, None);
    }

    #[tokio::test]
    async fn test_overlapping_overrides_rejected() {
        let store = MemoryStore::new();
        let role = store.create_role("Staff", base());
        let both: PermissionSet = [(Module::Reports, AccessLevels::EXPORT)].into_iter().collect();

        let err = BulkAssigner::new(&store, &store)
            .assign_role(&[Uuid::now_v7()], role.id, both.clone(), both)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AssignmentError::OverlappingOverrides {
                module: Module::Reports,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_request_entries_validated() {
        let store = MemoryStore::new();
        let role = store.create_role("Staff", base());
        let request = AssignRoleRequest {
            account_ids: vec![Uuid::now_v7()],
            role_id: role.id,
            granted: vec![RawPermissionEntry::new("payroll", &["view"])],
            revoked: vec![],
        };

        let err = BulkAssigner::new(&store, &store)
            .assign(&request)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AssignmentError::Catalog(CatalogError::UnknownModule(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_request_rejected() {
        let store = MemoryStore::new();
        let role = store.create_role("Staff", base());
        let request = AssignRoleRequest {
            account_ids: (0..501).map(|_| Uuid::now_v7()).collect(),
            role_id: role.id,
            granted: vec![],
            revoked: vec![],
        };

        let err = BulkAssigner::new(&store, &store)
            .with_concurrency(0)
            .assign(&request)
            .await
            .unwrap_err();

        assert!(matches!(err, AssignmentError::Validation(_)));
    }
}
