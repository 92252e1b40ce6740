//! Permission system types and utilities.
//!
//! Role-based permissions with per-account overrides:
//! - Catalog: the modules and access levels the console knows about
//! - Resolver: role base + granted - revoked = effective permissions
//! - Assignment: role and override writes across many accounts

pub mod access;
pub mod accounts;
pub mod assignment;
pub mod catalog;
pub mod models;
pub mod queries;
pub mod resolver;
pub mod roles;
pub mod set;
pub mod store;

pub use access::{AccessLevel, AccessLevels};
pub use accounts::{
    clear_customization, get_effective_permissions, toggle_account_capability, AccountError,
    CustomizationOutcome,
};
pub use assignment::{
    AssignmentError, AssignmentFailure, AssignmentResult, BatchStatus, BulkAssigner,
};
pub use catalog::{list_modules, CatalogError, Module, ModuleDescriptor, RawPermissionEntry};
pub use models::*;
pub use queries::PgStore;
pub use resolver::{resolve, toggle_capability};
pub use roles::RoleError;
pub use set::{PermissionEntry, PermissionSet};
pub use store::{MemoryStore, OverrideStore, RoleStore, StoreError};
