//! `Atrium` Server
//!
//! Permission subsystem of the Atrium administrative console: role
//! templates, per-account grant/revoke overrides, effective permission
//! resolution and bulk role assignment.

pub mod config;
pub mod db;
pub mod permissions;
