//! Google Admin SDK Directory access for the Workspace admin tools
//!
//! [`DirectoryClient`] talks to the Directory and Groups Settings APIs.
//! [`GroupProvisioner`] creates groups and owners from a CSV file, and
//! [`test_workspace_access`] checks what a credential can see.

pub mod api;
pub mod client;
pub mod diagnostics;
pub mod error;
pub mod groups_settings;
pub mod models;
pub mod provision;

#[cfg(test)]
pub(crate) mod mock;

pub use api::DirectoryApi;
pub use client::DirectoryClient;
pub use diagnostics::{test_workspace_access, AccessReport, DirectoryProbe};
pub use error::DirectoryError;
pub use provision::{GroupProvisioner, Outcome, ProvisionOptions, ProvisionReport, RowOutcome};
