//! bbacl-gateway: Remote permission gateway for bbacl
//!
//! This crate fetches and mutates repository permission grants and default
//! reviewers through the Bitbucket Cloud REST API, and applies reconciliation
//! plans produced by `bbacl-model`.

use async_trait::async_trait;
use bbacl_model::{Operation, PermissionGrant, PermissionSet, ReviewerAccount};

pub mod client;
pub mod error;
pub mod executor;
mod wire;

pub use client::{BitbucketGateway, GatewayConfig, DEFAULT_BASE_URL};
pub use error::{GatewayError, RemoteError, RemoteErrorDetail};
pub use executor::{
    add_default_reviewers, execute, fan_out, overwrite_default_reviewers,
    remove_default_reviewers, BatchReport, ItemOutcome, ReviewerOverwrite,
};

/// Access to the permission and default-reviewer endpoints of a repository.
///
/// Listing calls walk every page before returning. Mutating calls issue
/// exactly one request and never retry.
#[async_trait]
pub trait PermissionGateway: Send + Sync {
    /// All group grants of a repository
    async fn fetch_group_grants(
        &self,
        workspace: &str,
        repository: &str,
    ) -> Result<Vec<PermissionGrant>, GatewayError>;

    /// All user grants of a repository
    async fn fetch_user_grants(
        &self,
        workspace: &str,
        repository: &str,
    ) -> Result<Vec<PermissionGrant>, GatewayError>;

    /// Group grants followed by user grants
    async fn list_permissions(
        &self,
        workspace: &str,
        repository: &str,
    ) -> Result<PermissionSet, GatewayError> {
        let mut grants = self.fetch_group_grants(workspace, repository).await?;
        grants.extend(self.fetch_user_grants(workspace, repository).await?);
        Ok(grants)
    }

    /// Apply one add, update or remove operation.
    ///
    /// Add and update are the same idempotent upsert; a no-op operation is
    /// rejected with [`GatewayError::NoOp`].
    async fn apply(
        &self,
        workspace: &str,
        repository: &str,
        operation: &Operation,
    ) -> Result<(), GatewayError>;

    async fn list_default_reviewers(
        &self,
        workspace: &str,
        repository: &str,
    ) -> Result<Vec<ReviewerAccount>, GatewayError>;

    /// Add one default reviewer (username or uuid)
    async fn add_default_reviewer(
        &self,
        workspace: &str,
        repository: &str,
        reviewer: &str,
    ) -> Result<(), GatewayError>;

    /// Remove one default reviewer (username or uuid)
    async fn remove_default_reviewer(
        &self,
        workspace: &str,
        repository: &str,
        reviewer: &str,
    ) -> Result<(), GatewayError>;
}
