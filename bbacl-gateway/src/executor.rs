//! Operation executor
//!
//! Two failure policies are offered and callers pick one explicitly:
//!
//! - [`execute`] applies operations one at a time and stops at the first
//!   error (fail-fast).
//! - [`fan_out`] dispatches every request concurrently, waits for all of
//!   them, and reports each outcome in a [`BatchReport`].

use bbacl_model::Operation;
use futures::future::join_all;
use std::fmt;
use std::future::Future;

use crate::{GatewayError, PermissionGateway};

/// Apply `operations` in order, stopping at the first failure.
///
/// No-op operations are skipped. Returns the number of operations applied.
/// Nothing is rolled back when a later operation fails.
pub async fn execute<G>(
    gateway: &G,
    workspace: &str,
    repository: &str,
    operations: &[Operation],
) -> Result<usize, GatewayError>
where
    G: PermissionGateway + ?Sized,
{
    let mut applied = 0;

    for operation in operations {
        if operation.is_noop() {
            tracing::debug!(object_id = operation.object_id(), "skipping no-op operation");
            continue;
        }

        if let Err(e) = gateway.apply(workspace, repository, operation).await {
            tracing::error!(%operation, error = %e, applied, "operation failed");
            return Err(e);
        }

        tracing::info!(%operation, "applied");
        applied += 1;
    }

    Ok(applied)
}

/// Outcome of one item of a concurrent batch
#[derive(Debug)]
pub struct ItemOutcome {
    pub item: String,
    pub result: Result<(), GatewayError>,
}

/// Per-item outcomes of a concurrent batch, in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl BatchReport {
    /// Items whose request succeeded
    pub fn succeeded(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.item.as_str())
    }

    /// Items whose request failed, with the error
    pub fn failures(&self) -> impl Iterator<Item = (&str, &GatewayError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.item.as_str(), e)))
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// `Ok` when every item succeeded, otherwise the whole report as an error
    pub fn into_result(self) -> Result<(), GatewayError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(GatewayError::Batch(self))
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed: Vec<_> = self.failures().collect();
        write!(f, "{} of {} requests failed", failed.len(), self.len())?;
        for (item, error) in failed {
            write!(f, "\n  {}: {}", item, error)?;
        }
        Ok(())
    }
}

/// Run `f` for every item concurrently and collect all outcomes.
///
/// Requests share no state; there is no concurrency limit.
pub async fn fan_out<I, F, Fut>(items: I, f: F) -> BatchReport
where
    I: IntoIterator<Item = String>,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<(), GatewayError>>,
{
    let tasks = items.into_iter().map(|item| {
        let request = f(item.clone());
        async move {
            let result = request.await;
            if let Err(e) = &result {
                tracing::warn!(item = %item, error = %e, "batch item failed");
            }
            ItemOutcome { item, result }
        }
    });

    BatchReport {
        outcomes: join_all(tasks).await,
    }
}

/// Add every reviewer concurrently
pub async fn add_default_reviewers<G>(
    gateway: &G,
    workspace: &str,
    repository: &str,
    reviewers: &[String],
) -> BatchReport
where
    G: PermissionGateway + ?Sized,
{
    fan_out(reviewers.iter().cloned(), |reviewer| async move {
        gateway
            .add_default_reviewer(workspace, repository, &reviewer)
            .await
    })
    .await
}

/// Remove every reviewer concurrently
pub async fn remove_default_reviewers<G>(
    gateway: &G,
    workspace: &str,
    repository: &str,
    reviewers: &[String],
) -> BatchReport
where
    G: PermissionGateway + ?Sized,
{
    fan_out(reviewers.iter().cloned(), |reviewer| async move {
        gateway
            .remove_default_reviewer(workspace, repository, &reviewer)
            .await
    })
    .await
}

/// Result of replacing the default reviewer set
#[derive(Debug)]
pub struct ReviewerOverwrite {
    pub removed: BatchReport,
    pub added: BatchReport,
}

impl ReviewerOverwrite {
    pub fn is_success(&self) -> bool {
        self.removed.is_success() && self.added.is_success()
    }
}

/// Replace the default reviewers with `reviewers`: remove all current ones,
/// then add the new set.
///
/// Fails only if the current list cannot be fetched; per-reviewer failures
/// are reported in the returned batches.
pub async fn overwrite_default_reviewers<G>(
    gateway: &G,
    workspace: &str,
    repository: &str,
    reviewers: &[String],
) -> Result<ReviewerOverwrite, GatewayError>
where
    G: PermissionGateway + ?Sized,
{
    let current: Vec<String> = gateway
        .list_default_reviewers(workspace, repository)
        .await?
        .into_iter()
        .map(|account| account.uuid)
        .collect();

    tracing::info!(
        current = current.len(),
        desired = reviewers.len(),
        "overwriting default reviewers"
    );

    let removed = remove_default_reviewers(gateway, workspace, repository, &current).await;
    let added = add_default_reviewers(gateway, workspace, repository, reviewers).await;

    Ok(ReviewerOverwrite { removed, added })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fan_out_collects_every_outcome() {
        let items = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let report = fan_out(items, |item| async move {
            if item == "b" {
                Err(GatewayError::NoOp { object_id: item })
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(report.len(), 3);
        assert!(!report.is_success());
        assert_eq!(report.succeeded().collect::<Vec<_>>(), vec!["a", "c"]);
        let failed: Vec<_> = report.failures().map(|(item, _)| item).collect();
        assert_eq!(failed, vec!["b"]);
        assert!(report.to_string().starts_with("1 of 3 requests failed"));
    }

    #[tokio::test]
    async fn test_empty_batch_is_success() {
        let report = fan_out(Vec::<String>::new(), |_| async { Ok(()) }).await;
        assert!(report.is_empty());
        assert!(report.into_result().is_ok());
    }
}
