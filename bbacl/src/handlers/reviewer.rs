//! `bbacl default-reviewer ...`

use std::fmt::Write;

use bbacl_gateway::{overwrite_default_reviewers, BatchReport};

use super::reviewer_report;
use crate::cli::{OverwriteArgs, RepoArgs, ReviewerCommand};
use crate::{AppState, CliError, CliResult, Response, State};

pub async fn dispatch(state: State<AppState>, command: ReviewerCommand) -> Response {
    command.execute(state).await
}

pub async fn list(state: State<AppState>, args: RepoArgs) -> CliResult<String> {
    let gateway = state.get().gateway()?;
    let reviewers = gateway
        .list_default_reviewers(&args.workspace, &args.repository)
        .await?;
    Ok(reviewer_report(&reviewers))
}

/// Replace the default reviewers.
///
/// Individual request failures don't stop the other requests; they are
/// listed before the final report and turn the exit code to 1.
pub async fn overwrite(state: State<AppState>, args: OverwriteArgs) -> CliResult<Response> {
    let gateway = state.get().gateway()?;
    let repo = &args.repo;
    let reviewers = args.reviewer_ids();
    if reviewers.is_empty() {
        return Err(CliError::user("no reviewers given"));
    }

    let outcome =
        overwrite_default_reviewers(gateway, &repo.workspace, &repo.repository, &reviewers).await?;

    let current = gateway
        .list_default_reviewers(&repo.workspace, &repo.repository)
        .await?;
    let report = reviewer_report(&current);

    if outcome.is_success() {
        return Ok(Response::text(report));
    }

    let mut out = String::new();
    failure_section(&mut out, "remove", &outcome.removed);
    failure_section(&mut out, "add", &outcome.added);
    out.push_str(&report);
    Ok(Response::error(1, out))
}

fn failure_section(out: &mut String, verb: &str, batch: &BatchReport) {
    if batch.is_success() {
        return;
    }
    tracing::warn!(verb, failed = batch.failures().count(), "default reviewer requests failed");
    let _ = writeln!(out, "Failed to {} default reviewers: {}", verb, batch);
}
