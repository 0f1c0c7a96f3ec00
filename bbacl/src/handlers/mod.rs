//! Command handlers

use std::fmt::Write;

use bbacl_model::{Operation, PermissionGrant, ReviewerAccount};

use crate::prompt::{AutoSelectionPrompt, PromptError, SelectionPrompt};
use crate::{AppState, CliError, CliResult, State};

pub mod permission;
pub mod reviewer;

pub(crate) const RESULT_HEADER: &str = "==== RESULT ====";

pub async fn version(_state: State<AppState>) -> CliResult<String> {
    Ok(crate::build_info::version_info())
}

/// Report of the grants a repository ends up with
pub(crate) fn permission_report(grants: &[PermissionGrant]) -> String {
    let mut out = format!("{}\ntype, id, name, permission", RESULT_HEADER);
    for grant in grants {
        let _ = write!(out, "\n{}", grant);
    }
    out
}

pub(crate) fn reviewer_report(accounts: &[ReviewerAccount]) -> String {
    let mut out = format!("{}\nid, name", RESULT_HEADER);
    for account in accounts {
        let _ = write!(out, "\n{}", account);
    }
    out
}

/// One line per operation that was sent
pub(crate) fn applied_summary(operations: &[Operation]) -> String {
    let mut out = String::new();
    for operation in operations.iter().filter(|op| !op.is_noop()) {
        let _ = writeln!(out, "{}", operation);
    }
    out
}

/// Fail before any request when answers can't be read from the user
pub(crate) fn ensure_interactive(state: &State<AppState>) -> CliResult<()> {
    if state.get().prompt().is_interactive() {
        Ok(())
    } else {
        Err(PromptError::NonInteractive.into())
    }
}

/// Run a prompt call on the blocking pool; terminal prompts wait on stdin.
pub(crate) async fn ask<T, F>(state: &State<AppState>, call: F) -> CliResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn SelectionPrompt) -> Result<T, PromptError> + Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || call(state.get().prompt()))
        .await
        .map_err(|e| CliError::system(format!("selection prompt failed: {}", e)))?
        .map_err(CliError::from)
}

/// Let the user pick a subset of `operations`, keeping their order.
///
/// With `batch` every operation is taken without asking.
pub(crate) async fn choose_operations(
    state: &State<AppState>,
    batch: bool,
    message: &str,
    operations: Vec<Operation>,
) -> CliResult<Vec<Operation>> {
    if operations.is_empty() {
        return Ok(operations);
    }

    let options: Vec<String> = operations.iter().map(Operation::message).collect();
    let picked = if batch {
        AutoSelectionPrompt::select_all().select_many(message, &options)?
    } else {
        let message = message.to_string();
        ask(state, move |prompt| prompt.select_many(&message, &options)).await?
    };

    Ok(operations
        .into_iter()
        .enumerate()
        .filter(|(i, _)| picked.contains(i))
        .map(|(_, operation)| operation)
        .collect())
}
