//! `bbacl permission ...`

use bbacl_gateway::{execute, PermissionGateway};
use bbacl_model::{actionable, diff, remove_all, Action, Operation, PermissionGrant, PermissionLevel};

use super::{applied_summary, ask, choose_operations, ensure_interactive, permission_report};
use crate::cli::{AddArgs, CopyArgs, PermissionCommand, PlanArgs, RemoveArgs, RepoArgs};
use crate::{AppState, CliError, CliResult, Response, State, UserError};

const UPDATE_ACTIONS: [Action; 2] = [Action::Update, Action::Remove];

pub async fn dispatch(state: State<AppState>, command: PermissionCommand) -> Response {
    command.execute(state).await
}

pub async fn list(state: State<AppState>, args: RepoArgs) -> CliResult<String> {
    let gateway = state.get().gateway()?;
    let grants = gateway
        .list_permissions(&args.workspace, &args.repository)
        .await?;
    Ok(permission_report(&grants))
}

pub async fn add(state: State<AppState>, args: AddArgs) -> CliResult<String> {
    let gateway = state.get().gateway()?;
    let grant = PermissionGrant::new(args.id.clone(), args.id, args.kind, args.level);

    apply_and_report(gateway, &args.repo, vec![Operation::add(&grant)]).await
}

pub async fn remove(state: State<AppState>, args: RemoveArgs) -> CliResult<String> {
    let gateway = state.get().gateway()?;
    if !args.batch {
        ensure_interactive(&state)?;
    }
    let grants = gateway
        .list_permissions(&args.repo.workspace, &args.repo.repository)
        .await?;

    if grants.is_empty() {
        return Ok(format!(
            "No permissions to remove\n{}",
            permission_report(&grants)
        ));
    }

    let operations = choose_operations(
        &state,
        args.batch,
        "Choose permissions to remove:",
        remove_all(&grants),
    )
    .await?;

    apply_and_report(gateway, &args.repo, operations).await
}

pub async fn update(state: State<AppState>, args: RepoArgs) -> CliResult<String> {
    let gateway = state.get().gateway()?;
    ensure_interactive(&state)?;
    let grants = gateway
        .list_permissions(&args.workspace, &args.repository)
        .await?;

    if grants.is_empty() {
        return Err(CliError::user(format!(
            "{}/{} has no permissions to update",
            args.workspace, args.repository
        )));
    }

    let rows: Vec<String> = grants.iter().map(PermissionGrant::to_string).collect();
    let picked = ask(&state, move |prompt| {
        prompt.select_many("Choose permissions to update:", &rows)
    })
    .await?;

    let actions: Vec<String> = UPDATE_ACTIONS.iter().map(|a| action_label(*a)).collect();
    let count = actions.len();
    let index = ask(&state, move |prompt| prompt.select_one("Choose operation:", &actions)).await?;
    let action = UPDATE_ACTIONS[checked(index, count)?];

    let chosen = picked.iter().filter_map(|&i| grants.get(i));
    let operations: Vec<Operation> = match action {
        Action::Update => {
            let levels: Vec<String> = PermissionLevel::ALL.iter().map(|l| l.to_string()).collect();
            let count = levels.len();
            let index = ask(&state, move |prompt| prompt.select_one("Choose permission:", &levels)).await?;
            let level = PermissionLevel::ALL[checked(index, count)?];
            actionable(chosen.map(|grant| Operation::update(grant, level)).collect())
        }
        _ => chosen.map(Operation::remove).collect(),
    };

    apply_and_report(gateway, &args, operations).await
}

pub async fn copy(state: State<AppState>, args: CopyArgs) -> CliResult<String> {
    let gateway = state.get().gateway()?;
    if !args.batch {
        ensure_interactive(&state)?;
    }
    tracing::info!(
        workspace = %args.workspace,
        source = %args.source,
        target = %args.target,
        "copying permissions"
    );

    let operations = actionable(plan_copy(gateway, &args.workspace, &args.source, &args.target).await?);
    let target = RepoArgs {
        workspace: args.workspace,
        repository: args.target,
    };

    if operations.is_empty() {
        let grants = gateway
            .list_permissions(&target.workspace, &target.repository)
            .await?;
        return Ok(format!(
            "Target already matches source\n{}",
            permission_report(&grants)
        ));
    }

    let operations =
        choose_operations(&state, args.batch, "Choose operations to apply:", operations).await?;

    apply_and_report(gateway, &target, operations).await
}

pub async fn plan(state: State<AppState>, args: PlanArgs) -> CliResult<String> {
    let gateway = state.get().gateway()?;
    let operations = plan_copy(gateway, &args.workspace, &args.source, &args.target).await?;

    if operations.is_empty() {
        return Ok("Neither repository has permissions".to_string());
    }

    let lines: Vec<String> = operations.iter().map(Operation::message).collect();
    Ok(lines.join("\n"))
}

/// Operations that would make `target` match `source`, no-ops included
async fn plan_copy(
    gateway: &dyn PermissionGateway,
    workspace: &str,
    source: &str,
    target: &str,
) -> CliResult<Vec<Operation>> {
    let source_grants = gateway.list_permissions(workspace, source).await?;
    let target_grants = gateway.list_permissions(workspace, target).await?;

    let operations = diff(&source_grants, &target_grants);
    tracing::debug!(
        source = source_grants.len(),
        target = target_grants.len(),
        operations = operations.len(),
        "planned copy"
    );
    Ok(operations)
}

/// Run `operations` fail-fast, then report what the repository holds now
async fn apply_and_report(
    gateway: &dyn PermissionGateway,
    repo: &RepoArgs,
    operations: Vec<Operation>,
) -> CliResult<String> {
    let applied = execute(gateway, &repo.workspace, &repo.repository, &operations).await?;
    tracing::info!(applied, "operations applied");

    let grants = gateway
        .list_permissions(&repo.workspace, &repo.repository)
        .await?;
    Ok(format!(
        "{}{}",
        applied_summary(&operations),
        permission_report(&grants)
    ))
}

fn action_label(action: Action) -> String {
    match action {
        Action::Add => "add",
        Action::Update => "update",
        Action::Remove => "remove",
        Action::None => "none",
    }
    .to_string()
}

fn checked(index: usize, len: usize) -> CliResult<usize> {
    if index < len {
        Ok(index)
    } else {
        Err(CliError::User(UserError::InvalidArgument {
            arg: (index + 1).to_string(),
            reason: format!("choose a number between 1 and {}", len),
        }))
    }
}
