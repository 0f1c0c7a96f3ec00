//! Command-line surface

use std::path::PathBuf;

use bbacl_model::{PermissionLevel, PrincipalKind};
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::ConfigOverrides;
use crate::handlers;
use crate::tracing_support::{TracingConfig, TracingFormat};
use crate::{AppState, CommandRouter};

#[derive(Parser, Debug)]
#[command(
    name = "bbacl",
    version,
    about = "Reconcile Bitbucket Cloud repository permissions and default reviewers"
)]
pub struct Cli {
    /// Config file [default: $XDG_CONFIG_HOME/bbacl/config.toml]
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Bitbucket username [env: BBACL_USERNAME]
    #[arg(short, long, global = true)]
    pub username: Option<String>,

    /// Bitbucket app password [env: BBACL_PASSWORD]
    #[arg(short, long, global = true)]
    pub password: Option<String>,

    /// API root, e.g. for a proxy
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(long, global = true, value_enum, default_value_t = TracingFormat::Compact)]
    pub log_format: TracingFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig {
            level: TracingConfig::level_for_verbosity(self.verbose),
            format: self.log_format,
            ..Default::default()
        }
    }

    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            username: self.username.clone(),
            password: self.password.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

#[derive(Subcommand, CommandRouter, Debug)]
#[router(state = AppState)]
pub enum Commands {
    /// Inspect and change repository permissions
    #[command(subcommand)]
    #[router(handler = handlers::permission::dispatch)]
    Permission(PermissionCommand),

    /// Inspect and replace default reviewers
    #[command(subcommand)]
    #[router(handler = handlers::reviewer::dispatch)]
    DefaultReviewer(ReviewerCommand),

    /// Show build information
    #[router(handler = handlers::version)]
    Version,
}

#[derive(Subcommand, CommandRouter, Debug)]
#[router(state = AppState)]
pub enum PermissionCommand {
    /// List group and user permissions of a repository
    #[router(handler = handlers::permission::list)]
    List(RepoArgs),

    /// Grant a permission to a user or group
    #[router(handler = handlers::permission::add)]
    Add(AddArgs),

    /// Choose permissions to revoke
    #[router(handler = handlers::permission::remove)]
    Remove(RemoveArgs),

    /// Choose permissions to change or revoke
    #[router(handler = handlers::permission::update)]
    Update(RepoArgs),

    /// Make TARGET's permissions match SOURCE's
    #[router(handler = handlers::permission::copy)]
    Copy(CopyArgs),

    /// Show what copy would do without changing anything
    #[router(handler = handlers::permission::plan)]
    Plan(PlanArgs),
}

#[derive(Subcommand, CommandRouter, Debug)]
#[router(state = AppState)]
pub enum ReviewerCommand {
    /// List default reviewers of a repository
    #[router(handler = handlers::reviewer::list)]
    List(RepoArgs),

    /// Replace all default reviewers
    #[router(handler = handlers::reviewer::overwrite)]
    Overwrite(OverwriteArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    pub workspace: String,
    pub repository: String,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// user or group
    pub kind: PrincipalKind,

    /// User uuid/nickname or group slug
    pub id: String,

    /// read, write or admin
    pub level: PermissionLevel,
}

#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Remove every permission without asking
    #[arg(long)]
    pub batch: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CopyArgs {
    pub workspace: String,
    pub source: String,
    pub target: String,

    /// Apply every change without asking
    #[arg(long)]
    pub batch: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    pub workspace: String,
    pub source: String,
    pub target: String,
}

#[derive(Args, Debug, Clone)]
pub struct OverwriteArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Comma-separated usernames or uuids
    #[arg(value_delimiter = ',', required = true, num_args = 1..)]
    pub reviewers: Vec<String>,
}

impl OverwriteArgs {
    /// Reviewer ids with blanks and duplicates dropped, first occurrence kept
    pub fn reviewer_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for id in self.reviewers.iter().map(|r| r.trim()).filter(|r| !r.is_empty()) {
            if !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }
        ids
    }
}
