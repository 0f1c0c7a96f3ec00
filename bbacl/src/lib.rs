//! # bbacl: Bitbucket repository permission reconciliation
//!
//! Lists, edits and copies the group and user permissions of Bitbucket Cloud
//! repositories, and overwrites their default reviewers.
//!
//! Commands are plain enums routed to async handlers by the
//! [`CommandRouter`] derive:
//!
//! ```rust,ignore
//! #[derive(Subcommand, CommandRouter)]
//! #[router(state = AppState)]
//! pub enum PermissionCommand {
//!     #[router(handler = handlers::permission::list)]
//!     List(RepoArgs),
//! }
//!
//! let response = command.execute(State::new(app_state)).await;
//! std::process::exit(response.exit_code);
//! ```

// The router derive expands to `::bbacl::...` paths.
extern crate self as bbacl;

use std::path::PathBuf;
use std::sync::Arc;

use bbacl_gateway::GatewayError;

pub use bbacl_macros::CommandRouter;

pub mod app;
pub mod build_info;
pub mod cli;
pub mod config;
pub mod handlers;
pub mod prompt;
pub mod tracing_support;

pub use app::AppState;
pub use build_info::{version_info, version_short};
pub use crate::config::{ConfigError, ConfigOverrides, Settings};
pub use prompt::{
    AutoSelectionPrompt, PromptError, RecordingSelectionPrompt, SelectionPrompt,
    TerminalSelectionPrompt,
};
pub use tracing_support::{init_subscriber_with_config, TracingConfig, TracingFormat};

// ============================================================================
// Core Types
// ============================================================================

/// Shared application state wrapper.
///
/// Handlers receive this by value; cloning only bumps a reference count.
///
/// ```
/// use bbacl::State;
///
/// let state = State::new(String::from("workspace"));
/// assert_eq!(state.get(), "workspace");
/// ```
pub struct State<T>(Arc<T>);

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> State<T> {
    pub fn new(inner: T) -> Self {
        Self(Arc::new(inner))
    }

    pub fn get(&self) -> &T {
        &self.0
    }
}

/// Result type returned by every handler.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Error Types
// ============================================================================

/// Top-level error type for CLI operations.
///
/// User and remote errors exit with 1, system failures with 101.
#[derive(Debug)]
pub enum CliError {
    /// Something the user can fix: arguments, credentials, selection.
    User(UserError),

    /// The Bitbucket API rejected or failed a request.
    Remote(GatewayError),

    /// Local failures the user can't fix.
    System(SystemError),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::User(_) | CliError::Remote(_) => 1,
            CliError::System(_) => 101,
        }
    }

    pub fn user(message: impl Into<String>) -> Self {
        CliError::User(UserError::Generic(message.into()))
    }

    pub fn system(message: impl Into<String>) -> Self {
        CliError::System(SystemError::Internal(message.into()))
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::User(e) => write!(f, "{}", e),
            CliError::Remote(e) => write!(f, "Error: {}", e),
            CliError::System(e) => write!(f, "{}", e),
        }
    }
}

/// User-fixable errors (exit code 1).
#[derive(Debug)]
pub enum UserError {
    Generic(String),

    InvalidArgument { arg: String, reason: String },

    /// No username/password in flags, environment or config file.
    MissingCredentials { path: PathBuf },

    /// The selection prompt was cancelled or could not be shown.
    Selection(PromptError),
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserError::Generic(msg) => write!(f, "Error: {}", msg),
            UserError::InvalidArgument { arg, reason } => {
                write!(f, "Error: Invalid argument '{}'\n\n{}", arg, reason)
            }
            UserError::MissingCredentials { path } => write!(
                f,
                "Error: Missing Bitbucket credentials\n\n\
                 Hint: set username and password in {}, export BBACL_USERNAME and \
                 BBACL_PASSWORD, or pass --username/--password",
                path.display()
            ),
            UserError::Selection(PromptError::NonInteractive) => write!(
                f,
                "Error: {}\n\nHint: pass --batch to apply every change without prompting",
                PromptError::NonInteractive
            ),
            UserError::Selection(e) => write!(f, "Error: {}", e),
        }
    }
}

/// System-level failures (exit code 101).
#[derive(Debug)]
pub enum SystemError {
    Internal(String),

    Io(std::io::Error),

    ConfigParse(String),
}

impl std::fmt::Display for SystemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemError::Internal(msg) => {
                write!(f, "Internal Error: {}\n\nThis is likely a bug.", msg)
            }
            SystemError::Io(e) => write!(f, "Internal Error: I/O operation failed\n\n{}", e),
            SystemError::ConfigParse(e) => {
                write!(f, "Internal Error: Config parse failed\n\n{}", e)
            }
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::System(SystemError::Io(e))
    }
}

impl From<GatewayError> for CliError {
    fn from(e: GatewayError) -> Self {
        CliError::Remote(e)
    }
}

impl From<PromptError> for CliError {
    fn from(e: PromptError) -> Self {
        match e {
            PromptError::IoError(io) => CliError::System(SystemError::Io(io)),
            other => CliError::User(UserError::Selection(other)),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::MissingCredentials { path } => {
                CliError::User(UserError::MissingCredentials { path })
            }
            ConfigError::NotFound { path } => CliError::User(UserError::InvalidArgument {
                arg: "--config".to_string(),
                reason: format!("{} does not exist", path.display()),
            }),
            ConfigError::Load(e) => CliError::System(SystemError::ConfigParse(e.to_string())),
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// What a handler produced: exit code plus text for the terminal.
#[derive(Debug)]
pub struct Response {
    /// 0 = success, 1 = user or remote error, 101 = system error.
    pub exit_code: i32,

    pub output: Output,
}

impl Response {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: Output::Text(content.into()),
        }
    }

    pub fn silent() -> Self {
        Self {
            exit_code: 0,
            output: Output::Silent,
        }
    }

    pub fn error(exit_code: i32, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: Output::Text(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug)]
pub enum Output {
    Silent,

    /// Report text; printed to stdout on success and stderr on failure.
    Text(String),
}

impl Output {
    pub fn is_empty(&self) -> bool {
        match self {
            Output::Silent => true,
            Output::Text(s) => s.is_empty(),
        }
    }
}

impl std::fmt::Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Silent => Ok(()),
            Output::Text(s) => write!(f, "{}", s),
        }
    }
}

// ============================================================================
// Response Conversion Trait
// ============================================================================

/// Converts handler return values into a [`Response`].
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Response::silent()
    }
}

impl<T: IntoResponse> IntoResponse for CliResult<T> {
    fn into_response(self) -> Response {
        match self {
            Ok(value) => value.into_response(),
            Err(e) => Response::error(e.exit_code(), e.to_string()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bbacl_gateway::RemoteError;

    #[test]
    fn test_state_clone_shares_inner() {
        let state = State::new(vec![1, 2, 3]);
        let cloned = state.clone();
        assert!(std::ptr::eq(state.get(), cloned.get()));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::user("bad").exit_code(), 1);
        assert_eq!(CliError::system("oops").exit_code(), 101);

        let remote = CliError::from(GatewayError::Http {
            status: 403,
            reason: "Forbidden".into(),
            error: RemoteError::from_body("denied"),
        });
        assert_eq!(remote.exit_code(), 1);
    }

    #[test]
    fn test_remote_error_message() {
        let err = CliError::from(GatewayError::Http {
            status: 404,
            reason: "Not Found".into(),
            error: RemoteError::from_body("Repository not found"),
        });
        let message = err.to_string();
        assert!(message.starts_with("Error: "));
        assert!(message.contains("404"));
        assert!(message.contains("Repository not found"));
    }

    #[test]
    fn test_prompt_errors_map_to_user_or_system() {
        let cancelled = CliError::from(PromptError::Cancelled);
        assert!(matches!(cancelled, CliError::User(UserError::Selection(_))));

        let non_interactive = CliError::from(PromptError::NonInteractive);
        assert!(non_interactive.to_string().contains("--batch"));

        let io = CliError::from(PromptError::IoError(std::io::Error::other("closed")));
        assert_eq!(io.exit_code(), 101);
    }

    #[test]
    fn test_missing_credentials_names_path() {
        let err = CliError::from(ConfigError::MissingCredentials {
            path: PathBuf::from("/home/me/.config/bbacl/config.toml"),
        });
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("/home/me/.config/bbacl/config.toml"));
    }

    #[test]
    fn test_result_into_response() {
        let ok: CliResult<String> = Ok("done".to_string());
        let response = ok.into_response();
        assert!(response.is_success());
        assert_eq!(response.output.to_string(), "done");

        let err: CliResult<String> = Err(CliError::user("nope"));
        let response = err.into_response();
        assert_eq!(response.exit_code, 1);
        assert_eq!(response.output.to_string(), "Error: nope");
    }

    #[test]
    fn test_unit_and_response_into_response() {
        assert!(().into_response().output.is_empty());

        let response = Response::error(1, "partial").into_response();
        assert_eq!(response.exit_code, 1);
    }
}
