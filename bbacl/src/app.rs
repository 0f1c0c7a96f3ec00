use std::path::PathBuf;

use bbacl_gateway::{BitbucketGateway, PermissionGateway};

use crate::config::Settings;
use crate::prompt::SelectionPrompt;
use crate::{CliError, CliResult, UserError};

/// State shared by every handler
pub struct AppState {
    gateway: Option<Box<dyn PermissionGateway>>,
    config_path: PathBuf,
    prompt: Box<dyn SelectionPrompt>,
}

impl AppState {
    pub fn new(gateway: Box<dyn PermissionGateway>, prompt: Box<dyn SelectionPrompt>) -> Self {
        Self {
            gateway: Some(gateway),
            config_path: Settings::default_path(),
            prompt,
        }
    }

    /// Build the gateway from `settings`.
    ///
    /// Missing credentials are not an error here: commands that need the
    /// gateway report them when they ask for it.
    pub fn from_settings(settings: &Settings, prompt: Box<dyn SelectionPrompt>) -> CliResult<Self> {
        let gateway = if settings.has_credentials() {
            let gateway = BitbucketGateway::new(settings.gateway_config()?)?;
            tracing::debug!(
                base_url = %gateway.config().base_url,
                username = %gateway.config().username,
                "gateway ready"
            );
            Some(Box::new(gateway) as Box<dyn PermissionGateway>)
        } else {
            tracing::debug!(path = %settings.path.display(), "no credentials configured");
            None
        };

        Ok(Self {
            gateway,
            config_path: settings.path.clone(),
            prompt,
        })
    }

    pub fn gateway(&self) -> CliResult<&dyn PermissionGateway> {
        self.gateway
            .as_deref()
            .ok_or_else(|| {
                CliError::User(UserError::MissingCredentials {
                    path: self.config_path.clone(),
                })
            })
    }

    pub fn prompt(&self) -> &dyn SelectionPrompt {
        self.prompt.as_ref()
    }
}
