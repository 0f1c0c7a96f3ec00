//! Credentials and connection settings.
//!
//! Sources, lowest precedence first: the TOML config file, `BBACL_*`
//! environment variables, command-line flags.
//!
//! ```toml
//! username = "jdoe"
//! password = "app-password"
//! # base_url = "https://api.bitbucket.org/2.0"
//! # timeout_secs = 30
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use bbacl_gateway::GatewayConfig;
use serde::Deserialize;
use thiserror::Error;

const APP_NAME: &str = "bbacl";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "BBACL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("missing username or password (config file: {})", path.display())]
    MissingCredentials { path: PathBuf },
}

/// Merged settings; every field is optional until [`Settings::gateway_config`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// File the settings were read from, or would have been.
    #[serde(skip)]
    pub path: PathBuf,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub username: Option<String>,
    pub password: Option<String>,
    pub base_url: Option<String>,
}

impl Settings {
    /// `$XDG_CONFIG_HOME/bbacl/config.toml`, falling back to the platform
    /// config directory.
    pub fn default_path() -> PathBuf {
        let config_dir = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::config_dir)
            .unwrap_or_else(|| PathBuf::from(".config"));
        config_dir.join(APP_NAME).join(CONFIG_FILE)
    }

    /// Read the config file and the environment.
    ///
    /// An explicitly given `path` must exist; the default one may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::build(path, true)
    }

    /// Read only the config file, ignoring the environment.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::build(Some(path), false)
    }

    fn build(path: Option<&Path>, with_env: bool) -> Result<Self, ConfigError> {
        let required = path.is_some();
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

        tracing::debug!(path = %path.display(), required, "loading configuration");
        if required && !path.is_file() {
            return Err(ConfigError::NotFound { path });
        }

        let mut builder = ::config::Config::builder().add_source(
            ::config::File::from(path.as_path())
                .format(::config::FileFormat::Toml)
                .required(required),
        );
        if with_env {
            // Values stay strings; serde parses `timeout_secs` itself.
            builder = builder.add_source(::config::Environment::with_prefix(ENV_PREFIX));
        }

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.path = path;
        Ok(settings)
    }

    /// Apply command-line values on top
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if overrides.username.is_some() {
            self.username = overrides.username;
        }
        if overrides.password.is_some() {
            self.password = overrides.password;
        }
        if overrides.base_url.is_some() {
            self.base_url = overrides.base_url;
        }
        self
    }

    pub fn has_credentials(&self) -> bool {
        non_empty(&self.username).is_some() && non_empty(&self.password).is_some()
    }

    /// Gateway configuration, failing when credentials are missing.
    pub fn gateway_config(&self) -> Result<GatewayConfig, ConfigError> {
        let (Some(username), Some(password)) = (non_empty(&self.username), non_empty(&self.password))
        else {
            return Err(ConfigError::MissingCredentials {
                path: self.path.clone(),
            });
        };

        let mut config = GatewayConfig::new(username, password);
        if let Some(base_url) = non_empty(&self.base_url) {
            config = config.with_base_url(base_url);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
