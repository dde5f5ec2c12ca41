//! Profile loading for the CLI.
//!
//! A profile is a YAML file holding the pod address and account
//! settings, looked up at `~/.config/podlink/config.yaml` unless a path
//! is given. The password may be left out of the file and supplied via
//! the `PODLINK_PASSWORD` environment variable instead.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use podlink_client::{ClientOptions, TransportOptions};

/// Environment variable consulted before the profile's password field.
const PASSWORD_ENV: &str = "PODLINK_PASSWORD";

/// Connection profile for a pod account.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    /// Pod domain, without scheme.
    pub pod: String,
    /// Use https when building pod URLs.
    #[serde(default = "default_true")]
    pub secure: bool,
    /// Account username.
    pub username: String,
    /// Account password; prefer the environment variable.
    #[serde(default)]
    pub password: Option<String>,
    /// Name the pod shows as the post's origin.
    #[serde(default)]
    pub provider_name: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Verify the pod's TLS certificate.
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    /// Custom CA bundle path (PEM).
    #[serde(default)]
    pub ca_bundle: Option<PathBuf>,
}

impl Profile {
    /// Loads the profile from `path`, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_path().context("could not determine the config directory")?,
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("could not read profile {}", path.display()))?;
        let profile: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("could not parse profile {}", path.display()))?;
        Ok(profile)
    }

    /// Resolves the password from the environment or the profile.
    pub fn password(&self) -> Result<String> {
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            if !password.is_empty() {
                return Ok(password);
            }
        }
        self.password
            .clone()
            .with_context(|| format!("no password in the profile and {PASSWORD_ENV} is unset"))
    }

    /// Builds client options from the profile's transport settings.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            transport: TransportOptions {
                timeout: Duration::from_secs(self.timeout_secs),
                verify_tls: self.verify_tls,
                ca_bundle: self.ca_bundle.clone(),
            },
            provider_name: self.provider_name.clone(),
        }
    }
}

fn default_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("podlink").join("config.yaml"))
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    60
}
