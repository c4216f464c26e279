use super::model::Credentials;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://nalo.fr/api/v1";
pub const PASSWORD_ENV: &str = "NALO_PASSWORD";
pub const REPORTING_ENV: &str = "SENTRY_DSN";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

fn default_bill_identifiers() -> Vec<String> {
    vec!["generali vie".to_string()]
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub login: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub provider: ProviderConfig,
    pub data_path: Option<String>,
    /// Words found in the label of the bank operations a bill should be linked to.
    #[serde(default = "default_bill_identifiers")]
    pub bill_identifiers: Vec<String>,
    pub reporting_endpoint: Option<String>,
    /// Passed through untouched.
    #[serde(default)]
    pub parameters: Option<serde_yaml::Value>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("fr", "nalo", "nalo-sync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("fr", "nalo", "nalo-sync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.apply_env(|key| std::env::var(key).ok());
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Lets the environment fill in the password and reporting endpoint.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(password) = lookup(PASSWORD_ENV).filter(|p| !p.is_empty()) {
            self.password = Some(password);
        }
        if let Some(endpoint) = lookup(REPORTING_ENV).filter(|e| !e.is_empty()) {
            self.reporting_endpoint = Some(endpoint);
        }
    }

    pub fn credentials(&self) -> Result<Credentials> {
        let login = self
            .login
            .clone()
            .filter(|l| !l.is_empty())
            .context("Missing `login` in configuration")?;
        let password = self
            .password
            .clone()
            .filter(|p| !p.is_empty())
            .with_context(|| format!("Missing `password` in configuration or {PASSWORD_ENV}"))?;
        Ok(Credentials { login, password })
    }
}
