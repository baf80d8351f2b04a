pub mod toml_config;

use crate::core::ConfigProvider;
use crate::utils::error::{ExportError, Result};
use crate::utils::validation::{
    validate_mount_path, validate_non_empty_string, validate_range, validate_repo_url,
    validate_socket_addr,
};
use std::path::Path;
use std::time::Duration;

#[cfg(feature = "cli")]
use crate::domain::model::{DEFAULT_BIND, DEFAULT_CLONE_IMAGE, DEFAULT_DATA_DIR, DEFAULT_REPO_URL};
#[cfg(feature = "cli")]
use crate::utils::validation::Validate;
#[cfg(feature = "cli")]
use clap::Parser;

pub const MAX_CLONE_TIMEOUT_SECS: u64 = 86_400;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "repo-export")]
#[command(about = "Serve a tar archive of a freshly cloned git repository")]
pub struct CliConfig {
    #[arg(long, env = "REPO_EXPORT_BIND", default_value = DEFAULT_BIND)]
    pub bind: String,

    /// Host directory shared with the clone containers, mounted at the same path
    #[arg(long, env = "REPO_EXPORT_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    #[arg(long, env = "REPO_EXPORT_REPO_URL", default_value = DEFAULT_REPO_URL)]
    pub repo_url: String,

    /// Image whose entrypoint is `git`
    #[arg(long, env = "REPO_EXPORT_IMAGE", default_value = DEFAULT_CLONE_IMAGE)]
    pub image: String,

    /// Shallow clone depth; full history when unset
    #[arg(long, env = "REPO_EXPORT_CLONE_DEPTH")]
    pub clone_depth: Option<u32>,

    /// Kill the clone container after this many seconds; no limit when unset
    #[arg(long, env = "REPO_EXPORT_CLONE_TIMEOUT_SECS")]
    pub clone_timeout_secs: Option<u64>,

    /// `uid[:gid]` the clone runs as inside the container
    #[arg(long, env = "REPO_EXPORT_CONTAINER_USER")]
    pub container_user: Option<String>,

    /// Accept a `repo` query parameter overriding the configured repository
    #[arg(long, env = "REPO_EXPORT_ALLOW_REPO_OVERRIDE")]
    pub allow_repo_override: bool,

    /// Load settings from a TOML file instead of the flags above
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn bind_addr(&self) -> &str {
        &self.bind
    }

    fn repo_url(&self) -> &str {
        &self.repo_url
    }

    fn data_dir(&self) -> &str {
        &self.data_dir
    }

    fn clone_image(&self) -> &str {
        &self.image
    }

    fn clone_depth(&self) -> Option<u32> {
        self.clone_depth
    }

    fn clone_timeout(&self) -> Option<Duration> {
        self.clone_timeout_secs.map(Duration::from_secs)
    }

    fn container_user(&self) -> Option<&str> {
        self.container_user.as_deref()
    }

    fn allow_repo_override(&self) -> bool {
        self.allow_repo_override
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(self)
    }
}

/// Checks shared by every configuration source.
pub fn validate_provider<C: ConfigProvider + ?Sized>(config: &C) -> Result<()> {
    validate_socket_addr("bind", config.bind_addr())?;
    validate_repo_url("repo_url", config.repo_url())?;
    validate_mount_path("data_dir", config.data_dir())?;
    validate_non_empty_string("image", config.clone_image())?;

    if let Some(depth) = config.clone_depth() {
        validate_range("clone_depth", depth, 1, u32::MAX)?;
    }

    if let Some(timeout) = config.clone_timeout() {
        validate_range(
            "clone_timeout_secs",
            timeout.as_secs(),
            1,
            MAX_CLONE_TIMEOUT_SECS,
        )?;
    }

    if let Some(user) = config.container_user() {
        validate_non_empty_string("container_user", user)?;
    }

    tracing::debug!("Configuration validation passed");
    Ok(())
}

/// The data directory is shared with containers and is not created on demand.
pub fn ensure_data_dir(path: &str) -> Result<()> {
    if Path::new(path).is_dir() {
        Ok(())
    } else {
        Err(ExportError::ConfigValidationError {
            field: "data_dir".to_string(),
            message: format!("{} does not exist or is not a directory", path),
        })
    }
}
