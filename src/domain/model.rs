use crate::domain::ports::ConfigProvider;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

pub const DEFAULT_REPO_URL: &str = "https://github.com/pallets/flask.git";
pub const DEFAULT_CLONE_IMAGE: &str = "alpine/git";
pub const DEFAULT_DATA_DIR: &str = "/data";
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// Resolved settings the export pipeline runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub repo_url: String,
    pub data_dir: PathBuf,
    pub clone_image: String,
    pub clone_depth: Option<u32>,
    pub clone_timeout: Option<Duration>,
    pub container_user: Option<String>,
    pub allow_repo_override: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            repo_url: DEFAULT_REPO_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            clone_image: DEFAULT_CLONE_IMAGE.to_string(),
            clone_depth: None,
            clone_timeout: None,
            container_user: None,
            allow_repo_override: false,
        }
    }
}

impl ExportSettings {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self {
            repo_url: config.repo_url().to_string(),
            data_dir: PathBuf::from(config.data_dir()),
            clone_image: config.clone_image().to_string(),
            clone_depth: config.clone_depth(),
            clone_timeout: config.clone_timeout(),
            container_user: config.container_user().map(str::to_string),
            allow_repo_override: config.allow_repo_override(),
        }
    }
}

/// One clone handed to the container runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneJob {
    pub export_id: Uuid,
    pub image: String,
    pub repo_url: String,
    /// Empty directory the repository is cloned into.
    pub destination: PathBuf,
    /// Host path bind-mounted at the same location inside the container.
    pub mount: PathBuf,
    pub depth: Option<u32>,
    pub user: Option<String>,
}

impl CloneJob {
    /// Arguments for an image whose entrypoint is `git`.
    pub fn git_args(&self) -> Vec<String> {
        let mut args = vec!["clone".to_string()];
        if let Some(depth) = self.depth {
            args.push("--depth".to_string());
            args.push(depth.to_string());
        }
        args.push("--".to_string());
        args.push(self.repo_url.clone());
        args.push(self.destination.to_string_lossy().into_owned());
        args
    }
}

/// In-memory uncompressed tar of one cloned checkout.
#[derive(Debug, Clone)]
pub struct ExportArchive {
    pub export_id: Uuid,
    /// Name of the single top-level directory entry.
    pub root_name: String,
    /// Suggested download name, derived from the repository URL.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ExportArchive {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// `https://host/org/flask.git` -> `flask.tar`
pub fn archive_file_name(repo_url: &str) -> String {
    let stem = repo_url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .map(|segment| segment.strip_suffix(".git").unwrap_or(segment))
        .filter(|segment| !segment.is_empty())
        .unwrap_or("repository");
    let safe: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.tar", safe)
}
