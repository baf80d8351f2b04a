use crate::config::validate_provider;
use crate::core::ConfigProvider;
use crate::domain::model::{DEFAULT_BIND, DEFAULT_CLONE_IMAGE, DEFAULT_DATA_DIR, DEFAULT_REPO_URL};
use crate::utils::error::{ExportError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub export: ExportConfig,
    pub container: ContainerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub repo_url: String,
    pub data_dir: String,
    pub allow_repo_override: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            repo_url: DEFAULT_REPO_URL.to_string(),
            data_dir: DEFAULT_DATA_DIR.to_string(),
            allow_repo_override: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub image: String,
    pub clone_depth: Option<u32>,
    pub clone_timeout_secs: Option<u64>,
    pub user: Option<String>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_CLONE_IMAGE.to_string(),
            clone_depth: None,
            clone_timeout_secs: None,
            user: None,
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ExportError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ExportError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ExportError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl ConfigProvider for TomlConfig {
    fn bind_addr(&self) -> &str {
        &self.server.bind
    }

    fn repo_url(&self) -> &str {
        &self.export.repo_url
    }

    fn data_dir(&self) -> &str {
        &self.export.data_dir
    }

    fn clone_image(&self) -> &str {
        &self.container.image
    }

    fn clone_depth(&self) -> Option<u32> {
        self.container.clone_depth
    }

    fn clone_timeout(&self) -> Option<Duration> {
        self.container.clone_timeout_secs.map(Duration::from_secs)
    }

    fn container_user(&self) -> Option<&str> {
        self.container.user.as_deref()
    }

    fn allow_repo_override(&self) -> bool {
        self.export.allow_repo_override
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(self)
    }
}
