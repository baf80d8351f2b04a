pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::docker::DockerRuntime;
pub use crate::adapters::http::{router, serve};
pub use crate::config::toml_config::TomlConfig;
pub use crate::core::export::Exporter;
pub use crate::domain::model::{CloneJob, ExportArchive, ExportSettings};
pub use crate::domain::ports::{ConfigProvider, ContainerRuntime};
pub use crate::utils::error::{ExportError, Result};
