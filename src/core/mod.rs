pub mod archive;
pub mod export;
pub mod scratch;

pub use crate::domain::model::{CloneJob, ExportArchive, ExportSettings};
pub use crate::domain::ports::{ConfigProvider, ContainerRuntime};
pub use crate::utils::error::Result;
