use crate::domain::model::CloneJob;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Runs disposable clone containers.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Checks the runtime is reachable.
    async fn ping(&self) -> Result<()>;

    /// Runs `job` to completion and removes the container, whatever the outcome.
    /// Returns once the checkout is complete in `job.destination`.
    async fn run_clone(&self, job: &CloneJob) -> Result<()>;

    /// Force-removes every container started for `job`. Called after a
    /// `run_clone` future was abandoned; returns once nothing can write into
    /// `job.destination` any more.
    async fn abort_clone(&self, job: &CloneJob) -> Result<()>;
}

pub trait ConfigProvider: Send + Sync {
    fn bind_addr(&self) -> &str;
    fn repo_url(&self) -> &str;
    fn data_dir(&self) -> &str;
    fn clone_image(&self) -> &str;
    fn clone_depth(&self) -> Option<u32>;
    fn clone_timeout(&self) -> Option<Duration>;
    fn container_user(&self) -> Option<&str>;
    fn allow_repo_override(&self) -> bool;
}
