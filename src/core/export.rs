use crate::core::archive::archive_directory;
use crate::core::scratch::ScratchDir;
use crate::core::{CloneJob, ContainerRuntime, ExportArchive, ExportSettings};
use crate::domain::model::archive_file_name;
use crate::utils::error::{ExportError, Result};
use crate::utils::validation::validate_repo_url;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Clone, archive, clean up: one export per call.
#[derive(Clone)]
pub struct Exporter {
    runtime: Arc<dyn ContainerRuntime>,
    settings: ExportSettings,
}

impl Exporter {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, settings: ExportSettings) -> Self {
        Self { runtime, settings }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    /// Picks the repository for a request: the configured one, or the
    /// caller's when overrides are enabled.
    pub fn resolve_repo(&self, requested: Option<&str>) -> Result<String> {
        match requested {
            None => Ok(self.settings.repo_url.clone()),
            Some(_) if !self.settings.allow_repo_override => Err(ExportError::InvalidRequest {
                message: "repository override is disabled".to_string(),
            }),
            Some(repo) => {
                validate_repo_url("repo", repo).map_err(|e| ExportError::InvalidRequest {
                    message: e.to_string(),
                })?;
                Ok(repo.to_string())
            }
        }
    }

    /// Runs the export on its own task. Dropping the returned future does not
    /// interrupt it: the container is always gone before the scratch
    /// directory is removed.
    pub async fn export(&self, repo_url: &str) -> Result<ExportArchive> {
        let export_id = Uuid::new_v4();
        let span = tracing::info_span!("export", %export_id, repo = %repo_url);

        let exporter = self.clone();
        let repo_url = repo_url.to_string();
        let task = tokio::spawn(
            async move { exporter.run(export_id, &repo_url).await }.instrument(span),
        );
        task.await?
    }

    async fn run(&self, export_id: Uuid, repo_url: &str) -> Result<ExportArchive> {
        let started = Instant::now();

        let scratch = ScratchDir::create_in(&self.settings.data_dir)?;
        tracing::debug!("Scratch directory: {}", scratch.path().display());

        let outcome = self.clone_and_archive(export_id, repo_url, &scratch).await;

        if let Err(e) = scratch.release().await {
            tracing::error!("Failed to remove scratch directory: {}", e);
        }

        match &outcome {
            Ok(archive) => tracing::info!(
                "Export finished: {} bytes in {:?}",
                archive.len(),
                started.elapsed()
            ),
            Err(e) => tracing::error!(
                "Export failed after {:?}: {} (Category: {:?}, Severity: {:?})",
                started.elapsed(),
                e,
                e.category(),
                e.severity()
            ),
        }

        outcome
    }

    async fn clone_and_archive(
        &self,
        export_id: Uuid,
        repo_url: &str,
        scratch: &ScratchDir,
    ) -> Result<ExportArchive> {
        let job = CloneJob {
            export_id,
            image: self.settings.clone_image.clone(),
            repo_url: repo_url.to_string(),
            destination: scratch.path().to_path_buf(),
            mount: self.settings.data_dir.clone(),
            depth: self.settings.clone_depth,
            user: self.settings.container_user.clone(),
        };

        tracing::debug!("Cloning with {}", job.image);
        self.clone_repo(&job).await?;

        let root_name = scratch.name();
        let source = scratch.path().to_path_buf();
        let entry_root = root_name.clone();
        tracing::debug!("Archiving {}", source.display());
        let bytes =
            tokio::task::spawn_blocking(move || archive_directory(&source, &entry_root)).await??;

        Ok(ExportArchive {
            export_id,
            root_name,
            file_name: archive_file_name(repo_url),
            bytes,
        })
    }

    async fn clone_repo(&self, job: &CloneJob) -> Result<()> {
        let Some(limit) = self.settings.clone_timeout else {
            return self.runtime.run_clone(job).await;
        };

        match tokio::time::timeout(limit, self.runtime.run_clone(job)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Clone exceeded {:?}, removing its container", limit);
                if let Err(e) = self.runtime.abort_clone(job).await {
                    tracing::error!("Failed to abort clone: {}", e);
                }
                Err(ExportError::CloneTimeout { timeout: limit })
            }
        }
    }
}
