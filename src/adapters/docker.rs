use crate::core::{CloneJob, ContainerRuntime};
use crate::utils::error::{ExportError, Result};
use async_trait::async_trait;
use bollard::container::{
    Config, ListContainersOptions, LogsOptions, RemoveContainerOptions, StartContainerOptions,
    WaitContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use bollard::Docker;
use futures_util::{StreamExt, TryStreamExt};
use std::collections::HashMap;

const EXPORT_LABEL: &str = "repo-export.id";
const OUTPUT_TAIL_LINES: usize = 20;

/// Docker Engine backed [`ContainerRuntime`].
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connects using `DOCKER_HOST` or the platform's default socket.
    pub fn connect() -> Result<Self> {
        let docker =
            Docker::connect_with_local_defaults().map_err(|e| ExportError::RuntimeUnavailable {
                message: e.to_string(),
            })?;
        Ok(Self { docker })
    }

    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }

    async fn create(&self, job: &CloneJob) -> Result<String> {
        let config = container_config(job);

        match self
            .docker
            .create_container::<String, String>(None, config.clone())
            .await
        {
            Ok(created) => Ok(created.id),
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                tracing::info!("Image {} not present, pulling", job.image);
                self.pull_image(&job.image).await?;
                let created = self
                    .docker
                    .create_container::<String, String>(None, config)
                    .await
                    .map_err(classify)?;
                Ok(created.id)
            }
            Err(e) => Err(classify(e)),
        }
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        let (from_image, tag) = split_image_ref(image);
        let options = CreateImageOptions {
            from_image,
            tag,
            ..Default::default()
        };

        self.docker
            .create_image(Some(options), None, None)
            .try_collect::<Vec<_>>()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn start_and_wait(&self, id: &str) -> Result<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(classify)?;

        let exit_code = self.wait(id).await?;
        if exit_code != 0 {
            let output = self.output_tail(id).await;
            return Err(ExportError::CloneFailed { exit_code, output });
        }

        tracing::debug!("Clone container {} exited cleanly", short_id(id));
        Ok(())
    }

    async fn wait(&self, id: &str) -> Result<i64> {
        let options = WaitContainerOptions {
            condition: "not-running",
        };
        let mut responses = self.docker.wait_container(id, Some(options));

        let mut exit_code = 0;
        while let Some(response) = responses.next().await {
            match response {
                Ok(status) => exit_code = status.status_code,
                // bollard reports non-zero exits as an error item
                Err(DockerError::DockerContainerWaitError { code, .. }) => exit_code = code,
                Err(e) => return Err(classify(e)),
            }
        }
        Ok(exit_code)
    }

    /// Last lines of combined stdout/stderr, for failure reports.
    async fn output_tail(&self, id: &str) -> String {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: OUTPUT_TAIL_LINES.to_string(),
            ..Default::default()
        };

        let mut output = String::new();
        let mut logs = self.docker.logs(id, Some(options));
        while let Some(chunk) = logs.next().await {
            match chunk {
                Ok(chunk) => output.push_str(&chunk.to_string()),
                Err(e) => {
                    tracing::debug!("Could not read container output: {}", e);
                    break;
                }
            }
        }
        output.trim().to_string()
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| ExportError::RuntimeUnavailable {
                message: e.to_string(),
            })
    }

    async fn run_clone(&self, job: &CloneJob) -> Result<()> {
        let id = self.create(job).await?;
        tracing::debug!("Created clone container {}", short_id(&id));

        let outcome = self.start_and_wait(&id).await;
        remove_container(&self.docker, &id).await;
        outcome
    }

    async fn abort_clone(&self, job: &CloneJob) -> Result<()> {
        let options = ListContainersOptions::<String> {
            all: true,
            filters: HashMap::from([(
                "label".to_string(),
                vec![format!("{}={}", EXPORT_LABEL, job.export_id)],
            )]),
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(classify)?;
        for id in containers.into_iter().filter_map(|c| c.id) {
            remove_container(&self.docker, &id).await;
        }
        Ok(())
    }
}

async fn remove_container(docker: &Docker, id: &str) {
    let options = RemoveContainerOptions {
        force: true,
        ..Default::default()
    };
    match docker.remove_container(id, Some(options)).await {
        Ok(()) => tracing::debug!("Removed clone container {}", short_id(id)),
        Err(e) => tracing::warn!("Failed to remove container {}: {}", short_id(id), e),
    }
}

fn container_config(job: &CloneJob) -> Config<String> {
    let mount = job.mount.to_string_lossy();

    Config {
        image: Some(job.image.clone()),
        cmd: Some(job.git_args()),
        user: job.user.clone(),
        labels: Some(HashMap::from([(
            EXPORT_LABEL.to_string(),
            job.export_id.to_string(),
        )])),
        host_config: Some(HostConfig {
            binds: Some(vec![format!("{0}:{0}", mount)]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Splits `name[:tag]` for the pull API; an empty tag there means every tag.
fn split_image_ref(image: &str) -> (String, String) {
    if image.contains('@') {
        return (image.to_string(), String::new());
    }

    let name_start = image.rfind('/').map_or(0, |i| i + 1);
    match image[name_start..].rfind(':') {
        Some(i) => {
            let split = name_start + i;
            (image[..split].to_string(), image[split + 1..].to_string())
        }
        None => (image.to_string(), "latest".to_string()),
    }
}

/// A server-side answer means the runtime is up; anything else means we
/// never reached it.
fn classify(err: DockerError) -> ExportError {
    match err {
        e @ DockerError::DockerResponseServerError { .. } => ExportError::RuntimeError(e),
        other => ExportError::RuntimeUnavailable {
            message: other.to_string(),
        },
    }
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn job() -> CloneJob {
        CloneJob {
            export_id: Uuid::new_v4(),
            image: "alpine/git".to_string(),
            repo_url: "https://github.com/pallets/flask.git".to_string(),
            destination: PathBuf::from("/data/export-x1y2"),
            mount: PathBuf::from("/data"),
            depth: None,
            user: Some("1000:1000".to_string()),
        }
    }

    #[test]
    fn test_container_config_mounts_data_dir_at_same_path() {
        let job = job();
        let config = container_config(&job);

        assert_eq!(config.image.as_deref(), Some("alpine/git"));
        assert_eq!(config.user.as_deref(), Some("1000:1000"));
        assert_eq!(config.cmd, Some(job.git_args()));

        let binds = config.host_config.and_then(|host| host.binds).unwrap();
        assert_eq!(binds, vec!["/data:/data".to_string()]);

        let labels = config.labels.unwrap();
        assert_eq!(labels.get(EXPORT_LABEL), Some(&job.export_id.to_string()));
    }

    #[test]
    fn test_split_image_ref() {
        assert_eq!(
            split_image_ref("alpine/git"),
            ("alpine/git".to_string(), "latest".to_string())
        );
        assert_eq!(
            split_image_ref("alpine/git:2.45.2"),
            ("alpine/git".to_string(), "2.45.2".to_string())
        );
        assert_eq!(
            split_image_ref("registry:5000/tools/git"),
            ("registry:5000/tools/git".to_string(), "latest".to_string())
        );
        assert_eq!(
            split_image_ref("alpine/git@sha256:abc"),
            ("alpine/git@sha256:abc".to_string(), String::new())
        );
    }

    #[test]
    fn test_classify_server_errors() {
        let server = DockerError::DockerResponseServerError {
            status_code: 500,
            message: "boom".to_string(),
        };
        assert!(matches!(classify(server), ExportError::RuntimeError(_)));
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
    }
}
