#![allow(dead_code)]

use async_trait::async_trait;
use repo_export::{CloneJob, ContainerRuntime, ExportError, ExportSettings, Result};
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Files a checkout of the default repository starts with.
pub const CHECKOUT_FILES: &[(&str, &str)] = &[
    ("LICENSE.txt", "Copyright 2010 Pallets"),
    ("pyproject.toml", "[project]\nname = \"Flask\"\n"),
    ("src/flask/__init__.py", "from .app import Flask as Flask\n"),
];

/// Writes a fixed checkout into the clone destination, like a successful
/// `git clone` would.
#[derive(Default)]
pub struct FakeGitRuntime {
    pub jobs: Mutex<Vec<CloneJob>>,
}

impl FakeGitRuntime {
    pub fn recorded_jobs(&self) -> Vec<CloneJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerRuntime for FakeGitRuntime {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn run_clone(&self, job: &CloneJob) -> Result<()> {
        assert!(job.destination.starts_with(&job.mount));
        assert!(job.destination.is_dir());

        for (path, content) in CHECKOUT_FILES {
            let target = job.destination.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(target, content)?;
        }
        std::fs::write(job.destination.join("EXPORT_ID"), job.export_id.to_string())?;
        std::fs::write(job.destination.join("ORIGIN"), &job.repo_url)?;

        // Let concurrent exports interleave.
        tokio::time::sleep(Duration::from_millis(20)).await;

        self.jobs.lock().unwrap().push(job.clone());
        Ok(())
    }

    async fn abort_clone(&self, _job: &CloneJob) -> Result<()> {
        Ok(())
    }
}

/// A clone that keeps writing pack files into the destination for `delay`
/// after it starts, like `git` does while objects are still arriving.
pub struct SlowGitRuntime {
    pub delay: Duration,
    pub finished: AtomicBool,
    pub late_write_landed: AtomicBool,
}

impl SlowGitRuntime {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            finished: AtomicBool::new(false),
            late_write_landed: AtomicBool::new(false),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn late_write_landed(&self) -> bool {
        self.late_write_landed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContainerRuntime for SlowGitRuntime {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn run_clone(&self, job: &CloneJob) -> Result<()> {
        let pack_dir = job.destination.join(".git/objects/pack");
        std::fs::create_dir_all(&pack_dir)?;

        tokio::time::sleep(self.delay).await;

        // Fails if the scratch directory was pulled out from under the clone.
        let landed = std::fs::write(pack_dir.join("tmp_pack_a1b2c3"), "PACK").is_ok();
        self.late_write_landed.store(landed, Ordering::SeqCst);
        self.finished.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn abort_clone(&self, _job: &CloneJob) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    /// The runtime cannot be reached at all.
    RuntimeDown,
    /// `git clone` exits non-zero after writing part of the checkout.
    CloneFails,
    /// The clone "succeeds" but leaves nothing readable to archive.
    DestinationVanishes,
    /// The clone never finishes.
    Hangs,
}

pub struct FailingRuntime {
    pub failure: Failure,
    pub aborted: AtomicBool,
}

impl FailingRuntime {
    pub fn new(failure: Failure) -> Self {
        Self {
            failure,
            aborted: AtomicBool::new(false),
        }
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContainerRuntime for FailingRuntime {
    async fn ping(&self) -> Result<()> {
        match self.failure {
            Failure::RuntimeDown => Err(ExportError::RuntimeUnavailable {
                message: "connection refused".to_string(),
            }),
            _ => Ok(()),
        }
    }

    async fn run_clone(&self, job: &CloneJob) -> Result<()> {
        match self.failure {
            Failure::RuntimeDown => Err(ExportError::RuntimeUnavailable {
                message: "connection refused".to_string(),
            }),
            Failure::CloneFails => {
                std::fs::create_dir_all(job.destination.join(".git"))?;
                std::fs::write(job.destination.join(".git/HEAD"), "ref: refs/heads/main")?;
                Err(ExportError::CloneFailed {
                    exit_code: 128,
                    output: "fatal: unable to access: Could not resolve host: github.com"
                        .to_string(),
                })
            }
            Failure::DestinationVanishes => {
                std::fs::remove_dir_all(&job.destination)?;
                Ok(())
            }
            Failure::Hangs => {
                std::fs::write(job.destination.join("partial"), "half a pack")?;
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    async fn abort_clone(&self, _job: &CloneJob) -> Result<()> {
        self.aborted.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub fn settings_for(data_dir: &Path) -> ExportSettings {
    ExportSettings {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    }
}

pub fn leftover_entries(data_dir: &Path) -> usize {
    std::fs::read_dir(data_dir).unwrap().count()
}

/// (path, contents) of every regular file in an uncompressed tar.
pub fn archive_files(bytes: &[u8]) -> Vec<(String, String)> {
    let mut archive = tar::Archive::new(Cursor::new(bytes));
    let mut files = Vec::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        if entry.header().entry_type() != tar::EntryType::Regular {
            continue;
        }
        let path = entry.path().unwrap().to_string_lossy().into_owned();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        files.push((path, content));
    }
    files
}

/// Distinct first path components across all entries.
pub fn top_level_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = tar::Archive::new(Cursor::new(bytes));
    let mut names: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            let path = entry.path().unwrap().into_owned();
            path.components()
                .next()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect();
    names.sort();
    names.dedup();
    names
}

/// File paths with the top-level directory stripped.
pub fn relative_file_set(bytes: &[u8]) -> Vec<(String, String)> {
    let mut files: Vec<(String, String)> = archive_files(bytes)
        .into_iter()
        .filter_map(|(path, content)| {
            path.split_once('/')
                .map(|(_, rest)| (rest.to_string(), content))
        })
        .filter(|(path, _)| path != "EXPORT_ID")
        .collect();
    files.sort();
    files
}
