use crate::utils::error::Result;
use std::path::Path;
use tempfile::TempDir;

const SCRATCH_PREFIX: &str = "export-";

/// Per-export working directory under the shared data directory.
///
/// Call [`ScratchDir::release`] when the export finishes; dropping it without
/// releasing (a panic unwinding the export task) still removes the directory.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn create_in(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(parent)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Final path component, used as the archive's top-level entry.
    pub fn name(&self) -> String {
        self.dir
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| SCRATCH_PREFIX.trim_end_matches('-').to_string())
    }

    /// Removes the directory and everything cloned into it.
    pub async fn release(self) -> Result<()> {
        let dir = self.dir;
        tokio::task::spawn_blocking(move || dir.close()).await??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_release_removes_populated_directory() {
        let parent = TempDir::new().unwrap();
        let scratch = ScratchDir::create_in(parent.path()).unwrap();
        let path = scratch.path().to_path_buf();

        std::fs::create_dir_all(path.join("nested/deeper")).unwrap();
        std::fs::write(path.join("nested/deeper/file.txt"), b"content").unwrap();

        assert!(scratch.name().starts_with("export-"));
        assert!(path.starts_with(parent.path()));

        scratch.release().await.unwrap();
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_drop_removes_directory() {
        let parent = TempDir::new().unwrap();
        let path = {
            let scratch = ScratchDir::create_in(parent.path()).unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_names_are_unique() {
        let parent = TempDir::new().unwrap();
        let first = ScratchDir::create_in(parent.path()).unwrap();
        let second = ScratchDir::create_in(parent.path()).unwrap();
        assert_ne!(first.name(), second.name());
    }

    #[test]
    fn test_missing_parent_is_an_error() {
        let parent = TempDir::new().unwrap();
        let missing = parent.path().join("does-not-exist");
        assert!(ScratchDir::create_in(&missing).is_err());
    }
}
