use crate::utils::error::Result;
use std::path::Path;
use tar::Builder;

/// Writes `dir` into an uncompressed tar held in memory, with every entry
/// nested under `root_name`. Symlinks are stored as links.
pub fn archive_directory(dir: &Path, root_name: &str) -> Result<Vec<u8>> {
    let mut builder = Builder::new(Vec::new());
    builder.follow_symlinks(false);
    builder.append_dir_all(root_name, dir)?;
    Ok(builder.into_inner()?)
}
