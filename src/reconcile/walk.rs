//! Root volume traversal
//!
//! Enumerates the folders up to two levels below a root volume and records
//! their depth, which decides the quota policy that applies to them.

use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A folder below a root volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeFolder {
    /// Absolute path on disk
    pub path: PathBuf,
    /// Path relative to the root volume
    pub relative: PathBuf,
    /// 1 for user folders, 2 for user volume folders
    pub depth: usize,
}

/// List the directories one and two levels below `root`, excluding the root
/// itself. Traversal order carries no meaning.
pub fn volume_folders(root: &Path) -> io::Result<Vec<VolumeFolder>> {
    let mut folders = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(2) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        folders.push(VolumeFolder {
            path: entry.path().to_path_buf(),
            relative: relative.to_path_buf(),
            depth: entry.depth(),
        });
    }
    Ok(folders)
}
