//! Recursive input discovery.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! let files = thumbkit::discover::find_files(Path::new("models"), &["obj", "glb"]).unwrap();
//! for file in files {
//!     println!("{}", file.display());
//! }
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("input directory not found: {0}")]
    NotADirectory(PathBuf),
}

/// Returns every file under `root` whose name ends in `.<ext>` for one of
/// `extensions` (case-insensitive), sorted ascending by path.
///
/// Symlinked directories are not descended into, so a linked subtree is
/// never listed twice and link cycles cannot recurse. Symlinks that resolve
/// to files are kept. Entries that cannot be read are logged and skipped.
/// No match is an empty list, not an error.
///
/// # Errors
/// Returns [`DiscoverError::NotADirectory`] if `root` is not a directory.
pub fn find_files<S: AsRef<str>>(root: &Path, extensions: &[S]) -> Result<Vec<PathBuf>, DiscoverError> {
    if !root.is_dir() {
        return Err(DiscoverError::NotADirectory(root.to_path_buf()));
    }

    let suffixes: Vec<String> = extensions
        .iter()
        .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", e))
        .collect();

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink() && entry.path().is_file());
        if !is_file {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_lowercase();
        if suffixes.iter().any(|suffix| name.ends_with(suffix.as_str())) {
            files.push(entry.into_path());
        }
    }

    files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    Ok(files)
}
