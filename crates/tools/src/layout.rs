//! Fixed workspace layout: `Files` inbox plus one folder per category.

use deskpilot_core::engine::FILES_DIR;
use deskpilot_core::Category;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Directory does not exist: {0}")]
    Missing(PathBuf),
    #[error("No write permission for {0}. Please use a different location.")]
    ReadOnly(PathBuf),
    #[error("Cannot create directories in {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn inbox(&self) -> PathBuf {
        self.root.join(FILES_DIR)
    }

    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.dir_name())
    }

    pub fn category_dirs(&self) -> HashMap<Category, PathBuf> {
        Category::ALL
            .iter()
            .map(|c| (*c, self.category_dir(*c)))
            .collect()
    }

    pub fn has_all_category_dirs(&self) -> bool {
        Category::ALL.iter().all(|c| self.category_dir(*c).is_dir())
    }
}

/// Resolve the folder and make sure it exists and is writable.
pub fn validate_folder(folder: &Path) -> Result<PathBuf, LayoutError> {
    let path = folder
        .canonicalize()
        .map_err(|_| LayoutError::Missing(folder.to_path_buf()))?;

    if !path.is_dir() {
        return Err(LayoutError::Missing(path));
    }

    // The temp file is removed on drop.
    if tempfile::NamedTempFile::new_in(&path).is_err() {
        return Err(LayoutError::ReadOnly(path));
    }

    Ok(path)
}

/// Create the four category folders if missing.
pub fn create_category_dirs(workspace: &Workspace) -> Result<HashMap<Category, PathBuf>, LayoutError> {
    validate_folder(workspace.root())?;

    let dirs = workspace.category_dirs();
    for dir in dirs.values() {
        std::fs::create_dir_all(dir).map_err(|source| LayoutError::Create {
            path: workspace.root().to_path_buf(),
            source,
        })?;
        info!("Ensured directory exists: {}", dir.display());
    }
    Ok(dirs)
}

/// All non-hidden files below `root`, recursively. A missing root yields nothing.
pub fn scan_directory(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}
