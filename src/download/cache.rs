use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

use crate::boundary::BoundaryPass;

/// Directory holding the boundary files
pub struct GeodataCache {
    dir: PathBuf,
}

impl GeodataCache {
    /// Use `custom_dir`, or the per-user cache directory
    pub fn new(custom_dir: Option<PathBuf>) -> Result<Self> {
        let dir = match custom_dir {
            Some(dir) => dir,
            None => {
                let proj_dirs = ProjectDirs::from("", "", "qos-poc-loader")
                    .context("Could not determine cache directory")?;
                proj_dirs.cache_dir().join("geodata")
            }
        };

        fs::create_dir_all(&dir).context("Failed to create geodata directory")?;

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, pass: &BoundaryPass) -> PathBuf {
        self.dir.join(pass.file_name)
    }

    /// A non-empty file is already present
    pub fn is_cached(&self, pass: &BoundaryPass) -> bool {
        fs::metadata(self.path_for(pass))
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }
}
