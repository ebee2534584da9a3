use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

// Handle for a chart bundle found on disk. Loading only proves the bundle is
// present and shaped like a chart; deep format validation stays with the
// package manager at install time.
pub struct Chart {
    path: PathBuf,
}

impl Chart {
    pub fn load(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)
            .with_context(|| format!("loading chart bundle failed: {}", path.display()))?;
        if !metadata.is_dir() {
            bail!("chart bundle is not a directory: {}", path.display());
        }
        if !path.join("Chart.yaml").is_file() {
            bail!(
                "chart bundle has no Chart.yaml manifest: {}",
                path.display()
            );
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
