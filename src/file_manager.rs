use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Owns the images directory and the names of the files inside it.
#[derive(Debug, Clone)]
pub struct FileManager {
    base_dir: PathBuf,
    public_prefix: String,
}

impl FileManager {
    pub fn new(base_dir: &Path, public_prefix: &str) -> Result<Self> {
        let base_dir = base_dir.to_path_buf();
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("Failed to create images directory: {:?}", base_dir))?;

        Ok(Self {
            base_dir,
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Where the raw download for `name` is staged.
    pub fn temp_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{}_temp.jpg", name))
    }

    pub fn image_path(&self, name: &str, extension: &str) -> PathBuf {
        self.base_dir.join(format!("{}.{}", name, extension))
    }

    /// Path written into the source file in place of the remote URL.
    pub fn public_path(&self, name: &str, extension: &str) -> String {
        format!("{}/{}.{}", self.public_prefix, name, extension)
    }

    pub fn save_temp(&self, name: &str, content: &[u8]) -> io::Result<PathBuf> {
        let path = self.temp_path(name);
        let mut file = fs::File::create(&path)?;
        file.write_all(content)?;

        Ok(path)
    }

    /// Moves the staged download to its final name and returns that path.
    pub fn promote(&self, name: &str, extension: &str) -> io::Result<PathBuf> {
        let final_path = self.image_path(name, extension);
        fs::rename(self.temp_path(name), &final_path)?;

        Ok(final_path)
    }

    /// Removes `path`, treating a missing file as already removed.
    pub fn discard(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
