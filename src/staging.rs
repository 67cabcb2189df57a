use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::{PipelineError, PipelineResult};

/// A local directory used to hand records from one stage to the next.
#[derive(Clone, Debug)]
pub struct StagingDir {
    pub base_dir: PathBuf,
}

impl StagingDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        StagingDir {
            base_dir: dir.into(),
        }
    }

    pub fn path(&self, ident: &str) -> PathBuf {
        self.base_dir.join(ident)
    }

    pub fn exists(&self, ident: &str) -> bool {
        self.path(ident).is_file()
    }

    /// Fails with `DirectoryNotFound` unless the directory is there.
    pub fn require(&self) -> PipelineResult<()> {
        if self.base_dir.is_dir() {
            Ok(())
        } else {
            Err(PipelineError::DirectoryNotFound(self.base_dir.clone()))
        }
    }

    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base_dir)
    }

    /// Names of regular files whose extension matches `ext` (case-insensitive),
    /// sorted by name. Entry errors are returned; non UTF-8 names are skipped
    /// with a warning.
    pub fn list(&self, ext: &str) -> std::io::Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in std::fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if !entry.path().is_file() {
                continue;
            }

            match entry.file_name().into_string() {
                Ok(name) if has_extension(&name, ext) => names.push(name),
                Ok(_) => {}
                Err(name) => log::warn!(
                    "skipping file with non UTF-8 name in {}: {}",
                    self.base_dir.display(),
                    name.to_string_lossy()
                ),
            }
        }

        names.sort();
        Ok(names)
    }

    pub fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.path(ident))
    }

    /// Writes through a temp file in the same directory, then renames over `ident`.
    pub fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.path(ident);

        let mut tmp = tempfile::NamedTempFile::new_in(&self.base_dir)?;
        tmp.write_all(data)?;
        tmp.persist(&path).map_err(|e| e.error)?;

        Ok(path)
    }

    pub fn write_json<T: Serialize>(&self, ident: &str, value: &T) -> PipelineResult<PathBuf> {
        let body = serde_json::to_vec_pretty(value).map_err(|e| PipelineError::json(ident, e))?;
        Ok(self.write(ident, &body)?)
    }
}

fn has_extension(name: &str, ext: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
