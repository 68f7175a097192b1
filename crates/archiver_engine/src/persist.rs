use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Failure of one of the durable sync stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("{path:?} is not a valid store: {message}")]
    Corrupt { path: PathBuf, message: String },
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Create `dir` and any missing parents. Account folders are created lazily,
/// on the first document saved for that account.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let unusable = |reason: String| PersistError::OutputDir(format!("{}: {reason}", dir.display()));
    fs::create_dir_all(dir).map_err(|e| unusable(e.to_string()))?;
    if !fs::metadata(dir).map_err(|e| unusable(e.to_string()))?.is_dir() {
        return Err(unusable("not a directory".to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(PathBuf),
    AlreadyExists(PathBuf),
}

/// Writes files through a temp file in the target directory, then renames.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Write `{dir}/{filename}`, replacing any previous content.
    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        let target = self.dir.join(filename);
        let tmp = self.stage(content)?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }

    /// Write `{dir}/{filename}` only if it does not exist yet. An existing file
    /// is left untouched.
    pub fn create_new(&self, filename: &str, content: &str) -> Result<CreateOutcome, PersistError> {
        let target = self.dir.join(filename);
        if target.exists() {
            return Ok(CreateOutcome::AlreadyExists(target));
        }
        let tmp = self.stage(content)?;
        match tmp.persist_noclobber(&target) {
            Ok(_) => Ok(CreateOutcome::Created(target)),
            // Lost a race against another writer of the same document.
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                Ok(CreateOutcome::AlreadyExists(target))
            }
            Err(err) => Err(PersistError::Io(err.error)),
        }
    }

    fn stage(&self, content: &str) -> Result<NamedTempFile, PersistError> {
        ensure_output_dir(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        Ok(tmp)
    }
}
