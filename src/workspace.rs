use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// The directory holding one run's intermediate files.
///
/// It is removed when the run closes it, or when it is dropped on an early
/// return. A directory already present at acquisition time belongs to a run
/// that never finished and is left alone.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Workspace> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        match fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::ConfigurationConflict(path));
            }
            Err(e) => return Err(e.into()),
        }

        debug!(?path, "workspace acquired");

        Ok(Workspace {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Removes the directory and everything in it.
    pub fn close(mut self) -> Result<()> {
        self.released = true;

        fs::remove_dir_all(&self.path).map_err(|source| Error::ResourceCleanupFailure {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = ?self.path, "workspace removed");

        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!(path = ?self.path, error = %e, "could not remove workspace");
        }
    }
}
