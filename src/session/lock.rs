//! Lock marker guarding the shared database.
//!
//! The marker is a plain file. Its presence means a session is running, or
//! that one crashed and left the database in an unknown state.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::HarnessError;

#[derive(Debug)]
pub struct SessionLock {
    path: PathBuf,
    released: bool,
}

impl SessionLock {
    /// Create the marker, failing if it already exists.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref().to_path_buf();

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(HarnessError::LockHeld { path });
            }
            Err(e) => return Err(HarnessError::Lock { path, source: e }),
        };

        // Informational only; nobody parses it.
        if let Err(e) = writeln!(
            file,
            "pid={} started={}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        ) {
            log::debug!("Could not write owner to {}: {}", path.display(), e);
        }

        log::debug!("Acquired session lock {}", path.display());
        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the marker, reporting any I/O error.
    pub fn release(mut self) -> Result<(), HarnessError> {
        self.released = true;
        remove_marker(&self.path).map_err(|e| HarnessError::Lock {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove_marker(&self.path) {
            log::error!(
                "Failed to remove session lock {}: {}. Remove it manually.",
                self.path.display(),
                e
            );
        }
    }
}

fn remove_marker(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::debug!("Released session lock {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::warn!("Session lock {} vanished before release", path.display());
            Ok(())
        }
        Err(e) => Err(e),
    }
}
