//! Test session with database snapshot isolation.
//!
//! A session owns the lock marker and the two snapshots taken when it
//! starts:
//! - `lock` - exclusive marker file guarding the shared database
//! - `tool` - dump/restore of the database through external programs
//!
//! Setup dumps the full database and its schema, then reloads the schema
//! dump so tests start from empty tables. Teardown reloads the full dump
//! and removes the marker, also when the session is dropped early.

mod lock;
mod tool;

pub use lock::SessionLock;
pub use tool::{DatabaseTool, DumpMode, MysqlCli};

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;

use crate::config::{SessionConfig, ToolFailurePolicy};

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(
        "lock file {} exists: a previous test session did not finish and the database \
         may still hold test data. Restore it if needed, then remove the lock file manually",
        .path.display()
    )]
    LockHeld { path: PathBuf },
    #[error("lock file {}: {source}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to run {program}: {source}")]
    ToolSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with status {code}")]
    ToolExit { program: String, code: i32 },
    #[error(
        "database restore failed ({source}); the unrestored snapshot is at {}",
        .snapshot.display()
    )]
    RestoreFailed {
        snapshot: PathBuf,
        #[source]
        source: Box<HarnessError>,
    },
}

/// A running test session. Call [`Session::finish`] to tear it down and
/// see errors; dropping it tears down too but can only log them.
pub struct Session<'a> {
    tool: &'a dyn DatabaseTool,
    lock: Option<SessionLock>,
    full_dump: PathBuf,
    policy: ToolFailurePolicy,
}

impl<'a> Session<'a> {
    pub fn begin(config: &SessionConfig, tool: &'a dyn DatabaseTool) -> Result<Self, HarnessError> {
        let lock = SessionLock::acquire(&config.lock_path)?;

        fs::create_dir_all(&config.work_dir).map_err(|e| HarnessError::File {
            path: config.work_dir.clone(),
            source: e,
        })?;

        let policy = config.failure_policy;
        let full_dump = config.full_dump_path();
        let schema_dump = config.schema_dump_path();

        log::info!("Backing up database...");
        check(policy, "full dump", tool.dump(DumpMode::Full, &full_dump))?;
        check(policy, "schema dump", tool.dump(DumpMode::SchemaOnly, &schema_dump))?;

        // From here on the database gets modified, so an error has to
        // restore the full dump on the way out.
        let session = Session {
            tool,
            lock: Some(lock),
            full_dump,
            policy,
        };

        log::info!("Creating test database...");
        check(policy, "schema reload", tool.restore(&schema_dump))?;

        Ok(session)
    }

    /// Restore the full dump and release the lock.
    pub fn finish(mut self) -> Result<(), HarnessError> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<(), HarnessError> {
        let Some(lock) = self.lock.take() else {
            return Ok(());
        };

        log::info!("Restoring database...");
        let restored = match self.tool.restore(&self.full_dump) {
            Ok(()) => Ok(()),
            Err(e) => {
                // The next session would overwrite the snapshot, so move it
                // out of the way before the lock goes.
                let snapshot = self.preserve_snapshot();
                log::error!(
                    "Database was not restored; the snapshot is kept at {}",
                    snapshot.display()
                );
                check(
                    self.policy,
                    "restore",
                    Err(HarnessError::RestoreFailed {
                        snapshot,
                        source: Box::new(e),
                    }),
                )
            }
        };
        let released = lock.release();

        restored.and(released)
    }

    /// Rename the full dump to a timestamped name next to it and return
    /// where it ended up.
    fn preserve_snapshot(&self) -> PathBuf {
        let stem = self
            .full_dump
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        let kept = self.full_dump.with_file_name(format!(
            "{}.{}.sql",
            stem,
            Utc::now().format("%Y%m%dT%H%M%S%.6f")
        ));

        match fs::rename(&self.full_dump, &kept) {
            Ok(()) => kept,
            Err(e) => {
                log::error!(
                    "Failed to move {} aside: {}. Copy it before the next run.",
                    self.full_dump.display(),
                    e
                );
                self.full_dump.clone()
            }
        }
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            log::error!("Session teardown failed: {}", e);
        }
    }
}

fn check(
    policy: ToolFailurePolicy,
    step: &str,
    result: Result<(), HarnessError>,
) -> Result<(), HarnessError> {
    match (result, policy) {
        (Ok(()), _) => Ok(()),
        (Err(e), ToolFailurePolicy::Warn) => {
            log::warn!("{} failed, continuing: {}", step, e);
            Ok(())
        }
        (Err(e), ToolFailurePolicy::Abort) => {
            log::error!("{} failed: {}", step, e);
            Err(e)
        }
    }
}
