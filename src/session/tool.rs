//! Database dump/restore through the MySQL command line tools.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::HarnessError;
use crate::config::{DatabaseConfig, ToolPrograms};

/// Which part of the database a dump contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpMode {
    /// Schema and rows.
    Full,
    /// Table definitions without rows.
    SchemaOnly,
}

/// Snapshot and reload of the database behind the API.
pub trait DatabaseTool: Send + Sync {
    /// Write a dump of the database to `out`.
    fn dump(&self, mode: DumpMode, out: &Path) -> Result<(), HarnessError>;

    /// Load the dump at `input` into the database.
    fn restore(&self, input: &Path) -> Result<(), HarnessError>;
}

/// `mysqldump` / `mysql` invoked as child processes.
///
/// The password travels in `MYSQL_PWD` so it never shows up in the
/// process list. Tool stderr is appended to `error_log`.
pub struct MysqlCli {
    database: DatabaseConfig,
    programs: ToolPrograms,
    error_log: PathBuf,
}

impl MysqlCli {
    pub fn new(database: DatabaseConfig, programs: ToolPrograms, error_log: PathBuf) -> Self {
        Self {
            database,
            programs,
            error_log,
        }
    }

    fn dump_command(&self, mode: DumpMode) -> Command {
        let mut cmd = Command::new(&self.programs.dump);
        cmd.arg(&self.database.name)
            .arg(format!("--user={}", self.database.user))
            .arg("--add-drop-database")
            .arg("--add-drop-table");
        if mode == DumpMode::SchemaOnly {
            cmd.arg("--no-data");
        }
        self.apply_password(&mut cmd);
        cmd
    }

    fn restore_command(&self) -> Command {
        let mut cmd = Command::new(&self.programs.client);
        cmd.arg(format!("--user={}", self.database.user))
            .arg(format!("--database={}", self.database.name));
        self.apply_password(&mut cmd);
        cmd
    }

    fn apply_password(&self, cmd: &mut Command) {
        match &self.database.password {
            Some(password) => cmd.env("MYSQL_PWD", password),
            None => cmd.env_remove("MYSQL_PWD"),
        };
    }

    fn open_error_log(&self) -> Result<File, HarnessError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.error_log)
            .map_err(|e| HarnessError::File {
                path: self.error_log.clone(),
                source: e,
            })
    }
}

impl DatabaseTool for MysqlCli {
    fn dump(&self, mode: DumpMode, out: &Path) -> Result<(), HarnessError> {
        let stdout = File::create(out).map_err(|e| HarnessError::File {
            path: out.to_path_buf(),
            source: e,
        })?;
        let stderr = self.open_error_log()?;

        let mut cmd = self.dump_command(mode);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        log::debug!("Dumping {} ({:?}) to {}", self.database.name, mode, out.display());
        run(&self.programs.dump, cmd)
    }

    fn restore(&self, input: &Path) -> Result<(), HarnessError> {
        let stdin = File::open(input).map_err(|e| HarnessError::File {
            path: input.to_path_buf(),
            source: e,
        })?;
        let stderr = self.open_error_log()?;

        let mut cmd = self.restore_command();
        cmd.stdin(Stdio::from(stdin))
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr));

        log::debug!("Restoring {} from {}", self.database.name, input.display());
        run(&self.programs.client, cmd)
    }
}

fn run(program: &str, mut cmd: Command) -> Result<(), HarnessError> {
    let status = cmd.status().map_err(|e| HarnessError::ToolSpawn {
        program: program.to_string(),
        source: e,
    })?;

    if !status.success() {
        return Err(HarnessError::ToolExit {
            program: program.to_string(),
            code: status.code().unwrap_or(-1),
        });
    }
    Ok(())
}
