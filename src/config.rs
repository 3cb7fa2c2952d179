//! Harness configuration loaded from the environment (and `.env`).

use std::env;
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_LOCK_FILE: &str = ".lock";
const DEFAULT_WORK_DIR: &str = "tmp";
const DEFAULT_DUMP_PROGRAM: &str = "mysqldump";
const DEFAULT_CLIENT_PROGRAM: &str = "mysql";
const DEFAULT_TEST_USERNAME: &str = "user_01";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// What to do when `mysqldump` or `mysql` fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolFailurePolicy {
    /// Stop the current session step and report the error.
    #[default]
    Abort,
    /// Log the failure and carry on.
    Warn,
}

impl std::str::FromStr for ToolFailurePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "warn" => Ok(Self::Warn),
            _ => Err(()),
        }
    }
}

/// Credentials of the database the API under test writes to.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub name: String,
    pub user: String,
    pub password: Option<String>,
}

/// External programs used for snapshotting.
#[derive(Debug, Clone)]
pub struct ToolPrograms {
    pub dump: String,
    pub client: String,
}

impl Default for ToolPrograms {
    fn default() -> Self {
        Self {
            dump: DEFAULT_DUMP_PROGRAM.to_string(),
            client: DEFAULT_CLIENT_PROGRAM.to_string(),
        }
    }
}

/// Filesystem layout and failure handling of a test session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub lock_path: PathBuf,
    pub work_dir: PathBuf,
    pub failure_policy: ToolFailurePolicy,
}

impl SessionConfig {
    pub fn full_dump_path(&self) -> PathBuf {
        self.work_dir.join("_db_production.sql")
    }

    pub fn schema_dump_path(&self) -> PathBuf {
        self.work_dir.join("_db_init.sql")
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.work_dir.join(".error")
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lock_path: PathBuf::from(DEFAULT_LOCK_FILE),
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            failure_policy: ToolFailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub api_root: String,
    pub database: DatabaseConfig,
    pub programs: ToolPrograms,
    pub session: SessionConfig,
    pub test_username: String,
}

impl HarnessConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let optional = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let failure_policy = match lookup("HARNESS_TOOL_FAILURES") {
            Some(raw) if !raw.trim().is_empty() => {
                raw.parse().map_err(|_| ConfigError::Invalid {
                    key: "HARNESS_TOOL_FAILURES",
                    value: raw,
                })?
            }
            _ => ToolFailurePolicy::default(),
        };

        Ok(Self {
            api_root: required("API_ROOT")?,
            database: DatabaseConfig {
                name: required("DB_NAME")?,
                user: required("DB_USER")?,
                password: lookup("DB_PASS").filter(|p| !p.is_empty()),
            },
            programs: ToolPrograms {
                dump: optional("HARNESS_DUMP_PROGRAM", DEFAULT_DUMP_PROGRAM),
                client: optional("HARNESS_CLIENT_PROGRAM", DEFAULT_CLIENT_PROGRAM),
            },
            session: SessionConfig {
                lock_path: PathBuf::from(optional("HARNESS_LOCK_FILE", DEFAULT_LOCK_FILE)),
                work_dir: PathBuf::from(optional("HARNESS_WORK_DIR", DEFAULT_WORK_DIR)),
                failure_policy,
            },
            test_username: optional("HARNESS_TEST_USERNAME", DEFAULT_TEST_USERNAME),
        })
    }
}
