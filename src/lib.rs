use anyhow::Context;

pub mod api;
pub mod config;
pub mod session;
pub mod suite;

pub use crate::api::{ApiError, UserApiClient};
pub use crate::config::{HarnessConfig, SessionConfig, ToolFailurePolicy};
pub use crate::session::{DatabaseTool, DumpMode, HarnessError, MysqlCli, Session};
pub use crate::suite::{Suite, SuiteError, SuiteReport, TestCase};

pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Load the configuration from the environment and run the user suite
/// against the configured API and database.
pub async fn run() -> anyhow::Result<SuiteReport> {
    let config = HarnessConfig::from_env().context("invalid harness configuration")?;

    let api = UserApiClient::new(&config.api_root)?;
    let tool = MysqlCli::new(
        config.database.clone(),
        config.programs.clone(),
        config.session.error_log_path(),
    );
    let ctx = suite::user::UserSuiteContext {
        api,
        username: config.test_username.clone(),
    };

    log::info!(
        "Testing {} against database {}",
        config.api_root,
        config.database.name
    );

    let suite = suite::user::suite();
    match suite.run(&config.session, &tool, &ctx).await {
        Ok(report) => {
            report.log_summary();
            Ok(report)
        }
        Err(e) => {
            if let Some(report) = e.report() {
                report.log_summary();
            }
            Err(e.into())
        }
    }
}
