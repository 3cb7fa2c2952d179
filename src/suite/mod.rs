//! Suites of test cases run inside one database session.

pub mod user;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::SessionConfig;
use crate::session::{DatabaseTool, HarnessError, Session};

/// A single named check run against a shared context.
#[async_trait]
pub trait TestCase<C: Sync>: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: &C) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub struct CaseOutcome {
    pub name: String,
    pub result: Result<(), String>,
    pub elapsed: Duration,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug)]
pub struct SuiteReport {
    pub suite: String,
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<CaseOutcome>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn outcome(&self, name: &str) -> Option<&CaseOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    pub fn log_summary(&self) {
        for outcome in self.outcomes.iter().filter(|o| !o.passed()) {
            if let Err(message) = &outcome.result {
                log::error!("FAIL {}::{}: {}", self.suite, outcome.name, message);
            }
        }
        log::info!(
            "{}: {} passed, {} failed (started {})",
            self.suite,
            self.passed(),
            self.failed(),
            self.started_at.to_rfc3339()
        );
    }
}

#[derive(Debug, Error)]
pub enum SuiteError {
    /// The session never started; no case ran.
    #[error("session setup failed: {0}")]
    Setup(#[source] HarnessError),
    /// Every case ran, but the database could not be put back.
    #[error("session teardown failed after {} cases: {source}", .report.outcomes.len())]
    Teardown {
        report: SuiteReport,
        #[source]
        source: HarnessError,
    },
}

impl SuiteError {
    /// Case results, when the cases got to run.
    pub fn report(&self) -> Option<&SuiteReport> {
        match self {
            SuiteError::Setup(_) => None,
            SuiteError::Teardown { report, .. } => Some(report),
        }
    }
}

/// Ordered test cases sharing a context of type `C`.
pub struct Suite<C: Sync> {
    name: String,
    cases: Vec<Box<dyn TestCase<C>>>,
}

impl<C: Sync> Suite<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    pub fn case(mut self, case: impl TestCase<C> + 'static) -> Self {
        self.cases.push(Box::new(case));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Run every case, in registration order, inside one session.
    ///
    /// Fails without running anything when the session cannot start. A
    /// failing case is recorded and the next one still runs. A teardown
    /// error still carries the case results.
    pub async fn run(
        &self,
        session_config: &SessionConfig,
        tool: &dyn DatabaseTool,
        ctx: &C,
    ) -> Result<SuiteReport, SuiteError> {
        let session = Session::begin(session_config, tool).map_err(SuiteError::Setup)?;

        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(self.cases.len());

        for case in &self.cases {
            let start = Instant::now();
            let result = case.run(ctx).await.map_err(|e| format!("{:#}", e));
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => log::info!("{}::{} ... ok ({:?})", self.name, case.name(), elapsed),
                Err(message) => {
                    log::warn!("{}::{} ... FAILED: {}", self.name, case.name(), message)
                }
            }

            outcomes.push(CaseOutcome {
                name: case.name().to_string(),
                result,
                elapsed,
            });
        }

        let report = SuiteReport {
            suite: self.name.clone(),
            started_at,
            outcomes,
        };

        match session.finish() {
            Ok(()) => Ok(report),
            Err(source) => Err(SuiteError::Teardown { report, source }),
        }
    }
}
