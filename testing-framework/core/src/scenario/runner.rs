use std::{any::Any, panic::AssertUnwindSafe, time::Duration};

use async_trait::async_trait;
use futures::FutureExt as _;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{info, warn};

use super::{DynError, Expectation, NetworkControl};

pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// One end-to-end test body.
#[async_trait]
pub trait ScenarioTest: Send + Sync {
    fn name(&self) -> &str;

    fn execution_timeout(&self) -> Duration {
        DEFAULT_EXECUTION_TIMEOUT
    }

    async fn execute(&self, network: &dyn NetworkControl) -> Result<(), DynError>;
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario '{name}' failed: {source}")]
    Execution {
        name: String,
        #[source]
        source: DynError,
    },
    #[error("scenario '{name}' did not finish within {timeout:?}")]
    TimedOut { name: String, timeout: Duration },
    #[error("scenario '{name}' panicked: {message}")]
    Panicked { name: String, message: String },
    #[error("expectations failed:\n{0}")]
    Expectations(DynError),
}

/// A test body plus the expectations checked once it succeeds.
pub struct Scenario {
    test: Box<dyn ScenarioTest>,
    expectations: Vec<Box<dyn Expectation>>,
}

impl Scenario {
    #[must_use]
    pub fn new(test: impl ScenarioTest + 'static) -> Self {
        Self {
            test: Box::new(test),
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Expectation + 'static) -> Self {
        self.expectations.push(Box::new(expectation));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.test.name()
    }

    /// Executes the test body under its execution timeout and then evaluates
    /// every expectation. A panicking test body is reported as an error.
    pub async fn run(&mut self, network: &dyn NetworkControl) -> Result<(), ScenarioError> {
        let name = self.test.name().to_owned();
        let limit = self.test.execution_timeout();
        info!(scenario = %name, timeout = ?limit, "executing scenario");

        let outcome = timeout(
            limit,
            AssertUnwindSafe(self.test.execute(network)).catch_unwind(),
        )
        .await;

        match outcome {
            Err(_) => {
                warn!(scenario = %name, "scenario timed out");
                return Err(ScenarioError::TimedOut {
                    name,
                    timeout: limit,
                });
            }
            Ok(Err(panic)) => {
                return Err(ScenarioError::Panicked {
                    name,
                    message: panic_message(panic),
                });
            }
            Ok(Ok(Err(source))) => return Err(ScenarioError::Execution { name, source }),
            Ok(Ok(Ok(()))) => {}
        }

        Self::run_expectations(&mut self.expectations, network).await?;
        info!(scenario = %name, "scenario completed");
        Ok(())
    }

    /// Evaluates every registered expectation, aggregating failures so callers
    /// can see all missing conditions in a single report.
    async fn run_expectations(
        expectations: &mut [Box<dyn Expectation>],
        network: &dyn NetworkControl,
    ) -> Result<(), ScenarioError> {
        let mut failures: Vec<(String, DynError)> = Vec::new();
        for expectation in expectations {
            if let Err(source) = expectation.evaluate(network).await {
                failures.push((expectation.name().to_owned(), source));
            }
        }

        if failures.is_empty() {
            return Ok(());
        }

        let summary = failures
            .into_iter()
            .map(|(name, source)| format!("{name}: {source}"))
            .collect::<Vec<_>>()
            .join("\n");

        Err(ScenarioError::Expectations(summary.into()))
    }
}

/// Attempts to turn a panic payload into a readable string for diagnostics.
#[must_use]
pub fn panic_message(panic: Box<dyn Any + Send>) -> String {
    panic.downcast::<String>().map_or_else(
        |panic| {
            panic.downcast::<&'static str>().map_or_else(
                |_| "unknown panic".to_owned(),
                |message| (*message).to_owned(),
            )
        },
        |message| *message,
    )
}
