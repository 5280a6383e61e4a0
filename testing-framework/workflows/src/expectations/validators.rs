use async_trait::async_trait;
use testing_framework_core::{
    nodes::{ApiClientError, ValidatorInfo},
    scenario::{DynError, Expectation, NetworkControl},
};
use thiserror::Error;

#[derive(Debug, Error)]
enum ValidatorSetError {
    #[error("validator set check requires at least one boot node")]
    NoBootNodes,
    #[error("{node} getCurrentValidators failed: {source}")]
    RequestFailed {
        node: String,
        #[source]
        source: ApiClientError,
    },
    #[error("expected {expected} current validators, found {actual}")]
    ValidatorCountMismatch { expected: usize, actual: usize },
    #[error("{node_id} is not in the current validator set")]
    MissingValidator { node_id: String },
}

/// Checks the platform chain's current validator set as seen by the first
/// boot node.
#[derive(Clone, Debug, Default)]
pub struct ValidatorSetExpectation {
    expected_count: Option<usize>,
    required: Vec<String>,
}

impl ValidatorSetExpectation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_count(mut self, expected: usize) -> Self {
        self.expected_count = Some(expected);
        self
    }

    #[must_use]
    pub fn containing(mut self, node_id: impl Into<String>) -> Self {
        self.required.push(node_id.into());
        self
    }

    fn check(&self, validators: &[ValidatorInfo]) -> Result<(), ValidatorSetError> {
        if let Some(expected) = self
            .expected_count
            .filter(|expected| *expected != validators.len())
        {
            return Err(ValidatorSetError::ValidatorCountMismatch {
                expected,
                actual: validators.len(),
            });
        }
        for node_id in &self.required {
            if !validators.iter().any(|v| &v.node_id == node_id) {
                return Err(ValidatorSetError::MissingValidator {
                    node_id: node_id.clone(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Expectation for ValidatorSetExpectation {
    fn name(&self) -> &str {
        "validator_set"
    }

    async fn evaluate(&mut self, network: &dyn NetworkControl) -> Result<(), DynError> {
        let (node, api) = network
            .boot_nodes()
            .into_iter()
            .next()
            .ok_or(ValidatorSetError::NoBootNodes)?;
        let validators = api
            .p_chain()
            .get_current_validators()
            .await
            .map_err(|source| ValidatorSetError::RequestFailed { node, source })?;
        tracing::info!(validators = validators.len(), "validator set: collected sample");
        Ok(self.check(&validators)?)
    }
}
