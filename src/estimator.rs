//! The downstream consumer of an evidence digest.

use std::error::Error;

use serde::Deserialize;

/// Failure reported by an estimator implementation.
#[derive(Debug, thiserror::Error)]
#[error("estimator failed: {0}")]
pub struct EstimatorError(#[source] Box<dyn Error + Send + Sync>);

impl EstimatorError {
    pub fn new(source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self(source.into())
    }
}

/// A probability judgment on the question, given the digest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Judgment {
    pub p_yes: f64,
    pub p_no: f64,
    pub confidence: f64,
    pub info_utility: f64,
}

pub trait Estimator {
    fn estimate(
        &self,
        question: &str,
        digest: &str,
    ) -> impl Future<Output = Result<Judgment, EstimatorError>> + Send;
}
