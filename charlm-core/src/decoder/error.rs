use thiserror::Error;

use crate::oracle::OracleError;

/// Reasons a generation call fails.
///
/// Every variant is fatal for the call that raised it; the decoder never
/// returns a truncated sequence.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
	#[error("context must not be empty")]
	EmptyContext,

	#[error("number of steps must be at least 1")]
	NoSteps,

	#[error("invalid beam configuration: {0}")]
	InvalidConfig(String),

	#[error("beam exhausted at step {step}: every candidate was pruned")]
	BeamExhausted { step: usize },

	#[error("deadline exceeded before step {step}")]
	DeadlineExceeded { step: usize },

	#[error(transparent)]
	Oracle(#[from] OracleError),
}
