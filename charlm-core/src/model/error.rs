use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of training, rating, loading or saving a `CharModel`.
#[derive(Debug, Error)]
pub enum ModelError {
	#[error("cannot access {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("cannot encode or decode model weights: {0}")]
	Weights(#[from] postcard::Error),

	#[error("cannot encode or decode model config: {0}")]
	Config(#[from] serde_json::Error),

	#[error("invalid model config: {0}")]
	InvalidConfig(String),

	#[error("weights hold an order-{order} table but the config length is {length}")]
	ConfigMismatch { order: usize, length: usize },

	#[error("no training data")]
	NoTrainingData,

	#[error("training lost worker results: {received} of {expected} received")]
	IncompleteTraining { expected: usize, received: usize },

	#[error("no text to rate")]
	EmptyText,
}

impl ModelError {
	pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
		Self::Io { path: path.into(), source }
	}
}
