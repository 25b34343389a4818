use serde::{Deserialize, Serialize};

use crate::oracle::Alphabet;

/// Longest context window a model may be configured with.
pub const MAX_LENGTH: usize = 32;

/// Persisted configuration of a character model.
///
/// Stored next to the weights as JSON; the weights only hold counts, the
/// config holds everything needed to turn them into distributions.
///
/// # Invariants
/// - `1 <= length <= MAX_LENGTH`
/// - `smoothing` is finite and non-negative
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelConfig {
	/// Characters the model can emit, in symbol order.
	pub alphabet: Alphabet,

	/// Number of previous characters seen (window size).
	length: usize,

	/// Pseudo-occurrences added to every symbol.
	smoothing: f64,
}

impl Default for ModelConfig {
	fn default() -> Self {
		Self {
			alphabet: Alphabet::default(),
			length: 6,
			smoothing: 0.01,
		}
	}
}

impl ModelConfig {
	/// Creates a config with an empty alphabet.
	///
	/// # Errors
	/// Returns an error if a parameter is out of range.
	pub fn new(length: usize, smoothing: f64) -> Result<Self, String> {
		let mut config = Self::default();
		config.set_length(length)?;
		config.set_smoothing(smoothing)?;
		Ok(config)
	}

	pub fn length(&self) -> usize {
		self.length
	}

	pub fn smoothing(&self) -> f64 {
		self.smoothing
	}

	/// Sets the context window size.
	///
	/// # Errors
	/// Returns an error if the value is outside `1..=MAX_LENGTH`.
	pub fn set_length(&mut self, length: usize) -> Result<(), String> {
		if !(1..=MAX_LENGTH).contains(&length) {
			return Err(format!("Length must be between 1 and {MAX_LENGTH}, got {length}"));
		}
		self.length = length;
		Ok(())
	}

	/// Sets the additive smoothing.
	///
	/// # Errors
	/// Returns an error if the value is negative or not finite.
	pub fn set_smoothing(&mut self, smoothing: f64) -> Result<(), String> {
		if !smoothing.is_finite() || smoothing < 0.0 {
			return Err(format!("Smoothing must be a non-negative number, got {smoothing}"));
		}
		self.smoothing = smoothing;
		Ok(())
	}

	/// Re-checks the invariants, e.g. after deserialization.
	///
	/// # Errors
	/// Returns the first violated invariant.
	pub fn validate(&self) -> Result<(), String> {
		let mut copy = self.clone();
		copy.set_length(self.length)?;
		copy.set_smoothing(self.smoothing)
	}
}
