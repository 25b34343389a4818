use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::oracle::Alphabet;

/// Represents a context in an n-gram model.
///
/// A `State` corresponds to a fixed context string (`key`) and stores
/// all observed transitions from this context to the next character.
///
/// Conceptually, this is a node in a Markov chain where outgoing edges
/// are weighted by their number of observations.
///
/// ## Responsibilities:
/// - Accumulate transition occurrences during training
/// - Turn occurrences into a smoothed distribution over an alphabet
/// - Merge with another state having the same key (parallel training)
///
/// ## Invariants
/// - All transitions belong to the same `key`
/// - Each transition occurrence count is strictly positive
/// - `total` is the sum of all occurrence counts
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct State {
	/// Context preceding the transitions.
	key: String,
	/// Outgoing transitions indexed by the next character.
	/// Example: { 'e' => 42, 'a' => 3 }
	transitions: HashMap<char, usize>,
	total: usize,
}

impl State {
	/// Creates a new empty state for the given context.
	pub fn new(key: &str) -> Self {
		Self {
			key: key.to_owned(),
			transitions: HashMap::new(),
			total: 0,
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	/// Records an occurrence of a transition toward `next_char`.
	pub fn add_transition(&mut self, next_char: char) {
		*self.transitions.entry(next_char).or_insert(0) += 1;
		self.total += 1;
	}

	/// Number of times `next_char` followed this context.
	pub fn count(&self, next_char: char) -> usize {
		self.transitions.get(&next_char).copied().unwrap_or(0)
	}

	/// Total number of observed transitions.
	pub fn total(&self) -> usize {
		self.total
	}

	/// Additively smoothed distribution over the symbols of `alphabet`.
	///
	/// Every symbol receives `smoothing` pseudo-occurrences. Characters
	/// missing from the alphabet count toward the unknown symbol.
	/// Falls back to a uniform distribution when there is no mass at all.
	pub fn distribution(&self, alphabet: &Alphabet, smoothing: f64) -> Vec<f64> {
		let dimension = alphabet.dimension();
		let denominator = self.total as f64 + smoothing * dimension as f64;
		if denominator <= 0.0 {
			return vec![1.0 / dimension as f64; dimension];
		}

		let mut distribution = vec![smoothing / denominator; dimension];
		for (next_char, occurrence) in &self.transitions {
			let symbol = alphabet.symbol_of(*next_char).unwrap_or(Alphabet::UNKNOWN);
			distribution[symbol] += *occurrence as f64 / denominator;
		}
		distribution
	}

	/// Merges another state into this one.
	///
	/// Both states must represent the same context (`key`).
	/// Transition occurrence counts are summed.
	///
	/// # Errors
	/// Returns an error if the state keys do not match.
	pub fn merge(&mut self, other: &Self) -> Result<(), String> {
		if self.key != other.key {
			return Err(format!("Key mismatch: '{}' vs '{}'", self.key, other.key));
		}

		for (next_char, occurrence) in &other.transitions {
			*self.transitions.entry(*next_char).or_insert(0) += *occurrence;
		}
		self.total += other.total;

		Ok(())
	}
}
