use super::state::State;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Represents an n-gram model over characters.
///
/// The `NGramModel` stores states for contexts of length `n-1`
/// and records which character followed each of them in training text.
///
/// # Responsibilities
/// - Count transitions from training text
/// - Look up the state of a given context
/// - Merge with another n-gram model of the same order `n`
///
/// # Invariants
/// - `n` is always >= 1 (order 1 has the empty context only)
/// - Each state in `states` corresponds to a unique context of length `n-1`
/// - All state transitions have occurrence counts >= 1
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NGramModel {
	/// The order of the model (context length + 1)
	n: usize,

	/// Mapping from a context (length n-1) to its corresponding state
	states: HashMap<String, State>,
}

impl NGramModel {
	/// Creates a new n-gram model of order `n`.
	///
	/// # Errors
	/// Returns an error if `n < 1`.
	pub fn new(n: usize) -> Result<Self, String> {
		if n < 1 {
			return Err("n must be >= 1".to_owned());
		}
		Ok(Self { n, states: HashMap::new() })
	}

	pub fn order(&self) -> usize {
		self.n
	}

	/// Number of distinct contexts seen.
	pub fn len(&self) -> usize {
		self.states.len()
	}

	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	/// Adds a training text to the model.
	///
	/// Every character preceded by at least `n-1` characters updates the
	/// state of those `n-1` characters. Case is preserved.
	pub fn add_text(&mut self, chars: &[char]) {
		self.add_text_from(chars, 0);
	}

	/// Like `add_text`, but only counts characters at positions `>= first`.
	///
	/// Lets a chunk of a longer text carry preceding characters as context
	/// without counting them twice.
	pub fn add_text_from(&mut self, chars: &[char], first: usize) {
		let context_len = self.n - 1;
		if chars.len() <= context_len {
			// Text too short, no n-grams to count
			return;
		}

		for i in first.max(context_len)..chars.len() {
			let key: String = chars[i - context_len..i].iter().collect();
			let state = self.states.entry(key).or_insert_with_key(|key| State::new(key));
			state.add_transition(chars[i]);
		}
	}

	/// Returns the state of a context of exactly `n-1` characters.
	pub fn state(&self, context: &str) -> Option<&State> {
		self.states.get(context)
	}

	/// Merges another n-gram model into this one.
	///
	/// # Errors
	/// Returns an error if the model orders do not match.
	pub fn merge(&mut self, other: &Self) -> Result<(), String> {
		if self.n != other.n {
			return Err(format!("N mismatch: {} vs {}", self.n, other.n));
		}

		for (key, state) in &other.states {
			if let Some(existing) = self.states.get_mut(key) {
				existing.merge(state)?;
			} else {
				self.states.insert(key.clone(), state.clone());
			}
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chars(s: &str) -> Vec<char> {
		s.chars().collect()
	}

	#[test]
	fn order_zero_is_rejected() {
		assert!(NGramModel::new(0).is_err());
		assert!(NGramModel::new(1).is_ok());
	}

	#[test]
	fn unigram_counts_every_character() {
		let mut model = NGramModel::new(1).unwrap();
		model.add_text(&chars("abca"));
		let state = model.state("").unwrap();
		assert_eq!(state.total(), 4);
		assert_eq!(state.count('a'), 2);
	}

	#[test]
	fn trigram_uses_two_character_contexts() {
		let mut model = NGramModel::new(3).unwrap();
		model.add_text(&chars("abab"));
		assert_eq!(model.len(), 2);
		assert_eq!(model.state("ab").unwrap().count('a'), 1);
		assert_eq!(model.state("ba").unwrap().count('b'), 1);
		assert!(model.state("a").is_none());
	}

	#[test]
	fn chunked_counting_matches_whole_text() {
		let text = chars("the cat sat on the mat");
		let mut whole = NGramModel::new(3).unwrap();
		whole.add_text(&text);

		let mut chunked = NGramModel::new(3).unwrap();
		chunked.add_text_from(&text[..10], 0);
		// second chunk starts at 10 and carries two characters of context
		chunked.add_text_from(&text[8..], 2);
		assert_eq!(chunked, whole);
	}

	#[test]
	fn short_text_is_ignored() {
		let mut model = NGramModel::new(4).unwrap();
		model.add_text(&chars("abc"));
		assert!(model.is_empty());
	}

	#[test]
	fn merge_requires_same_order() {
		let mut left = NGramModel::new(2).unwrap();
		left.add_text(&chars("ab"));
		let mut right = NGramModel::new(2).unwrap();
		right.add_text(&chars("ab"));
		left.merge(&right).unwrap();
		assert_eq!(left.state("a").unwrap().count('b'), 2);

		assert!(left.merge(&NGramModel::new(3).unwrap()).is_err());
	}
}
