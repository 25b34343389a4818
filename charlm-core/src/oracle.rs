use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mapping between the symbol indices of an oracle's output and characters.
///
/// Symbol `0` is reserved for "unknown" and never maps to a character.
/// The `i`-th character of the alphabet has symbol index `i + 1`, so a
/// distribution over an alphabet of `n` characters has `n + 1` entries.
///
/// ## Invariants
/// - Characters are unique
/// - `indices` is the exact inverse of `chars`
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(from = "Vec<char>", into = "Vec<char>")]
pub struct Alphabet {
	chars: Vec<char>,
	indices: HashMap<char, usize>,
}

impl Alphabet {
	/// Symbol index of the reserved unknown symbol.
	pub const UNKNOWN: usize = 0;

	/// Builds an alphabet from any characters, sorted and deduplicated.
	pub fn new<I: IntoIterator<Item = char>>(chars: I) -> Self {
		let mut chars: Vec<char> = chars.into_iter().collect();
		chars.sort_unstable();
		chars.dedup();
		Self::from(chars)
	}

	/// Number of mapped characters.
	pub fn len(&self) -> usize {
		self.chars.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chars.is_empty()
	}

	/// Number of entries of a distribution over this alphabet.
	pub fn dimension(&self) -> usize {
		self.chars.len() + 1
	}

	/// Returns the character of a symbol index, `None` if unmapped.
	pub fn char_at(&self, symbol: usize) -> Option<char> {
		symbol.checked_sub(1).and_then(|i| self.chars.get(i).copied())
	}

	/// Returns the symbol index of a character, `None` if unknown.
	pub fn symbol_of(&self, c: char) -> Option<usize> {
		self.indices.get(&c).copied()
	}

	pub fn contains(&self, c: char) -> bool {
		self.indices.contains_key(&c)
	}

	/// Mapped characters, in symbol order.
	pub fn chars(&self) -> &[char] {
		&self.chars
	}

	/// Returns a new alphabet containing the characters of both.
	pub fn union(&self, other: &Self) -> Self {
		Self::new(self.chars.iter().chain(other.chars.iter()).copied())
	}
}

impl From<Vec<char>> for Alphabet {
	/// Keeps the given order; later duplicates are dropped.
	fn from(chars: Vec<char>) -> Self {
		let mut unique = Vec::with_capacity(chars.len());
		let mut indices = HashMap::with_capacity(chars.len());
		for c in chars {
			if !indices.contains_key(&c) {
				unique.push(c);
				indices.insert(c, unique.len());
			}
		}
		Self { chars: unique, indices }
	}
}

impl From<Alphabet> for Vec<char> {
	fn from(alphabet: Alphabet) -> Self {
		alphabet.chars
	}
}

/// Output of the oracle for one `(character, state)` input.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction<S> {
	/// Probability of every symbol of the alphabet to come next.
	pub distribution: Vec<f64>,
	/// State after consuming the input character.
	pub state: S,
}

/// Failures of an oracle invocation.
///
/// These are never retried by the decoder.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
	#[error("oracle returned {actual} predictions for a batch of {expected}")]
	BatchMismatch { expected: usize, actual: usize },

	#[error("distribution has {actual} entries, alphabet expects {expected}")]
	DimensionMismatch { expected: usize, actual: usize },

	#[error("distribution entry {symbol} is not a probability: {value}")]
	InvalidProbability { symbol: usize, value: f64 },

	#[error("malformed state: {0}")]
	MalformedState(String),
}

/// A stateful character-prediction capability.
///
/// The oracle is queried in batches: each input pairs the character to
/// consume with the state reached so far (`None` for start of sequence).
/// It must answer with exactly one prediction per input, in input order.
/// Implementations are expected to be deterministic for fixed inputs.
pub trait Oracle {
	/// Opaque recurrent state threaded through successive calls.
	type State: Clone;

	/// Mapping from output symbols to characters.
	fn alphabet(&self) -> &Alphabet;

	/// Consumes one character per batch entry and predicts what follows.
	fn predict(
		&self,
		batch: &[(char, Option<&Self::State>)],
	) -> Result<Vec<Prediction<Self::State>>, OracleError>;
}

impl<O: Oracle + ?Sized> Oracle for &O {
	type State = O::State;

	fn alphabet(&self) -> &Alphabet {
		(**self).alphabet()
	}

	fn predict(
		&self,
		batch: &[(char, Option<&Self::State>)],
	) -> Result<Vec<Prediction<Self::State>>, OracleError> {
		(**self).predict(batch)
	}
}
