#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use charlm_core::{Alphabet, Oracle, OracleError, Prediction};

/// One oracle call: the characters fed and whether a state came with them.
pub type Call = Vec<(char, Option<String>)>;

/// Deterministic oracle whose distribution only depends on the last
/// character consumed. The state is the history of consumed characters.
pub struct TableOracle {
	alphabet: Alphabet,
	table: HashMap<char, Vec<f64>>,
	fallback: Vec<f64>,
	delay: Option<Duration>,
	calls: RefCell<Vec<Call>>,
}

impl TableOracle {
	/// Same distribution whatever the input.
	pub fn constant(alphabet: &str, distribution: &[f64]) -> Self {
		Self {
			alphabet: Alphabet::new(alphabet.chars()),
			table: HashMap::new(),
			fallback: distribution.to_vec(),
			delay: None,
			calls: RefCell::new(Vec::new()),
		}
	}

	/// Distribution chosen by the character just consumed.
	pub fn after(mut self, c: char, distribution: &[f64]) -> Self {
		self.table.insert(c, distribution.to_vec());
		self
	}

	/// Sleeps on every call.
	pub fn slow(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);
		self
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.borrow().clone()
	}

	pub fn distribution_after(&self, c: char) -> &[f64] {
		self.table.get(&c).unwrap_or(&self.fallback)
	}
}

impl Oracle for TableOracle {
	type State = String;

	fn alphabet(&self) -> &Alphabet {
		&self.alphabet
	}

	fn predict(&self, batch: &[(char, Option<&String>)]) -> Result<Vec<Prediction<String>>, OracleError> {
		if let Some(delay) = self.delay {
			std::thread::sleep(delay);
		}
		self.calls
			.borrow_mut()
			.push(batch.iter().map(|(c, s)| (*c, s.cloned())).collect());

		Ok(batch
			.iter()
			.map(|(c, state)| {
				let mut history = state.cloned().unwrap_or_default();
				history.push(*c);
				Prediction {
					distribution: self.distribution_after(*c).to_vec(),
					state: history,
				}
			})
			.collect())
	}
}

/// Oracle that always fails, or answers with a wrong batch size.
pub enum BrokenOracle {
	Failing(Alphabet),
	Short(Alphabet),
}

impl Oracle for BrokenOracle {
	type State = ();

	fn alphabet(&self) -> &Alphabet {
		match self {
			BrokenOracle::Failing(a) | BrokenOracle::Short(a) => a,
		}
	}

	fn predict(&self, batch: &[(char, Option<&()>)]) -> Result<Vec<Prediction<()>>, OracleError> {
		match self {
			BrokenOracle::Failing(_) => Err(OracleError::MalformedState("corrupted".to_owned())),
			BrokenOracle::Short(a) => Ok(batch
				.iter()
				.skip(1)
				.map(|_| Prediction {
					distribution: vec![1.0 / a.dimension() as f64; a.dimension()],
					state: (),
				})
				.collect()),
		}
	}
}
