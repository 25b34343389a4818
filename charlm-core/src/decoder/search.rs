use std::time::Instant;

use log::{debug, trace};

use super::config::BeamConfig;
use super::error::DecodeError;
use super::frontier::{CandidatePool, Frontier};
use super::node::HypothesisTree;
use crate::oracle::{Alphabet, Oracle, OracleError, Prediction};

/// Result of a successful beam search.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded {
	/// Context (without its last character) followed by the best hypothesis.
	pub text: String,
	/// Cumulative cost (negative log-probability) of the generated part.
	pub cost: f64,
	/// Frontier size after each step.
	pub frontier_sizes: Vec<usize>,
}

/// Width-bounded best-first generator driven by an `Oracle`.
///
/// # Responsibilities
/// - Warm the oracle up on the context
/// - Expand every live hypothesis with its top-k alternatives
/// - Prune by probability floor and by rank across the whole generation
/// - Backtrack the best hypothesis into the output text
///
/// The search is not globally optimal: pruning may discard a path that
/// would have become the best one later.
pub struct BeamSearch<O: Oracle> {
	oracle: O,
	config: BeamConfig,
}

impl<O: Oracle> BeamSearch<O> {
	pub fn new(oracle: O, config: BeamConfig) -> Self {
		Self { oracle, config }
	}

	pub fn config(&self) -> &BeamConfig {
		&self.config
	}

	pub fn oracle(&self) -> &O {
		&self.oracle
	}

	/// Generates the `steps` most probable characters following `context`.
	///
	/// The output is the context followed by the generated characters, so
	/// its length is `len(context) + steps` characters.
	///
	/// # Errors
	/// See `search`.
	pub fn generate(&self, context: &str, steps: usize) -> Result<String, DecodeError> {
		self.search(context, steps).map(|decoded| decoded.text)
	}

	/// Runs the beam search and reports the winning hypothesis.
	///
	/// # Errors
	/// - `EmptyContext`, `NoSteps`, `InvalidConfig` before the oracle is called
	/// - `BeamExhausted` if a generation loses every candidate
	/// - `DeadlineExceeded` if the configured deadline elapses
	/// - `Oracle` for any oracle failure, unchanged
	pub fn search(&self, context: &str, steps: usize) -> Result<Decoded, DecodeError> {
		self.config.validate().map_err(DecodeError::InvalidConfig)?;
		if steps == 0 {
			return Err(DecodeError::NoSteps);
		}
		let chars: Vec<char> = context.chars().collect();
		let (last, prefix) = chars.split_last().ok_or(DecodeError::EmptyContext)?;

		let started = Instant::now();
		let state = self.warm_up(prefix)?;

		let mut tree = HypothesisTree::new();
		let root = tree.insert_root(*last, state);
		let mut frontier = Frontier::seed(root);
		let mut frontier_sizes = Vec::new();

		for step in 0..steps {
			if let Some(deadline) = self.config.deadline {
				if started.elapsed() > deadline {
					return Err(DecodeError::DeadlineExceeded { step });
				}
			}
			frontier = self.expand(&mut tree, &frontier, step)?;
			tree.sweep(frontier.entries_mut());
			frontier_sizes.push(frontier.len());
		}

		// Every step either fills the frontier or fails.
		let best = frontier.best().ok_or(DecodeError::BeamExhausted { step: steps })?;
		let mut text: String = prefix.iter().collect();
		text.extend(tree.to_sequence(best));

		Ok(Decoded {
			text,
			cost: tree.get(best).cumulative_cost(),
			frontier_sizes,
		})
	}

	/// Feeds all but the last context character one at a time.
	///
	/// Returns `None` when there is nothing to feed.
	fn warm_up(&self, prefix: &[char]) -> Result<Option<O::State>, DecodeError> {
		let mut state: Option<O::State> = None;
		for c in prefix {
			let predictions = self.oracle.predict(&[(*c, state.as_ref())])?;
			let prediction = single(predictions)?;
			state = Some(prediction.state);
		}
		Ok(state)
	}

	/// Computes the next generation from `frontier`.
	fn expand(
		&self,
		tree: &mut HypothesisTree<O::State>,
		frontier: &Frontier,
		step: usize,
	) -> Result<Frontier, DecodeError> {
		let predictions = {
			let batch: Vec<(char, Option<&O::State>)> = frontier
				.entries()
				.iter()
				.map(|id| {
					let node = tree.get(*id);
					(node.character(), node.state())
				})
				.collect();
			self.oracle.predict(&batch)?
		};
		if predictions.len() != frontier.len() {
			return Err(OracleError::BatchMismatch {
				expected: frontier.len(),
				actual: predictions.len(),
			}
			.into());
		}

		let alphabet = self.oracle.alphabet();
		// A hypothesis never yields more candidates than there are symbols.
		let per_node = self.config.top_k.min(alphabet.dimension());
		let mut pool = CandidatePool::with_capacity(frontier.len().saturating_mul(per_node));
		for (slot, (parent, prediction)) in frontier.entries().iter().zip(&predictions).enumerate() {
			let parent_cost = tree.get(*parent).cumulative_cost();
			for (symbol, probability) in self.alternatives(alphabet, &prediction.distribution)? {
				let Some(character) = alphabet.char_at(symbol) else {
					trace!("step {step}: skipping unmapped symbol {symbol}");
					continue;
				};
				pool.push(slot, *parent, character, -probability.ln(), parent_cost);
			}
		}

		let candidates = pool.len();
		let survivors = pool.into_best(self.config.beam_width);
		if survivors.is_empty() {
			return Err(DecodeError::BeamExhausted { step });
		}

		let entries = survivors
			.into_iter()
			.map(|c| {
				let state = predictions[c.slot].state.clone();
				tree.insert_child(c.parent, c.character, c.local_cost, state)
			})
			.collect();
		let next = Frontier::from_ranked(entries);

		debug!(
			"step {step}: {candidates} candidates, kept {}, best cost {:.4}",
			next.len(),
			next.best().map(|id| tree.get(id).cumulative_cost()).unwrap_or(f64::INFINITY)
		);
		Ok(next)
	}

	/// Top-k symbols of a distribution that pass the probability floor.
	///
	/// Ordered by decreasing probability, lower symbol first on ties.
	fn alternatives(&self, alphabet: &Alphabet, distribution: &[f64]) -> Result<Vec<(usize, f64)>, OracleError> {
		if distribution.len() != alphabet.dimension() {
			return Err(OracleError::DimensionMismatch {
				expected: alphabet.dimension(),
				actual: distribution.len(),
			});
		}
		if let Some((symbol, value)) = distribution
			.iter()
			.enumerate()
			.find(|(_, p)| !(0.0..=1.0).contains(*p))
		{
			return Err(OracleError::InvalidProbability { symbol, value: *value });
		}

		let mut ranked: Vec<(usize, f64)> = distribution.iter().copied().enumerate().collect();
		let rank = |a: &(usize, f64), b: &(usize, f64)| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0));
		let top_k = self.config.top_k;
		if ranked.len() > top_k {
			ranked.select_nth_unstable_by(top_k - 1, rank);
			ranked.truncate(top_k);
		}
		ranked.sort_unstable_by(rank);
		ranked.retain(|(_, p)| *p > 0.0 && *p >= self.config.min_probability);
		Ok(ranked)
	}
}

/// Unwraps the prediction of a batch of one.
fn single<S>(mut predictions: Vec<Prediction<S>>) -> Result<Prediction<S>, OracleError> {
	match (predictions.pop(), predictions.len()) {
		(Some(prediction), 0) => Ok(prediction),
		(popped, rest) => Err(OracleError::BatchMismatch {
			expected: 1,
			actual: rest + usize::from(popped.is_some()),
		}),
	}
}
