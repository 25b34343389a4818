use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use log::{debug, info, warn};
use rand::seq::SliceRandom;
use serde::Serialize;

use super::config::ModelConfig;
use super::error::ModelError;
use super::ngram_model::NGramModel;
use super::window::ContextWindow;
use crate::oracle::{Alphabet, Oracle, OracleError, Prediction};

/// Largest number of characters counted by one training work unit.
const UNIT_CHARS: usize = 1 << 16;

/// Character-level language model backed by n-gram counts of every order
/// from 1 up to `length + 1`.
///
/// This struct manages:
/// - `config`: alphabet, context window length and smoothing
/// - `ngrams`: a map from n-gram order to its corresponding `NGramModel`
///
/// Distributions back off from the longest known context to shorter ones,
/// then apply additive smoothing (see `State::distribution`).
#[derive(Clone, Debug, PartialEq)]
pub struct CharModel {
	config: ModelConfig,
	ngrams: HashMap<usize, NGramModel>,
}

/// Summary of a training run.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingReport {
	pub training_texts: usize,
	pub validation_texts: usize,
	/// Characters counted during this run.
	pub characters: usize,
	/// Perplexity on the validation texts, if there were any.
	pub validation_perplexity: Option<f64>,
}

/// Per-character probabilities of a text and their perplexity.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rating {
	pub perplexity: f64,
	pub ratings: Vec<(char, f64)>,
}

impl CharModel {
	/// Creates an untrained model.
	pub fn new(config: ModelConfig) -> Self {
		Self {
			config,
			ngrams: HashMap::new(),
		}
	}

	pub fn config(&self) -> &ModelConfig {
		&self.config
	}

	/// Changes the smoothing; counts are unaffected.
	///
	/// # Errors
	/// Returns an error if the value is negative or not finite.
	pub fn set_smoothing(&mut self, smoothing: f64) -> Result<(), String> {
		self.config.set_smoothing(smoothing)
	}

	/// Characters the model knows, in symbol order.
	pub fn charset(&self) -> &Alphabet {
		&self.config.alphabet
	}

	/// Loads a model from its weights (postcard) and config (JSON) files.
	///
	/// # Errors
	/// - I/O or decoding failures
	/// - `InvalidConfig` if the config breaks its invariants
	/// - `ConfigMismatch` if the weights hold orders the config cannot use
	pub fn load<PM, PC>(model_path: PM, config_path: PC) -> Result<Self, ModelError>
	where
		PM: AsRef<Path>,
		PC: AsRef<Path>,
	{
		let config_path = config_path.as_ref();
		let json = fs::read_to_string(config_path).map_err(|e| ModelError::io(config_path, e))?;
		let config: ModelConfig = serde_json::from_str(&json)?;
		config.validate().map_err(ModelError::InvalidConfig)?;

		let model_path = model_path.as_ref();
		let bytes = fs::read(model_path).map_err(|e| ModelError::io(model_path, e))?;
		let ngrams: HashMap<usize, NGramModel> = postcard::from_bytes(&bytes)?;
		for (order, table) in &ngrams {
			if *order != table.order() || *order > config.length() + 1 {
				return Err(ModelError::ConfigMismatch {
					order: table.order(),
					length: config.length(),
				});
			}
		}

		info!(
			"loaded model {} ({} characters, length {})",
			model_path.display(),
			config.alphabet.len(),
			config.length()
		);
		Ok(Self { config, ngrams })
	}

	/// Writes the weights (postcard) and config (JSON) files.
	///
	/// # Errors
	/// Returns an error on encoding or I/O failure.
	pub fn save<PM, PC>(&self, model_path: PM, config_path: PC) -> Result<(), ModelError>
	where
		PM: AsRef<Path>,
		PC: AsRef<Path>,
	{
		let config_path = config_path.as_ref();
		let json = serde_json::to_string_pretty(&self.config)?;
		fs::write(config_path, json).map_err(|e| ModelError::io(config_path, e))?;

		let model_path = model_path.as_ref();
		let bytes = postcard::to_stdvec(&self.ngrams)?;
		fs::write(model_path, bytes).map_err(|e| ModelError::io(model_path, e))?;

		info!("saved model to {} and {}", model_path.display(), config_path.display());
		Ok(())
	}

	/// Trains the model on `data`, on top of what it already knows.
	///
	/// When `val_data` is `None` and there are several texts, a random 10%
	/// of them (at least one) is held out for validation.
	///
	/// # Errors
	/// - `NoTrainingData` if every training text is empty
	pub fn train(&mut self, data: Vec<String>, val_data: Option<Vec<String>>) -> Result<TrainingReport, ModelError> {
		let data: Vec<String> = data.into_iter().filter(|text| !text.is_empty()).collect();
		if data.is_empty() {
			return Err(ModelError::NoTrainingData);
		}

		let (training, validation) = match val_data {
			Some(validation) => (data, validation),
			None => Self::split(data),
		};

		let characters = training.iter().map(|text| text.chars().count()).sum();
		let partial = Self::count_parallel(&training, self.config.length())?;
		for (order, table) in partial {
			match self.ngrams.get_mut(&order) {
				Some(existing) => existing.merge(&table).map_err(ModelError::InvalidConfig)?,
				None => {
					self.ngrams.insert(order, table);
				}
			}
		}
		let seen = Alphabet::new(training.iter().flat_map(|text| text.chars()));
		self.config.alphabet = self.config.alphabet.union(&seen);
		info!(
			"trained on {} texts ({characters} characters), alphabet now has {} characters",
			training.len(),
			self.config.alphabet.len()
		);

		let validation_perplexity = match self.test(&validation) {
			Ok(perplexity) => {
				info!("validation perplexity: {perplexity:.4}");
				Some(perplexity)
			}
			Err(ModelError::EmptyText) => None,
			Err(e) => return Err(e),
		};

		Ok(TrainingReport {
			training_texts: training.len(),
			validation_texts: validation.len(),
			characters,
			validation_perplexity,
		})
	}

	/// Randomly holds out a tenth of the texts for validation.
	fn split(mut data: Vec<String>) -> (Vec<String>, Vec<String>) {
		if data.len() < 2 {
			return (data, Vec::new());
		}
		data.shuffle(&mut rand::rng());
		let held_out = (data.len() / 10).max(1);
		let validation = data.split_off(data.len() - held_out);
		(data, validation)
	}

	/// Creates one empty table per order `1..=length + 1`.
	fn empty_tables(length: usize) -> Result<HashMap<usize, NGramModel>, ModelError> {
		(1..=length + 1)
			.map(|n| NGramModel::new(n).map(|table| (n, table)).map_err(ModelError::InvalidConfig))
			.collect()
	}

	/// Counts every text in parallel and merges the partial tables.
	///
	/// Texts are cut into units of at most `UNIT_CHARS` characters; each
	/// unit carries the `length` preceding characters as context so that
	/// counts do not depend on where the cuts fall.
	fn count_parallel(texts: &[String], length: usize) -> Result<HashMap<usize, NGramModel>, ModelError> {
		let mut units: Vec<(Vec<char>, usize)> = Vec::new();
		for text in texts {
			let chars: Vec<char> = text.chars().collect();
			let mut start = 0;
			while start < chars.len() {
				let end = (start + UNIT_CHARS).min(chars.len());
				let from = start.saturating_sub(length);
				units.push((chars[from..end].to_vec(), start - from));
				start = end;
			}
		}

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = units.len().div_ceil(chunks).max(1);
		debug!("counting {} units in chunks of {chunk_size}", units.len());

		let (tx, rx) = mpsc::channel();
		let mut spawned = 0;
		for chunk in units.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk = chunk.to_vec();
			let mut partial = Self::empty_tables(length)?;

			spawned += 1;
			thread::spawn(move || {
				for (chars, first) in chunk {
					for table in partial.values_mut() {
						table.add_text_from(&chars, first);
					}
				}
				if tx.send(partial).is_err() {
					warn!("training result dropped: receiver closed");
				}
			});
		}
		drop(tx);

		Self::merge_partials(rx, spawned, length)
	}

	/// Merges the partial tables of `expected` workers.
	///
	/// A worker that stops without sending its tables fails the whole
	/// training instead of silently losing its counts.
	fn merge_partials(
		rx: mpsc::Receiver<HashMap<usize, NGramModel>>,
		expected: usize,
		length: usize,
	) -> Result<HashMap<usize, NGramModel>, ModelError> {
		let mut merged = Self::empty_tables(length)?;
		let mut received = 0;
		for partial in rx.iter() {
			received += 1;
			for (order, table) in partial {
				if let Some(existing) = merged.get_mut(&order) {
					existing.merge(&table).map_err(ModelError::InvalidConfig)?;
				}
			}
		}
		if received != expected {
			return Err(ModelError::IncompleteTraining { expected, received });
		}
		Ok(merged)
	}

	/// Probability of every symbol following `window`.
	///
	/// Uses the longest suffix of the window that occurred in training,
	/// falling back to a uniform distribution for an untrained model.
	pub fn distribution(&self, window: &ContextWindow) -> Vec<f64> {
		let alphabet = &self.config.alphabet;
		let max_order = (window.len() + 1).min(self.config.length() + 1);
		for n in (1..=max_order).rev() {
			let state = self.ngrams.get(&n).and_then(|table| table.state(&window.suffix(n - 1)));
			if let Some(state) = state {
				return state.distribution(alphabet, self.config.smoothing());
			}
		}
		vec![1.0 / alphabet.dimension() as f64; alphabet.dimension()]
	}

	/// Probability of each character of `text` given the ones before it.
	///
	/// Characters outside the alphabet are rated as the unknown symbol.
	fn score(&self, text: &str) -> Vec<(char, f64)> {
		let mut window = ContextWindow::start();
		let mut ratings = Vec::with_capacity(text.len());
		for c in text.chars() {
			let distribution = self.distribution(&window);
			let symbol = self.config.alphabet.symbol_of(c).unwrap_or(Alphabet::UNKNOWN);
			ratings.push((c, distribution[symbol]));
			window = window.push(c, self.config.length());
		}
		ratings
	}

	/// Rates every character of `text` and the text's perplexity.
	///
	/// # Errors
	/// Returns `EmptyText` if `text` is empty.
	pub fn rate(&self, text: &str) -> Result<Rating, ModelError> {
		let ratings = self.score(text);
		let perplexity = perplexity(ratings.iter().map(|(_, p)| *p)).ok_or(ModelError::EmptyText)?;
		Ok(Rating { perplexity, ratings })
	}

	/// Overall perplexity of several texts, each rated from a fresh start.
	///
	/// # Errors
	/// Returns `EmptyText` if there is no character at all.
	pub fn test(&self, texts: &[String]) -> Result<f64, ModelError> {
		let probabilities = texts
			.iter()
			.flat_map(|text| self.score(text).into_iter().map(|(_, p)| p));
		perplexity(probabilities).ok_or(ModelError::EmptyText)
	}
}

/// `exp(-mean(ln p))`, or `None` for no probabilities.
fn perplexity<I: IntoIterator<Item = f64>>(probabilities: I) -> Option<f64> {
	let (count, log_sum) = probabilities
		.into_iter()
		.fold((0usize, 0.0f64), |(count, sum), p| (count + 1, sum + p.ln()));
	if count == 0 {
		return None;
	}
	Some((-log_sum / count as f64).exp())
}

impl Oracle for CharModel {
	type State = ContextWindow;

	fn alphabet(&self) -> &Alphabet {
		&self.config.alphabet
	}

	fn predict(
		&self,
		batch: &[(char, Option<&ContextWindow>)],
	) -> Result<Vec<Prediction<ContextWindow>>, OracleError> {
		let length = self.config.length();
		batch
			.iter()
			.map(|(c, state)| {
				let window = match state {
					Some(window) if window.len() > length => {
						return Err(OracleError::MalformedState(format!(
							"window of {} characters exceeds model length {length}",
							window.len()
						)));
					}
					Some(window) => window.push(*c, length),
					None => ContextWindow::start().push(*c, length),
				};
				Ok(Prediction {
					distribution: self.distribution(&window),
					state: window,
				})
			})
			.collect()
	}
}
