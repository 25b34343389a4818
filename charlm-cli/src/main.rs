use std::error::Error;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::{info, warn};

use charlm_core::decoder::config::{DEFAULT_BEAM_WIDTH, DEFAULT_MIN_PROBABILITY, DEFAULT_TOP_K};
use charlm_core::decoder::{BeamConfig, BeamSearch};
use charlm_core::io::{list_files, read_texts};
use charlm_core::model::{CharModel, ModelConfig};

#[derive(Parser, Debug)]
#[command(name = "charlm", about = "Rate or generate text with a character-level language model")]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Train a language model from DATA files.
	///
	/// The files are randomly split into training and validation data,
	/// unless VAL_DATA is given. An existing model with the same length is
	/// trained incrementally.
	Train {
		/// Model weights file
		#[arg(short, long, default_value = "model.weights.bin")]
		model: PathBuf,
		/// Model config file
		#[arg(short, long, default_value = "model.config.json")]
		config: PathBuf,
		/// Number of previous characters seen (window size)
		#[arg(short, long, default_value_t = 6)]
		length: usize,
		/// Pseudo-occurrences added to every character
		#[arg(short, long, default_value_t = 0.01)]
		smoothing: f64,
		/// Directory containing validation data files (no split)
		#[arg(short, long)]
		val_data: Option<PathBuf>,
		#[arg(required = true)]
		data: Vec<PathBuf>,
	},
	/// Rate every character of TEXT ('-' reads standard input).
	Apply {
		#[arg(short, long)]
		model: PathBuf,
		#[arg(short, long)]
		config: PathBuf,
		text: String,
	},
	/// Compute the overall perplexity of DATA files.
	Test {
		#[arg(short, long)]
		model: PathBuf,
		#[arg(short, long)]
		config: PathBuf,
		#[arg(required = true)]
		data: Vec<PathBuf>,
	},
	/// Generate the most probable characters following CONTEXT.
	Generate {
		#[arg(short, long)]
		model: PathBuf,
		#[arg(short, long)]
		config: PathBuf,
		/// Number of characters to generate
		#[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=10000))]
		number: u16,
		#[arg(long, default_value_t = DEFAULT_BEAM_WIDTH)]
		beam_width: usize,
		#[arg(long, default_value_t = DEFAULT_TOP_K)]
		top_k: usize,
		#[arg(long, default_value_t = DEFAULT_MIN_PROBABILITY)]
		min_probability: f64,
		context: String,
	},
	/// Print the characters known to the model.
	PrintCharset {
		#[arg(short, long)]
		model: PathBuf,
		#[arg(short, long)]
		config: PathBuf,
	},
}

fn main() -> Result<(), Box<dyn Error>> {
	env_logger::init();

	match Cli::parse().command {
		Command::Train { model, config, length, smoothing, val_data, data } => {
			train(&model, &config, length, smoothing, val_data.as_deref(), &data)
		}
		Command::Apply { model, config, text } => apply(&model, &config, text),
		Command::Test { model, config, data } => {
			let rater = CharModel::load(&model, &config)?;
			println!("{}", rater.test(&read_texts(&data)?)?);
			Ok(())
		}
		Command::Generate { model, config, number, beam_width, top_k, min_probability, context } => {
			let rater = CharModel::load(&model, &config)?;
			let beam = BeamConfig {
				beam_width,
				top_k,
				min_probability,
				..BeamConfig::default()
			};
			let search = BeamSearch::new(&rater, beam);
			println!("{}", search.generate(&context, usize::from(number))?);
			Ok(())
		}
		Command::PrintCharset { model, config } => {
			let rater = CharModel::load(&model, &config)?;
			for (i, c) in rater.charset().chars().iter().enumerate() {
				println!("{}\t{}", i + 1, c.escape_debug());
			}
			Ok(())
		}
	}
}

/// Trains a new model, or continues training the existing one.
fn train(
	model: &Path,
	config: &Path,
	length: usize,
	smoothing: f64,
	val_data: Option<&Path>,
	data: &[PathBuf],
) -> Result<(), Box<dyn Error>> {
	let mut rater = starting_model(model, config, length, smoothing)?;

	let val_texts = match val_data {
		Some(dir) => Some(read_texts(&list_files(dir)?)?),
		None => None,
	};
	let report = rater.train(read_texts(data)?, val_texts)?;
	if let Some(perplexity) = report.validation_perplexity {
		println!("validation perplexity: {perplexity}");
	}

	rater.save(model, config)?;
	Ok(())
}

/// Loads the model to train incrementally, or creates a fresh one.
///
/// An existing model is loaded whenever both of its files exist, and any
/// failure to read it is reported rather than overwritten.
fn starting_model(model: &Path, config: &Path, length: usize, smoothing: f64) -> Result<CharModel, Box<dyn Error>> {
	if model.exists() && config.exists() {
		let mut existing = CharModel::load(model, config)?;
		if existing.config().length() == length {
			info!("loading weights for incremental training");
			existing.set_smoothing(smoothing)?;
			return Ok(existing);
		}
		warn!(
			"existing model has length {}, training a new model of length {length}",
			existing.config().length()
		);
	}
	Ok(CharModel::new(ModelConfig::new(length, smoothing)?))
}

/// Prints the perplexity of TEXT, then its per-character ratings as JSON.
fn apply(model: &Path, config: &Path, mut text: String) -> Result<(), Box<dyn Error>> {
	let rater = CharModel::load(model, config)?;
	if text == "-" {
		text.clear();
		std::io::stdin().read_to_string(&mut text)?;
	}

	let rating = rater.rate(&text)?;
	println!("{}", rating.perplexity);
	println!("{}", serde_json::to_string(&rating.ratings)?);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn saved(dir: &Path, length: usize) -> (PathBuf, PathBuf) {
		let model = dir.join("model.bin");
		let config = dir.join("model.json");
		let mut rater = CharModel::new(ModelConfig::new(length, 0.01).unwrap());
		rater.train(vec!["abcabc".to_owned()], Some(Vec::new())).unwrap();
		rater.save(&model, &config).unwrap();
		(model, config)
	}

	#[test]
	fn fresh_model_when_nothing_is_saved() {
		let dir = tempfile::tempdir().unwrap();
		let rater = starting_model(&dir.path().join("m.bin"), &dir.path().join("m.json"), 3, 0.5).unwrap();
		assert_eq!(rater.config().length(), 3);
		assert!(rater.charset().is_empty());
	}

	#[test]
	fn continues_from_a_saved_model_of_the_same_length() {
		let dir = tempfile::tempdir().unwrap();
		let (model, config) = saved(dir.path(), 2);
		let rater = starting_model(&model, &config, 2, 0.5).unwrap();
		assert_eq!(rater.charset().len(), 3);
		assert_eq!(rater.config().smoothing(), 0.5);
	}

	#[test]
	fn other_length_starts_over() {
		let dir = tempfile::tempdir().unwrap();
		let (model, config) = saved(dir.path(), 2);
		let rater = starting_model(&model, &config, 4, 0.01).unwrap();
		assert_eq!(rater.config().length(), 4);
		assert!(rater.charset().is_empty());
	}

	#[test]
	fn corrupt_weights_are_reported() {
		let dir = tempfile::tempdir().unwrap();
		let (model, config) = saved(dir.path(), 2);
		std::fs::write(&model, b"CORRUPT").unwrap();
		assert!(starting_model(&model, &config, 2, 0.01).is_err());
		assert_eq!(std::fs::read(&model).unwrap(), b"CORRUPT");
	}
}
