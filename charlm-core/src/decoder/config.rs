use std::time::Duration;

/// Default number of hypotheses kept after each step.
pub const DEFAULT_BEAM_WIDTH: usize = 256;

/// Default number of alternatives followed per hypothesis.
pub const DEFAULT_TOP_K: usize = 10;

/// Default probability floor: the uniform probability over 256 symbols.
pub const DEFAULT_MIN_PROBABILITY: f64 = 1.0 / 256.0;

/// Beam search parameters.
///
/// ## Invariants (checked by `validate`)
/// - `beam_width >= 1`
/// - `top_k >= 1`
/// - `min_probability` lies in `[0.0, 1.0]`
#[derive(Debug, Clone, PartialEq)]
pub struct BeamConfig {
	/// Number of hypotheses kept after each step.
	pub beam_width: usize,

	/// Number of highest-probability alternatives considered per hypothesis.
	pub top_k: usize,

	/// Alternatives less probable than this are pruned, even within the top-k.
	pub min_probability: f64,

	/// Optional wall-clock budget for a whole generation.
	///
	/// Checked before each step; `None` means unbounded.
	pub deadline: Option<Duration>,
}

impl Default for BeamConfig {
	fn default() -> Self {
		Self {
			beam_width: DEFAULT_BEAM_WIDTH,
			top_k: DEFAULT_TOP_K,
			min_probability: DEFAULT_MIN_PROBABILITY,
			deadline: None,
		}
	}
}

impl BeamConfig {
	/// Greedy decoding: a single hypothesis following the best alternative.
	pub fn greedy() -> Self {
		Self {
			beam_width: 1,
			top_k: 1,
			..Self::default()
		}
	}

	/// Checks the parameter ranges.
	///
	/// # Errors
	/// Returns a description of the first invalid parameter.
	pub fn validate(&self) -> Result<(), String> {
		if self.beam_width == 0 {
			return Err("beam width must be at least 1".to_owned());
		}
		if self.top_k == 0 {
			return Err("top-k must be at least 1".to_owned());
		}
		if !(0.0..=1.0).contains(&self.min_probability) {
			return Err(format!(
				"minimum probability must be between 0.0 and 1.0, got {}",
				self.min_probability
			));
		}
		Ok(())
	}
}
