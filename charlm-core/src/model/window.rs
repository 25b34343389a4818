use std::collections::VecDeque;

/// Recurrent state of a `CharModel`: the last characters consumed.
///
/// Bounded by the model's context length; the oldest character is
/// dropped when a new one is pushed onto a full window.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContextWindow {
	chars: VecDeque<char>,
}

impl ContextWindow {
	/// Window of a sequence start (nothing consumed yet).
	pub fn start() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.chars.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chars.is_empty()
	}

	/// Returns the window after consuming `c`, keeping at most `length` characters.
	pub fn push(&self, c: char, length: usize) -> Self {
		let mut chars = self.chars.clone();
		chars.push_back(c);
		while chars.len() > length {
			chars.pop_front();
		}
		Self { chars }
	}

	/// The last `n` characters (all of them if the window is shorter).
	pub fn suffix(&self, n: usize) -> String {
		let skip = self.chars.len().saturating_sub(n);
		self.chars.iter().skip(skip).collect()
	}
}
