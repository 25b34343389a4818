use std::cmp::Ordering;

use super::node::NodeId;

/// The live hypotheses of one generation, best (lowest cost) first.
///
/// ## Invariants
/// - Sorted ascending by cumulative cost, ties by insertion order
/// - Never longer than the beam width it was built with
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frontier {
	entries: Vec<NodeId>,
}

impl Frontier {
	/// A frontier holding only the root hypothesis.
	pub fn seed(root: NodeId) -> Self {
		Self { entries: vec![root] }
	}

	/// Wraps entries that are already in rank order.
	pub(crate) fn from_ranked(entries: Vec<NodeId>) -> Self {
		Self { entries }
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Lowest-cost hypothesis.
	pub fn best(&self) -> Option<NodeId> {
		self.entries.first().copied()
	}

	pub fn entries(&self) -> &[NodeId] {
		&self.entries
	}

	/// Mutable access for handle remapping after an arena sweep.
	pub(crate) fn entries_mut(&mut self) -> &mut [NodeId] {
		&mut self.entries
	}
}

/// A prospective child hypothesis, not yet materialized as a node.
#[derive(Clone, Debug)]
pub struct Candidate {
	/// Position of the parent in the current frontier.
	pub slot: usize,
	pub parent: NodeId,
	pub character: char,
	pub local_cost: f64,
	pub cumulative_cost: f64,
	/// Global insertion number within the generation, used as tie-break.
	pub sequence: u64,
}

impl PartialEq for Candidate {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

/// Lower cumulative cost ranks first; on equal cost the earliest inserted wins.
impl Ord for Candidate {
	fn cmp(&self, other: &Self) -> Ordering {
		self.cumulative_cost
			.total_cmp(&other.cumulative_cost)
			.then(self.sequence.cmp(&other.sequence))
	}
}

/// All candidates of one generation, across every frontier hypothesis.
#[derive(Debug, Default)]
pub struct CandidatePool {
	candidates: Vec<Candidate>,
	next_sequence: u64,
}

impl CandidatePool {
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			candidates: Vec::with_capacity(capacity),
			next_sequence: 0,
		}
	}

	/// Adds a candidate, stamping it with the next insertion number.
	pub fn push(&mut self, slot: usize, parent: NodeId, character: char, local_cost: f64, parent_cost: f64) {
		self.candidates.push(Candidate {
			slot,
			parent,
			character,
			local_cost,
			cumulative_cost: parent_cost + local_cost,
			sequence: self.next_sequence,
		});
		self.next_sequence += 1;
	}

	pub fn len(&self) -> usize {
		self.candidates.len()
	}

	pub fn is_empty(&self) -> bool {
		self.candidates.is_empty()
	}

	/// Keeps the `width` best candidates, sorted best first.
	///
	/// Selects the cut with a partial sort, then sorts only the kept prefix.
	pub fn into_best(mut self, width: usize) -> Vec<Candidate> {
		if width == 0 {
			return Vec::new();
		}
		if self.candidates.len() > width {
			self.candidates.select_nth_unstable(width - 1);
			self.candidates.truncate(width);
		}
		self.candidates.sort_unstable();
		self.candidates
	}
}
