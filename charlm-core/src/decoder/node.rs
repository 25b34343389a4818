/// Stable handle of a node inside a `HypothesisTree`.
///
/// Handles are only valid for the tree that produced them, and only until
/// the next `sweep`, which hands out remapped handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// One partial decoded sequence: the last character appended and the
/// link to the hypothesis it extends.
///
/// Nodes are immutable once inserted into the tree.
#[derive(Clone, Debug)]
pub struct Node<S> {
	character: char,
	local_cost: f64,
	cumulative_cost: f64,
	parent: Option<NodeId>,
	/// Oracle state to feed together with `character`.
	state: Option<S>,
}

impl<S> Node<S> {
	pub fn character(&self) -> char {
		self.character
	}

	/// Negative log-probability of `character` given the parent.
	pub fn local_cost(&self) -> f64 {
		self.local_cost
	}

	/// Sum of local costs from the root to this node.
	pub fn cumulative_cost(&self) -> f64 {
		self.cumulative_cost
	}

	pub fn parent(&self) -> Option<NodeId> {
		self.parent
	}

	/// `None` only for a root seeded without warm-up.
	pub fn state(&self) -> Option<&S> {
		self.state.as_ref()
	}
}

/// Arena of hypothesis nodes linked child → parent.
///
/// Many leaves share ancestor chains, so nodes are stored once and
/// addressed by index. Parents are always inserted before their children,
/// which keeps the arena topologically ordered.
///
/// ## Invariants
/// - A node's parent index is lower than its own
/// - `cumulative_cost` is the parent's cumulative cost plus `local_cost`
#[derive(Clone, Debug)]
pub struct HypothesisTree<S> {
	nodes: Vec<Node<S>>,
}

impl<S> Default for HypothesisTree<S> {
	fn default() -> Self {
		Self { nodes: Vec::new() }
	}
}

impl<S> HypothesisTree<S> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of nodes currently stored.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Inserts a root node (no parent, zero cost).
	pub fn insert_root(&mut self, character: char, state: Option<S>) -> NodeId {
		self.nodes.push(Node {
			character,
			local_cost: 0.0,
			cumulative_cost: 0.0,
			parent: None,
			state,
		});
		NodeId(self.nodes.len() - 1)
	}

	/// Inserts a node extending `parent` by `character`.
	///
	/// # Panics
	/// Panics if `parent` is not a handle of this tree.
	pub fn insert_child(&mut self, parent: NodeId, character: char, local_cost: f64, state: S) -> NodeId {
		let cumulative_cost = self.nodes[parent.0].cumulative_cost + local_cost;
		self.nodes.push(Node {
			character,
			local_cost,
			cumulative_cost,
			parent: Some(parent),
			state: Some(state),
		});
		NodeId(self.nodes.len() - 1)
	}

	/// Returns the node behind a handle.
	///
	/// # Panics
	/// Panics if `id` is not a handle of this tree.
	pub fn get(&self, id: NodeId) -> &Node<S> {
		&self.nodes[id.0]
	}

	/// Walks from `id` up to the root, `id` first.
	pub fn ancestors(&self, id: NodeId) -> Ancestors<'_, S> {
		Ancestors { tree: self, next: Some(id) }
	}

	/// Characters from the root to `id` inclusive, in emission order.
	pub fn to_sequence(&self, id: NodeId) -> Vec<char> {
		let mut sequence: Vec<char> = self.ancestors(id).map(Node::character).collect();
		sequence.reverse();
		sequence
	}

	/// Drops every node that is neither in `live` nor an ancestor of one.
	///
	/// Surviving nodes keep their relative order; the handles in `live` are
	/// rewritten in place to point at the compacted arena.
	pub fn sweep(&mut self, live: &mut [NodeId]) {
		let mut reachable = vec![false; self.nodes.len()];
		for id in live.iter() {
			let mut cursor = Some(*id);
			while let Some(current) = cursor {
				if reachable[current.0] {
					break;
				}
				reachable[current.0] = true;
				cursor = self.nodes[current.0].parent;
			}
		}

		let mut remap: Vec<Option<usize>> = vec![None; self.nodes.len()];
		let mut kept = 0;
		for (index, keep) in reachable.iter().enumerate() {
			if *keep {
				remap[index] = Some(kept);
				kept += 1;
			}
		}
		if kept == self.nodes.len() {
			return;
		}

		let nodes = std::mem::take(&mut self.nodes);
		self.nodes = nodes
			.into_iter()
			.zip(reachable)
			.filter_map(|(mut node, keep)| {
				if !keep {
					return None;
				}
				// Parents of reachable nodes are reachable too.
				node.parent = node.parent.and_then(|p| remap[p.0]).map(NodeId);
				Some(node)
			})
			.collect();

		for id in live.iter_mut() {
			if let Some(index) = remap[id.0] {
				*id = NodeId(index);
			}
		}
	}
}

/// Iterator over a node and its ancestors, see `HypothesisTree::ancestors`.
pub struct Ancestors<'a, S> {
	tree: &'a HypothesisTree<S>,
	next: Option<NodeId>,
}

impl<'a, S> Iterator for Ancestors<'a, S> {
	type Item = &'a Node<S>;

	fn next(&mut self) -> Option<Self::Item> {
		let node = self.tree.get(self.next?);
		self.next = node.parent;
		Some(node)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chain(tree: &mut HypothesisTree<()>, root: NodeId, steps: &[(char, f64)]) -> NodeId {
		steps.iter().fold(root, |parent, (c, cost)| tree.insert_child(parent, *c, *cost, ()))
	}

	#[test]
	fn cumulative_cost_is_sum_of_local_costs() {
		let mut tree = HypothesisTree::new();
		let root = tree.insert_root('a', None);
		let leaf = chain(&mut tree, root, &[('b', 0.5), ('c', 0.25), ('d', 1.0)]);

		let sum: f64 = tree.ancestors(leaf).map(Node::local_cost).sum();
		assert!((tree.get(leaf).cumulative_cost() - sum).abs() < 1e-12);
		assert!((sum - 1.75).abs() < 1e-12);

		let costs: Vec<f64> = tree.ancestors(leaf).map(Node::cumulative_cost).collect();
		assert!(costs.windows(2).all(|w| w[0] >= w[1]));
		assert_eq!(tree.get(root).cumulative_cost(), 0.0);
	}

	#[test]
	fn to_sequence_is_in_emission_order_and_restartable() {
		let mut tree = HypothesisTree::new();
		let root = tree.insert_root('h', None);
		let leaf = chain(&mut tree, root, &[('e', 0.1), ('y', 0.1)]);

		assert_eq!(tree.to_sequence(leaf), vec!['h', 'e', 'y']);
		assert_eq!(tree.to_sequence(leaf), vec!['h', 'e', 'y']);
		assert_eq!(tree.to_sequence(root), vec!['h']);
	}

	#[test]
	fn sweep_keeps_live_nodes_and_shared_ancestors() {
		let mut tree = HypothesisTree::new();
		let root = tree.insert_root('r', None);
		let shared = tree.insert_child(root, 's', 0.1, ());
		let dead = tree.insert_child(root, 'x', 0.2, ());
		let left = tree.insert_child(shared, 'l', 0.3, ());
		let right = tree.insert_child(shared, 'k', 0.4, ());
		let _dead_leaf = tree.insert_child(dead, 'y', 0.5, ());
		assert_eq!(tree.len(), 6);

		let mut live = [right, left];
		tree.sweep(&mut live);

		assert_eq!(tree.len(), 4);
		assert_eq!(tree.to_sequence(live[0]), vec!['r', 's', 'k']);
		assert_eq!(tree.to_sequence(live[1]), vec!['r', 's', 'l']);
		assert!((tree.get(live[0]).cumulative_cost() - 0.5).abs() < 1e-12);
	}

	#[test]
	fn sweep_without_garbage_is_a_no_op() {
		let mut tree = HypothesisTree::new();
		let root = tree.insert_root('r', None);
		let leaf = tree.insert_child(root, 'a', 0.1, ());
		let mut live = [leaf];
		tree.sweep(&mut live);
		assert_eq!(live[0], leaf);
		assert_eq!(tree.len(), 2);
	}
}
