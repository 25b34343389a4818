//! Beam-search decoding over a stateful character oracle.
//!
//! Starting from a seed hypothesis, each step queries the oracle once for
//! the whole frontier, expands every hypothesis with its most probable
//! continuations and keeps the globally best ones. Hypotheses share their
//! ancestors through an arena (`HypothesisTree`), which is compacted after
//! every step so that only the live frontier and its ancestry are retained.

/// Beam parameters and their defaults.
pub mod config;

/// Decoding failures.
pub mod error;

/// Ranked frontier and per-generation candidate pool.
pub mod frontier;

/// Hypothesis nodes and the arena that owns them.
pub mod node;

/// The step loop.
pub mod search;

pub use config::BeamConfig;
pub use error::DecodeError;
pub use frontier::Frontier;
pub use node::{HypothesisTree, Node, NodeId};
pub use search::{BeamSearch, Decoded};
