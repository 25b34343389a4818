//! Character-level sequence rating and generation.
//!
//! This crate provides:
//! - An `Oracle` contract for stateful character predictors
//! - Beam-search decoding of the most probable continuation of a context
//! - A character n-gram model implementing the oracle, with training,
//!   rating, perplexity and persistence
//! - I/O helpers for reading training data

/// Beam-search decoder (hypothesis tree, frontier, step loop).
pub mod decoder;

/// I/O utilities (text loading, directory listing).
pub mod io;

/// Character n-gram model and its configuration.
pub mod model;

/// Contract between the decoder and a character-prediction oracle.
pub mod oracle;

pub use decoder::{BeamConfig, BeamSearch, DecodeError};
pub use model::{CharModel, ModelConfig, ModelError};
pub use oracle::{Alphabet, Oracle, OracleError, Prediction};
