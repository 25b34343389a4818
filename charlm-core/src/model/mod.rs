//! Character n-gram language model, the concrete oracle of this crate.
//!
//! This module provides:
//! - Fixed-order transition tables (`NGramModel`) built from `State`s
//! - A backoff model over all orders up to the context length (`CharModel`)
//! - The model's recurrent state (`ContextWindow`)
//! - Its persisted configuration (`ModelConfig`)

/// Backoff model combining one `NGramModel` per order.
///
/// Supports parallel training, rating, perplexity, persistence,
/// and implements `Oracle` for the beam-search decoder.
pub mod char_model;

/// Persisted model configuration.
pub mod config;

/// Training, rating and persistence failures.
pub mod error;

/// Fixed-order n-gram transition table (`n >= 1`).
pub mod ngram_model;

/// Internal representation of a single n-gram context.
///
/// Tracks outgoing transitions and turns them into distributions.
mod state;

/// Sliding window of the last characters consumed.
pub mod window;

pub use char_model::{CharModel, Rating, TrainingReport};
pub use config::ModelConfig;
pub use error::ModelError;
pub use window::ContextWindow;
