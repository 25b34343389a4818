mod common;

use std::time::Duration;

use charlm_core::decoder::{BeamConfig, BeamSearch, DecodeError};
use charlm_core::{Alphabet, Oracle, OracleError};
use common::{BrokenOracle, TableOracle};

const A_OR_B: [f64; 3] = [0.0, 0.9, 0.1];

#[test]
fn always_follows_the_most_probable_character() {
	let oracle = TableOracle::constant("ab", &A_OR_B);
	let search = BeamSearch::new(&oracle, BeamConfig::default());
	assert_eq!(search.generate("a", 3).unwrap(), "aaaa");
}

#[test]
fn output_length_is_context_plus_steps() {
	let oracle = TableOracle::constant("ab", &[0.0, 0.5, 0.5]);
	let search = BeamSearch::new(&oracle, BeamConfig::default());
	for (context, steps) in [("a", 1), ("ab", 4), ("bbbbb", 2), ("é", 3)] {
		let output = search.generate(context, steps).unwrap();
		assert_eq!(
			output.chars().count(),
			context.chars().count() + steps,
			"context {context:?}, {steps} steps gave {output:?}"
		);
		assert!(output.starts_with(context));
	}
}

#[test]
fn symbols_below_the_floor_are_never_candidates() {
	// 'b' is in the top-k but below 1/256
	let oracle = TableOracle::constant("ab", &[0.0, 0.999, 0.001]);
	let search = BeamSearch::new(&oracle, BeamConfig::default());
	let decoded = search.search("b", 3).unwrap();
	assert_eq!(decoded.text, "baaa");
	assert_eq!(decoded.frontier_sizes, vec![1, 1, 1]);
}

#[test]
fn unmapped_symbols_are_skipped() {
	// the unknown symbol is the most probable one
	let oracle = TableOracle::constant("ab", &[0.6, 0.3, 0.1]);
	let search = BeamSearch::new(&oracle, BeamConfig::default());
	let decoded = search.search("a", 2).unwrap();
	assert_eq!(decoded.text, "aaa");
	assert_eq!(decoded.frontier_sizes, vec![2, 4]);
}

#[test]
fn fails_when_every_candidate_is_pruned() {
	let oracle = TableOracle::constant("ab", &[1.0, 0.0, 0.0]);
	let search = BeamSearch::new(&oracle, BeamConfig::default());
	assert_eq!(search.generate("ab", 5), Err(DecodeError::BeamExhausted { step: 0 }));

	// dead end reached only after one step
	let oracle = TableOracle::constant("ab", &[0.0, 1.0, 0.0]).after('a', &[1.0, 0.0, 0.0]);
	let search = BeamSearch::new(&oracle, BeamConfig::default());
	assert_eq!(search.generate("b", 3), Err(DecodeError::BeamExhausted { step: 1 }));
}

/// Oracle where the locally best first step leads to a worse sequence:
/// greedy picks "xac" (0.6 * 0.5), the beam finds "xbc" (0.4 * 0.95).
fn garden_path() -> TableOracle {
	TableOracle::constant("abcdx", &[0.0, 0.2, 0.2, 0.2, 0.2, 0.2])
		.after('x', &[0.0, 0.6, 0.4, 0.0, 0.0, 0.0])
		.after('a', &[0.0, 0.0, 0.0, 0.5, 0.5, 0.0])
		.after('b', &[0.0, 0.0, 0.0, 0.95, 0.05, 0.0])
}

/// Reference greedy decoder: argmax at every step, lower symbol on ties.
fn greedy(oracle: &TableOracle, context: &str, steps: usize) -> String {
	let mut output = context.to_owned();
	let mut last = context.chars().last().unwrap();
	for _ in 0..steps {
		let distribution = oracle.distribution_after(last);
		let mut best = 0;
		for (symbol, p) in distribution.iter().enumerate() {
			if oracle.alphabet().char_at(symbol).is_some()
				&& (oracle.alphabet().char_at(best).is_none() || *p > distribution[best])
			{
				best = symbol;
			}
		}
		last = oracle.alphabet().char_at(best).unwrap();
		output.push(last);
	}
	output
}

#[test]
fn beam_width_one_is_greedy_decoding() {
	let oracle = garden_path();
	let config = BeamConfig { beam_width: 1, ..BeamConfig::default() };
	let search = BeamSearch::new(&oracle, config);
	for steps in 1..=4 {
		assert_eq!(search.generate("x", steps).unwrap(), greedy(&oracle, "x", steps));
	}
	assert_eq!(search.generate("x", 2).unwrap(), "xac");
}

#[test]
fn wide_beam_recovers_from_a_locally_worse_choice() {
	let oracle = garden_path();
	let search = BeamSearch::new(&oracle, BeamConfig::default());
	let decoded = search.search("x", 2).unwrap();
	assert_eq!(decoded.text, "xbc");
	assert!((decoded.cost - -(0.4f64 * 0.95).ln()).abs() < 1e-9);
}

#[test]
fn greedy_preset_matches_width_one() {
	let oracle = garden_path();
	let greedy_search = BeamSearch::new(&oracle, BeamConfig::greedy());
	assert_eq!(greedy_search.generate("x", 3).unwrap(), greedy(&oracle, "x", 3));
}

#[test]
fn single_character_context_skips_warm_up() {
	let oracle = TableOracle::constant("ab", &A_OR_B);
	let search = BeamSearch::new(&oracle, BeamConfig::default());
	search.generate("b", 2).unwrap();

	let calls = oracle.calls();
	assert_eq!(calls.len(), 2, "one call per step, no warm-up");
	assert_eq!(calls[0], vec![('b', None)]);
}

#[test]
fn warm_up_feeds_all_but_last_character() {
	let oracle = TableOracle::constant("abc", &[0.0, 0.8, 0.1, 0.1]);
	let search = BeamSearch::new(&oracle, BeamConfig::default());
	search.generate("abc", 1).unwrap();

	let calls = oracle.calls();
	assert_eq!(calls.len(), 3);
	assert_eq!(calls[0], vec![('a', None)]);
	assert_eq!(calls[1], vec![('b', Some("a".to_owned()))]);
	assert_eq!(calls[2], vec![('c', Some("ab".to_owned()))]);
}

#[test]
fn frontier_never_exceeds_beam_width() {
	let oracle = TableOracle::constant("abcd", &[0.0, 0.25, 0.25, 0.25, 0.25]);
	let config = BeamConfig { beam_width: 3, ..BeamConfig::default() };
	let search = BeamSearch::new(&oracle, config);
	let decoded = search.search("a", 6).unwrap();
	assert_eq!(decoded.frontier_sizes, vec![3; 6]);

	// one batched call per step, sized by the previous frontier
	let calls = oracle.calls();
	let sizes: Vec<usize> = calls.iter().map(Vec::len).collect();
	assert_eq!(sizes, vec![1, 3, 3, 3, 3, 3]);
}

#[test]
fn generated_characters_belong_to_the_alphabet() {
	let oracle = TableOracle::constant("xyz", &[0.1, 0.3, 0.3, 0.3]);
	let search = BeamSearch::new(&oracle, BeamConfig::default());
	let output = search.generate("q", 5).unwrap();
	let alphabet = Alphabet::new("xyz".chars());
	assert!(output.chars().skip(1).all(|c| alphabet.contains(c)), "{output}");
}

#[test]
fn equal_costs_resolve_to_the_earliest_candidate() {
	let oracle = TableOracle::constant("ab", &[0.0, 0.5, 0.5]);
	let search = BeamSearch::new(&oracle, BeamConfig::default());
	let first = search.generate("b", 4).unwrap();
	let second = search.generate("b", 4).unwrap();
	assert_eq!(first, "baaaa");
	assert_eq!(first, second);
}

#[test]
fn invalid_parameters_are_rejected_before_any_oracle_call() {
	let oracle = TableOracle::constant("ab", &A_OR_B);

	let search = BeamSearch::new(&oracle, BeamConfig::default());
	assert_eq!(search.generate("", 3), Err(DecodeError::EmptyContext));
	assert_eq!(search.generate("ab", 0), Err(DecodeError::NoSteps));

	let zero_width = BeamSearch::new(&oracle, BeamConfig { beam_width: 0, ..BeamConfig::default() });
	assert!(matches!(zero_width.generate("ab", 3), Err(DecodeError::InvalidConfig(_))));

	assert!(oracle.calls().is_empty());
}

#[test]
fn oracle_failures_propagate() {
	let search = BeamSearch::new(BrokenOracle::Failing(Alphabet::new("ab".chars())), BeamConfig::default());
	assert_eq!(
		search.generate("ab", 2),
		Err(DecodeError::Oracle(OracleError::MalformedState("corrupted".to_owned())))
	);
}

#[test]
fn short_batches_are_reported() {
	let search = BeamSearch::new(BrokenOracle::Short(Alphabet::new("ab".chars())), BeamConfig::default());
	assert_eq!(
		search.generate("a", 2),
		Err(DecodeError::Oracle(OracleError::BatchMismatch { expected: 1, actual: 0 }))
	);
}

#[test]
fn deadline_bounds_the_generation() {
	let oracle = TableOracle::constant("ab", &A_OR_B).slow(Duration::from_millis(20));
	let config = BeamConfig {
		deadline: Some(Duration::from_millis(5)),
		..BeamConfig::default()
	};
	let search = BeamSearch::new(&oracle, config);
	assert!(matches!(
		search.generate("a", 10),
		Err(DecodeError::DeadlineExceeded { step }) if step >= 1
	));
	assert!(oracle.calls().len() < 10);
}

#[test]
fn huge_top_k_is_bounded_by_the_alphabet() {
	let oracle = TableOracle::constant("ab", &A_OR_B);
	let config = BeamConfig {
		top_k: 1 << 40,
		..BeamConfig::default()
	};
	let search = BeamSearch::new(&oracle, config);
	assert_eq!(search.generate("a", 3).unwrap(), "aaaa");
}

#[test]
fn huge_step_count_stops_at_the_deadline() {
	let oracle = TableOracle::constant("ab", &A_OR_B).slow(Duration::from_millis(2));
	let config = BeamConfig {
		deadline: Some(Duration::from_millis(10)),
		..BeamConfig::default()
	};
	let search = BeamSearch::new(&oracle, config);
	assert!(matches!(
		search.generate("a", usize::MAX),
		Err(DecodeError::DeadlineExceeded { .. })
	));
}
