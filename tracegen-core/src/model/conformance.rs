use std::collections::{HashMap, HashSet};

use crate::model::corpus::{Corpus, Symbol};

/// Directly-follows frequency table of one corpus: ordered adjacent
/// symbol pairs mapped to their occurrence counts. Derived once per
/// corpus and read-only afterwards.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DirectlyFollows {
	counts: HashMap<(Symbol, Symbol), u64>,
	total: u64,
}

impl DirectlyFollows {
	pub fn from_corpus(corpus: &Corpus) -> Self {
		let mut table = Self::default();
		for sequence in corpus {
			for pair in sequence.windows(2) {
				*table.counts.entry((pair[0], pair[1])).or_insert(0) += 1;
				table.total += 1;
			}
		}
		table
	}

	pub fn count(&self, first: Symbol, second: Symbol) -> u64 {
		self.counts.get(&(first, second)).copied().unwrap_or(0)
	}

	/// Relative frequency of one ordered pair; zero for an empty table.
	pub fn probability(&self, first: Symbol, second: Symbol) -> f64 {
		if self.total == 0 {
			return 0.0;
		}
		self.count(first, second) as f64 / self.total as f64
	}

	pub fn pairs(&self) -> impl Iterator<Item = (Symbol, Symbol)> + '_ {
		self.counts.keys().copied()
	}
}

/// CFLD-style conformance distance between two corpora.
///
/// Each directly-follows table is normalized to a probability
/// distribution over the union of both corpora's observed pairs (missing
/// pairs count as zero) and the distributions are compared with the L1
/// norm. Symmetric in its inputs; zero exactly when the two normalized
/// distributions coincide. Neither corpus is mutated.
pub fn cfld_distance(left: &Corpus, right: &Corpus) -> f64 {
	let left_table = DirectlyFollows::from_corpus(left);
	let right_table = DirectlyFollows::from_corpus(right);

	let pairs: HashSet<(Symbol, Symbol)> =
		left_table.pairs().chain(right_table.pairs()).collect();

	pairs
		.into_iter()
		.map(|(first, second)| {
			(left_table.probability(first, second) - right_table.probability(first, second)).abs()
		})
		.sum()
}

/// Which population of sequences an entropy measure ranges over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntropyView {
	/// Whole traces as they stand.
	Traces,
	/// Every non-empty prefix of every trace.
	Prefixes,
}

/// Base-10 Shannon entropy of the flattened symbol distribution.
///
/// Under `EntropyView::Prefixes` the symbol at position `i` of a trace
/// of length `len` is counted once per prefix containing it, i.e. with
/// weight `len - i`, which is equivalent to flattening all prefixes
/// without materializing them.
pub fn symbol_entropy(corpus: &Corpus, view: EntropyView) -> f64 {
	let mut counts: HashMap<Symbol, u64> = HashMap::new();
	let mut total = 0u64;

	for sequence in corpus {
		let len = sequence.len() as u64;
		for (position, &symbol) in sequence.iter().enumerate() {
			let weight = match view {
				EntropyView::Traces => 1,
				EntropyView::Prefixes => len - position as u64,
			};
			*counts.entry(symbol).or_insert(0) += weight;
			total += weight;
		}
	}

	if total == 0 {
		return 0.0;
	}

	counts
		.values()
		.map(|&count| {
			let p = count as f64 / total as f64;
			-p * p.log10()
		})
		.sum()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::corpus::CorpusModel;

	fn encoded(corpus: &[&[&str]]) -> (CorpusModel, Corpus) {
		let raw: Vec<Vec<String>> = corpus
			.iter()
			.map(|seq| seq.iter().map(|s| s.to_string()).collect())
			.collect();
		let model = CorpusModel::new(&raw).unwrap();
		let sequences = model.sequences().clone();
		(model, sequences)
	}

	#[test]
	fn directly_follows_counts_adjacent_pairs() {
		let (model, corpus) = encoded(&[&["a", "b", "a", "b"], &["a", "b"]]);
		let a = model.alphabet().lookup("a").unwrap();
		let b = model.alphabet().lookup("b").unwrap();

		let table = DirectlyFollows::from_corpus(&corpus);
		assert_eq!(table.count(a, b), 3);
		assert_eq!(table.count(b, a), 1);
		assert_eq!(table.count(b, b), 0);
	}

	#[test]
	fn distance_is_zero_on_identical_corpora() {
		let (_, corpus) = encoded(&[&["a", "b", "c"], &["a", "c", "b"]]);
		assert_eq!(cfld_distance(&corpus, &corpus), 0.0);
	}

	#[test]
	fn distance_is_symmetric() {
		let (model, left) = encoded(&[&["a", "b", "c"], &["a", "c", "b"]]);
		let right = model
			.alphabet()
			.encode_corpus(&[vec!["a".into(), "b".into()], vec!["c".into(), "b".into()]])
			.unwrap();

		let forward = cfld_distance(&left, &right);
		let backward = cfld_distance(&right, &left);
		assert!((forward - backward).abs() < 1e-12);
		assert!(forward > 0.0);
	}

	#[test]
	fn disjoint_pair_sets_are_maximally_distant() {
		let (model, left) = encoded(&[&["a", "b", "c", "d"]]);
		let right = model
			.alphabet()
			.encode_corpus(&[vec!["b".into(), "a".into()], vec!["d".into(), "c".into()]])
			.unwrap();
		// No shared pair: both distributions contribute their full mass.
		assert!((cfld_distance(&left, &right) - 2.0).abs() < 1e-12);
	}

	#[test]
	fn trace_entropy_matches_hand_computation() {
		// Uniform two-symbol distribution: entropy = log10(2).
		let (_, corpus) = encoded(&[&["a", "b"], &["b", "a"]]);
		let entropy = symbol_entropy(&corpus, EntropyView::Traces);
		assert!((entropy - 2f64.log10()).abs() < 1e-12);
	}

	#[test]
	fn prefix_view_weights_early_symbols_heavier() {
		// Trace "a b": prefixes are [a] and [a b], so a counts twice.
		let (_, corpus) = encoded(&[&["a", "b"]]);

		let expected = {
			let pa: f64 = 2.0 / 3.0;
			let pb: f64 = 1.0 / 3.0;
			-(pa * pa.log10() + pb * pb.log10())
		};
		let entropy = symbol_entropy(&corpus, EntropyView::Prefixes);
		assert!((entropy - expected).abs() < 1e-12);
	}

	#[test]
	fn empty_sequences_yield_zero_entropy() {
		let corpus: Corpus = vec![vec![]];
		assert_eq!(symbol_entropy(&corpus, EntropyView::Prefixes), 0.0);
	}
}
