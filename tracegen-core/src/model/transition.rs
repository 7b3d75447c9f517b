use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::GenError;
use crate::model::corpus::{CorpusModel, KGramCounts, Symbol};

/// Arena index of a transition-system node.
pub type NodeId = usize;

/// One weighted, symbol-labelled edge of the transition system.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Edge {
	pub symbol: Symbol,
	pub target: NodeId,
	pub weight: u64,
}

/// The empirical k-order Markov model of a corpus.
///
/// Nodes are k-gram context windows (START-padded on the left), held in
/// an arena and addressed by integer id; edges carry the observed
/// frequency of their (context, next-symbol) pair. Sequence ends become
/// [`Symbol::END`] edges into one absorbing end node, weighted by the
/// number of sequences ending at the source context.
///
/// # Invariants
/// - every edge's source context and consumed symbol compose (drop the
///   oldest symbol, append the new one) into the target's context
/// - a node's non-END out-weights sum to the number of times its context
///   was followed by a further symbol in the corpus; adding the END edge
///   weight gives the total number of complete windows at that context
///
/// Construction is deterministic: count tables are sorted before arena
/// insertion, so identical corpora yield structurally identical systems.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TransitionSystem {
	k: usize,
	contexts: Vec<Vec<Symbol>>,
	index: HashMap<Vec<Symbol>, NodeId>,
	edges: Vec<Vec<Edge>>,
	start: NodeId,
	end: NodeId,
}

impl TransitionSystem {
	/// Builds the k-order transition system of a corpus.
	///
	/// # Errors
	/// `InvalidArgument` for `k == 0`.
	pub fn build(model: &CorpusModel, k: usize) -> Result<Self, GenError> {
		let counts = model.kgram_counts(k)?;
		Ok(Self::from_counts(&counts))
	}

	fn from_counts(counts: &KGramCounts) -> Self {
		let k = counts.k;
		let mut ts = Self {
			k,
			contexts: Vec::new(),
			index: HashMap::new(),
			edges: Vec::new(),
			start: 0,
			end: 0,
		};
		ts.start = ts.node(vec![Symbol::START; k]);
		ts.end = ts.node(vec![Symbol::END; k]);

		// Sorted insertion keeps node ids independent of hash order.
		let mut transitions: Vec<_> = counts.transitions.iter().collect();
		transitions.sort_by(|x, y| x.0.cmp(y.0));
		for ((context, symbol), &weight) in transitions {
			let source = ts.node(context.clone());
			let mut next = context.clone();
			next.remove(0);
			next.push(*symbol);
			let target = ts.node(next);
			ts.edges[source].push(Edge { symbol: *symbol, target, weight });
		}

		let mut endings: Vec<_> = counts.endings.iter().collect();
		endings.sort_by(|x, y| x.0.cmp(y.0));
		for (context, &weight) in endings {
			let source = ts.node(context.clone());
			let target = ts.end;
			ts.edges[source].push(Edge { symbol: Symbol::END, target, weight });
		}

		tracing::debug!(
			k,
			nodes = ts.contexts.len(),
			edges = ts.edges.iter().map(|out| out.len()).sum::<usize>(),
			"built transition system"
		);
		ts
	}

	/// Returns the arena id for a context, creating the node if absent.
	fn node(&mut self, context: Vec<Symbol>) -> NodeId {
		if let Some(&id) = self.index.get(&context) {
			return id;
		}
		let id = self.contexts.len();
		self.contexts.push(context.clone());
		self.index.insert(context, id);
		self.edges.push(Vec::new());
		id
	}

	pub fn k(&self) -> usize {
		self.k
	}

	/// The all-START context node where every walk begins.
	pub fn start(&self) -> NodeId {
		self.start
	}

	/// The absorbing end node reached by END edges.
	pub fn end(&self) -> NodeId {
		self.end
	}

	pub fn node_count(&self) -> usize {
		self.contexts.len()
	}

	pub fn context(&self, id: NodeId) -> &[Symbol] {
		&self.contexts[id]
	}

	/// Looks up the node for an exact context window, if observed.
	pub fn find(&self, context: &[Symbol]) -> Option<NodeId> {
		self.index.get(context).copied()
	}

	pub fn edges_from(&self, id: NodeId) -> &[Edge] {
		&self.edges[id]
	}

	/// Sum of all outgoing edge weights, END included.
	pub fn total_out_weight(&self, id: NodeId) -> u64 {
		self.edges[id].iter().map(|edge| edge.weight).sum()
	}

	/// Sum of outgoing weights on proper symbols; equals the number of
	/// times this context was followed by a further symbol in the corpus.
	pub fn continuation_weight(&self, id: NodeId) -> u64 {
		self.edges[id]
			.iter()
			.filter(|edge| edge.symbol != Symbol::END)
			.map(|edge| edge.weight)
			.sum()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn model(corpus: &[&[&str]]) -> CorpusModel {
		let raw: Vec<Vec<String>> = corpus
			.iter()
			.map(|seq| seq.iter().map(|s| s.to_string()).collect())
			.collect();
		CorpusModel::new(&raw).unwrap()
	}

	#[test]
	fn edges_reproduce_corpus_frequencies() {
		let model = model(&[&["a", "b", "c"], &["a", "c", "b"]]);
		let a = model.alphabet().lookup("a").unwrap();
		let b = model.alphabet().lookup("b").unwrap();
		let c = model.alphabet().lookup("c").unwrap();
		let ts = TransitionSystem::build(&model, 1).unwrap();

		let start_edges = ts.edges_from(ts.start());
		assert_eq!(start_edges.len(), 1);
		assert_eq!(start_edges[0].symbol, a);
		assert_eq!(start_edges[0].weight, 2);

		let a_node = ts.find(&[a]).unwrap();
		let mut next: Vec<(Symbol, u64)> = ts
			.edges_from(a_node)
			.iter()
			.map(|edge| (edge.symbol, edge.weight))
			.collect();
		next.sort();
		assert_eq!(next, vec![(b, 1), (c, 1)]);
	}

	#[test]
	fn out_weights_match_context_occurrences() {
		let model = model(&[&["a", "b", "c"], &["a", "c", "b"]]);
		let b = model.alphabet().lookup("b").unwrap();
		let ts = TransitionSystem::build(&model, 1).unwrap();

		// Context [b] occurs twice: once followed by c, once at a
		// sequence end.
		let b_node = ts.find(&[b]).unwrap();
		assert_eq!(ts.continuation_weight(b_node), 1);
		assert_eq!(ts.total_out_weight(b_node), 2);
	}

	#[test]
	fn contexts_compose_along_edges() {
		let model = model(&[&["a", "b", "a", "c"], &["b", "a", "b"]]);
		let ts = TransitionSystem::build(&model, 2).unwrap();

		for id in 0..ts.node_count() {
			for edge in ts.edges_from(id) {
				if edge.symbol == Symbol::END {
					assert_eq!(edge.target, ts.end());
					continue;
				}
				let mut expected = ts.context(id).to_vec();
				expected.remove(0);
				expected.push(edge.symbol);
				assert_eq!(ts.context(edge.target), expected.as_slice());
			}
		}
	}

	#[test]
	fn end_node_is_absorbing() {
		let model = model(&[&["a", "b"]]);
		let ts = TransitionSystem::build(&model, 1).unwrap();
		assert!(ts.edges_from(ts.end()).is_empty());
	}

	#[test]
	fn construction_is_deterministic() {
		let model = model(&[&["a", "b", "c"], &["c", "b", "a"], &["b", "b"]]);
		let first = TransitionSystem::build(&model, 2).unwrap();
		let second = TransitionSystem::build(&model, 2).unwrap();
		assert_eq!(first, second);
	}
}
