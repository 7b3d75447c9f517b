use std::collections::{HashMap, VecDeque};

use crate::error::GenError;
use crate::model::constraint::{Automaton, StateId};
use crate::model::corpus::Symbol;
use crate::model::transition::{NodeId, TransitionSystem};

/// Arena index of a product node.
pub type ProductNodeId = usize;

/// One composite state: a transition-system node paired with the current
/// state of every constraint automaton (in constraint-set order).
///
/// The designated end node carries an empty state vector; it is a pure
/// sink reachable only through END edges.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductNode {
	pub ts_node: NodeId,
	pub states: Vec<StateId>,
}

/// A product edge; the weight is the underlying transition-system edge's
/// weight (automata carry none).
#[derive(Clone, Debug, PartialEq)]
pub struct ProductEdge {
	pub symbol: Symbol,
	pub target: ProductNodeId,
	pub weight: u64,
}

/// Synchronized product of a transition system with a set of constraint
/// automata, pruned to accepting-reachable paths.
///
/// An edge on symbol `s` exists exactly where the transition system has
/// an `s` edge and every automaton has at least one successor on `s`;
/// non-deterministic successor sets fan out into one product node per
/// state combination. END edges are gated on every automaton component
/// being accepting, so the end node is reachable only through fully
/// accepting configurations, and after backward-reachability pruning any
/// surviving walk can always be extended to acceptance.
///
/// Size is bounded by |TS nodes| × ∏ |automaton states| — the dominant
/// cost driver for large constraint sets.
#[derive(Clone, Debug, PartialEq)]
pub struct Product {
	nodes: Vec<ProductNode>,
	edges: Vec<Vec<ProductEdge>>,
	start: ProductNodeId,
	end: ProductNodeId,
}

impl Product {
	/// Builds and prunes the product.
	///
	/// # Errors
	/// `UnsatisfiableConstraintSet` if pruning eliminates the start node,
	/// i.e. no sequence in the model satisfies every constraint at once.
	pub fn build(ts: &TransitionSystem, automata: &[Automaton]) -> Result<Self, GenError> {
		let mut nodes: Vec<ProductNode> = Vec::new();
		let mut edges: Vec<Vec<ProductEdge>> = Vec::new();
		let mut index: HashMap<(NodeId, Vec<StateId>), ProductNodeId> = HashMap::new();

		let mut intern = |nodes: &mut Vec<ProductNode>,
		                  edges: &mut Vec<Vec<ProductEdge>>,
		                  ts_node: NodeId,
		                  states: Vec<StateId>|
		 -> (ProductNodeId, bool) {
			if let Some(&id) = index.get(&(ts_node, states.clone())) {
				return (id, false);
			}
			let id = nodes.len();
			nodes.push(ProductNode { ts_node, states: states.clone() });
			edges.push(Vec::new());
			index.insert((ts_node, states), id);
			(id, true)
		};

		let starts: Vec<StateId> = automata.iter().map(Automaton::start).collect();
		let (start, _) = intern(&mut nodes, &mut edges, ts.start(), starts);
		let (end, _) = intern(&mut nodes, &mut edges, ts.end(), Vec::new());

		let mut worklist = VecDeque::from([start]);
		while let Some(id) = worklist.pop_front() {
			let current = nodes[id].clone();
			for ts_edge in ts.edges_from(current.ts_node) {
				if ts_edge.symbol == Symbol::END {
					let all_accepting = current
						.states
						.iter()
						.zip(automata)
						.all(|(&state, automaton)| automaton.is_accepting(state));
					if all_accepting {
						edges[id].push(ProductEdge {
							symbol: Symbol::END,
							target: end,
							weight: ts_edge.weight,
						});
					}
					continue;
				}

				let successor_sets: Vec<Vec<StateId>> = current
					.states
					.iter()
					.zip(automata)
					.map(|(&state, automaton)| automaton.step(state, ts_edge.symbol))
					.collect();
				if successor_sets.iter().any(|set| set.is_empty()) {
					// Some automaton rejects this symbol here.
					continue;
				}

				for combo in combinations(&successor_sets) {
					let (target, created) =
						intern(&mut nodes, &mut edges, ts_edge.target, combo);
					if created {
						worklist.push_back(target);
					}
					edges[id].push(ProductEdge {
						symbol: ts_edge.symbol,
						target,
						weight: ts_edge.weight,
					});
				}
			}
		}

		let built_nodes = nodes.len();
		let built_edges = edges.iter().map(|out| out.len()).sum::<usize>();

		let product = Self::prune(nodes, edges, start, end)?;
		tracing::debug!(
			constraints = automata.len(),
			built_nodes,
			built_edges,
			pruned_nodes = product.nodes.len(),
			pruned_edges = product.edge_count(),
			"built constrained product"
		);
		Ok(product)
	}

	/// Keeps only nodes co-accessible to the end node, compacting the
	/// arena. Every surviving node lies on a start-to-acceptance path
	/// (forward reachability holds by construction).
	fn prune(
		nodes: Vec<ProductNode>,
		edges: Vec<Vec<ProductEdge>>,
		start: ProductNodeId,
		end: ProductNodeId,
	) -> Result<Self, GenError> {
		let mut reverse: Vec<Vec<ProductNodeId>> = vec![Vec::new(); nodes.len()];
		for (source, out) in edges.iter().enumerate() {
			for edge in out {
				reverse[edge.target].push(source);
			}
		}

		let mut coaccessible = vec![false; nodes.len()];
		coaccessible[end] = true;
		let mut worklist = VecDeque::from([end]);
		while let Some(id) = worklist.pop_front() {
			for &source in &reverse[id] {
				if !coaccessible[source] {
					coaccessible[source] = true;
					worklist.push_back(source);
				}
			}
		}

		if !coaccessible[start] {
			return Err(GenError::UnsatisfiableConstraintSet);
		}

		let mut remap = vec![usize::MAX; nodes.len()];
		let mut kept_nodes = Vec::new();
		for (id, node) in nodes.into_iter().enumerate() {
			if coaccessible[id] {
				remap[id] = kept_nodes.len();
				kept_nodes.push(node);
			}
		}

		let mut kept_edges = Vec::with_capacity(kept_nodes.len());
		for (id, out) in edges.into_iter().enumerate() {
			if !coaccessible[id] {
				continue;
			}
			kept_edges.push(
				out.into_iter()
					.filter(|edge| coaccessible[edge.target])
					.map(|edge| ProductEdge { target: remap[edge.target], ..edge })
					.collect(),
			);
		}

		Ok(Self {
			nodes: kept_nodes,
			edges: kept_edges,
			start: remap[start],
			end: remap[end],
		})
	}

	pub fn start(&self) -> ProductNodeId {
		self.start
	}

	pub fn end(&self) -> ProductNodeId {
		self.end
	}

	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn edge_count(&self) -> usize {
		self.edges.iter().map(|out| out.len()).sum()
	}

	pub fn node(&self, id: ProductNodeId) -> &ProductNode {
		&self.nodes[id]
	}

	pub fn edges_from(&self, id: ProductNodeId) -> &[ProductEdge] {
		&self.edges[id]
	}
}

/// Cartesian product of per-automaton successor sets.
///
/// With zero automata this yields the single empty combination, which
/// makes the unconstrained product coincide with the transition system.
fn combinations(sets: &[Vec<StateId>]) -> Vec<Vec<StateId>> {
	let mut result = vec![Vec::with_capacity(sets.len())];
	for set in sets {
		let mut expanded = Vec::with_capacity(result.len() * set.len());
		for combo in &result {
			for &state in set {
				let mut next = combo.clone();
				next.push(state);
				expanded.push(next);
			}
		}
		result = expanded;
	}
	result
}
