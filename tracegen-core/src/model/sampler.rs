use std::sync::mpsc;
use std::thread;

use rand::Rng;

use crate::error::GenError;
use crate::model::corpus::{Corpus, Sequence, Symbol};
use crate::model::product::{Product, ProductEdge};

/// Knobs for one generation request.
#[derive(Clone, Debug)]
pub struct SampleParams {
	/// Hard cap on sequence length; reaching it forces a stop (kept only
	/// if the walk can stop accepted there, otherwise discarded).
	pub max_len: usize,

	/// Bounded retry budget per requested sequence.
	pub max_attempts: usize,
}

impl Default for SampleParams {
	fn default() -> Self {
		Self { max_len: 1_000, max_attempts: 100 }
	}
}

/// Result of one random walk attempt.
enum WalkOutcome {
	Accepted(Sequence),
	Discarded,
}

/// Outcome of a batch generation request.
///
/// Per-sequence fault isolation: a failed sequence lands in `failures`
/// without affecting the rest of the batch, and is never silently
/// dropped. `corpus` is empty only when the request asked for zero
/// sequences or every attempt failed (in which case `failures` says so).
#[derive(Debug, Default)]
pub struct GenerationOutcome {
	pub corpus: Corpus,
	pub failures: Vec<GenError>,
}

/// Samples one constraint-satisfying sequence from the pruned product.
///
/// Restarts from the product start node on every discarded walk; there
/// is no partial rewinding. Because pruning keeps only nodes from which
/// acceptance stays reachable, a walk can never strand mid-graph — the
/// only discard trigger is the length cap.
///
/// # Errors
/// `SamplingExhausted` once the attempt budget is spent.
pub fn sample_one<R: Rng + ?Sized>(
	product: &Product,
	params: &SampleParams,
	rng: &mut R,
) -> Result<Sequence, GenError> {
	for _ in 0..params.max_attempts {
		if let WalkOutcome::Accepted(sequence) = walk(product, params.max_len, rng) {
			return Ok(sequence);
		}
	}
	tracing::warn!(
		attempts = params.max_attempts,
		max_len = params.max_len,
		"no accepting walk within the length bound"
	);
	Err(GenError::SamplingExhausted { attempts: params.max_attempts })
}

/// One weighted random walk from the product start node.
///
/// Stopping is itself a weighted choice: the END edge's weight (the
/// empirical end-of-sequence count for the current context) competes
/// with the other outgoing edges.
fn walk<R: Rng + ?Sized>(product: &Product, max_len: usize, rng: &mut R) -> WalkOutcome {
	let mut node = product.start();
	let mut sequence = Vec::new();

	loop {
		let edges = product.edges_from(node);

		if sequence.len() >= max_len {
			// Forced stop, valid only where the walk may end accepted.
			return if edges.iter().any(|edge| edge.symbol == Symbol::END) {
				WalkOutcome::Accepted(sequence)
			} else {
				WalkOutcome::Discarded
			};
		}

		let Some(edge) = pick_weighted(edges, rng) else {
			return WalkOutcome::Discarded;
		};
		if edge.symbol == Symbol::END {
			return WalkOutcome::Accepted(sequence);
		}
		sequence.push(edge.symbol);
		node = edge.target;
	}
}

/// Picks an edge with probability proportional to its weight.
///
/// O(n) cumulative-subtraction scan over the edge list.
fn pick_weighted<'a, R: Rng + ?Sized>(
	edges: &'a [ProductEdge],
	rng: &mut R,
) -> Option<&'a ProductEdge> {
	let total: u64 = edges.iter().map(|edge| edge.weight).sum();
	if total == 0 {
		return None;
	}

	let mut r = rng.random_range(0..total);

	let mut fallback = None;
	for edge in edges {
		if r < edge.weight {
			return Some(edge);
		}
		r -= edge.weight;
		fallback = Some(edge);
	}

	// Fallback: should not happen, but kept for safety.
	fallback
}

/// Generates `count` sequences, isolating per-sequence failures.
pub fn generate<R: Rng + ?Sized>(
	product: &Product,
	count: usize,
	params: &SampleParams,
	rng: &mut R,
) -> GenerationOutcome {
	let mut outcome = GenerationOutcome::default();
	for _ in 0..count {
		match sample_one(product, params, rng) {
			Ok(sequence) => outcome.corpus.push(sequence),
			Err(error) => outcome.failures.push(error),
		}
	}
	outcome
}

/// Generates `count` sequences by fanning the batch out over scoped
/// worker threads sharing the read-only product.
///
/// Each worker owns its own RNG; no synchronization is needed beyond
/// the channel that collects per-worker outcomes.
pub fn generate_parallel(
	product: &Product,
	count: usize,
	params: &SampleParams,
) -> GenerationOutcome {
	if count == 0 {
		return GenerationOutcome::default();
	}

	let workers = num_cpus::get().min(count);
	let share = count / workers;
	let remainder = count % workers;

	let (tx, rx) = mpsc::channel();
	thread::scope(|scope| {
		for worker in 0..workers {
			let tx = tx.clone();
			let quota = share + usize::from(worker < remainder);

			scope.spawn(move || {
				let mut rng = rand::rng();
				let outcome = generate(product, quota, params, &mut rng);
				tx.send(outcome).expect("Failed to send from thread");
			});
		}
		drop(tx);
	});

	let mut merged = GenerationOutcome::default();
	for outcome in rx.iter() {
		merged.corpus.extend(outcome.corpus);
		merged.failures.extend(outcome.failures);
	}
	merged
}
