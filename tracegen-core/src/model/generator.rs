use rand::Rng;

use crate::error::GenError;
use crate::model::constraint::{Automaton, ConstraintSpec};
use crate::model::corpus::{Corpus, CorpusModel};
use crate::model::product::Product;
use crate::model::sampler::{self, GenerationOutcome, SampleParams};
use crate::model::transition::TransitionSystem;

/// High-level interface wiring the whole pipeline behind one handle.
///
/// A `Generator` owns the corpus model, the compiled constraint automata
/// and the pruned product for one (corpus, k, constraint-set) request.
/// Construction runs the full build chain and surfaces any build error
/// immediately; afterwards the generator is immutable and can serve any
/// number of (possibly parallel) sampling calls.
///
/// # Responsibilities
/// - Compile every constraint specification against the corpus alphabet
/// - Build the k-order transition system and the constrained product
/// - Generate synthetic corpora and validate them against the automata
pub struct Generator {
	model: CorpusModel,
	automata: Vec<Automaton>,
	product: Product,
}

impl Generator {
	/// Builds a generator for one generation request.
	///
	/// # Errors
	/// - `InvalidArgument` / `UnsupportedTemplate` from constraint
	///   compilation
	/// - `InvalidArgument` for `k == 0`
	/// - `UnsatisfiableConstraintSet` if no sequence can satisfy every
	///   constraint at once
	pub fn new(model: CorpusModel, k: usize, specs: &[ConstraintSpec]) -> Result<Self, GenError> {
		let automata: Vec<Automaton> = specs
			.iter()
			.map(|spec| Automaton::compile(spec, model.alphabet()))
			.collect::<Result<_, _>>()?;

		let ts = TransitionSystem::build(&model, k)?;
		let product = Product::build(&ts, &automata)?;

		tracing::info!(
			k,
			constraints = automata.len(),
			product_nodes = product.node_count(),
			product_edges = product.edge_count(),
			"generator ready"
		);
		Ok(Self { model, automata, product })
	}

	pub fn model(&self) -> &CorpusModel {
		&self.model
	}

	pub fn product(&self) -> &Product {
		&self.product
	}

	pub fn automata(&self) -> &[Automaton] {
		&self.automata
	}

	/// Generates `count` sequences with per-sequence fault isolation.
	pub fn generate<R: Rng + ?Sized>(
		&self,
		count: usize,
		params: &SampleParams,
		rng: &mut R,
	) -> GenerationOutcome {
		sampler::generate(&self.product, count, params, rng)
	}

	/// Parallel batch variant sharing the read-only product across
	/// worker threads.
	pub fn generate_parallel(&self, count: usize, params: &SampleParams) -> GenerationOutcome {
		sampler::generate_parallel(&self.product, count, params)
	}

	/// Checks a corpus against every compiled automaton by acceptance
	/// simulation, independently of the product construction.
	pub fn validate(&self, corpus: &Corpus) -> bool {
		corpus.iter().all(|sequence| {
			self.automata.iter().all(|automaton| automaton.accepts(sequence))
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn model() -> CorpusModel {
		let raw: Vec<Vec<String>> = [
			vec!["a", "b", "c"],
			vec!["a", "c", "b"],
		]
		.into_iter()
		.map(|seq| seq.into_iter().map(str::to_owned).collect())
		.collect();
		CorpusModel::new(&raw).unwrap()
	}

	#[test]
	fn end_to_end_request_generates_valid_traces() {
		let generator = Generator::new(
			model(),
			1,
			&[ConstraintSpec::binary("Precedence", "a", "b")],
		)
		.unwrap();

		let mut rng = StdRng::seed_from_u64(21);
		let outcome = generator.generate(25, &SampleParams::default(), &mut rng);
		assert_eq!(outcome.corpus.len(), 25);
		assert!(outcome.failures.is_empty());
		assert!(generator.validate(&outcome.corpus));
	}

	#[test]
	fn build_errors_surface_at_construction() {
		let result = Generator::new(
			model(),
			1,
			&[ConstraintSpec::unary("Absence", "a"), ConstraintSpec::existence("a", 1)],
		);
		assert!(matches!(result, Err(GenError::UnsatisfiableConstraintSet)));

		let result = Generator::new(model(), 0, &[]);
		assert!(matches!(result, Err(GenError::InvalidArgument { .. })));
	}
}
