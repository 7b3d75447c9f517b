use thiserror::Error;

/// Error taxonomy for the trace generation pipeline.
///
/// Construction-time failures (alphabet, automaton, transition system,
/// product) are fatal to that build and are surfaced immediately; only
/// sampling retries internally, and then only up to a bounded attempt
/// count before reporting `SamplingExhausted`.
#[derive(Debug, Error)]
pub enum GenError {
	/// The input corpus contains zero sequences.
	#[error("corpus contains no sequences")]
	EmptyCorpus,

	/// A symbol label fell outside a previously fixed alphabet.
	#[error("symbol '{symbol}' is not part of the alphabet")]
	UnknownSymbol { symbol: String },

	/// A structurally invalid parameter (bad arity, out-of-alphabet
	/// constraint argument, k = 0, ...).
	#[error("invalid argument: {reason}")]
	InvalidArgument { reason: String },

	/// A constraint template name outside the fixed catalog.
	#[error("unsupported constraint template '{name}'")]
	UnsupportedTemplate { name: String },

	/// Pruning the constrained product eliminated its start node: no
	/// sequence can satisfy every constraint simultaneously.
	#[error("constraint set admits no satisfying sequence")]
	UnsatisfiableConstraintSet,

	/// The bounded-retry sampler found no accepting walk within the
	/// configured length bound.
	#[error("no accepting walk of bounded length found after {attempts} attempts")]
	SamplingExhausted { attempts: usize },

	/// Underlying filesystem failure while loading a corpus or cache.
	#[error("i/o failure: {0}")]
	Io(#[from] std::io::Error),

	/// A binary model cache could not be decoded.
	#[error("model cache is corrupt: {0}")]
	Cache(#[from] postcard::Error),
}

impl GenError {
	/// Shorthand for `InvalidArgument` with a formatted reason.
	pub(crate) fn invalid(reason: impl Into<String>) -> Self {
		Self::InvalidArgument { reason: reason.into() }
	}
}
