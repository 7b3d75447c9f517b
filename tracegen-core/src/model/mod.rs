//! Top-level module for the constrained trace generation system.
//!
//! This crate provides a constraint-satisfying stochastic trace
//! generator, including:
//! - Alphabet and corpus frequency models (`CorpusModel`)
//! - A fixed catalog of declarative constraint automata (`Automaton`)
//! - The empirical k-order transition system (`TransitionSystem`)
//! - The pruned synchronized product (`Product`)
//! - Weighted random-walk sampling (`sampler`)
//! - Directly-follows conformance measures (`conformance`)

/// Symbol interning, alphabet and corpus frequency tables.
///
/// Fixes the alphabet in first-occurrence order, counts unigrams and
/// k-grams, and supports parallel ingestion with chunk-ordered merging.
pub mod corpus;

/// Declarative constraint templates compiled to finite automata.
///
/// Each catalog template plus its symbol arguments yields a small
/// automaton whose transition function is total over the alphabet.
pub mod constraint;

/// The k-order weighted transition system of a corpus.
///
/// An integer-indexed arena of context windows whose edge weights
/// reproduce the corpus's conditional next-symbol frequencies.
pub mod transition;

/// Synchronized product of the transition system with a constraint set,
/// pruned to accepting-reachable paths.
pub mod product;

/// Stochastic trace sampling over the pruned product.
///
/// Bounded-retry weighted random walks, batch generation with
/// per-sequence fault isolation, and a parallel batch variant.
pub mod sampler;

/// Conformance measures between two corpora.
///
/// Directly-follows frequency distance and corpus entropy.
pub mod conformance;

/// High-level interface for one full generation request.
///
/// Wires corpus model, constraint compilation, transition system and
/// product behind a single immutable handle serving sampling calls.
pub mod generator;
