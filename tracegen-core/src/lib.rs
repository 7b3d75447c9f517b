//! Constraint-satisfying stochastic trace generation library.
//!
//! This crate generates synthetic symbol sequences that statistically
//! resemble a historical corpus while provably satisfying a set of
//! declarative ordering/occurrence constraints. It provides:
//! - Corpus frequency models with a fixed, reproducible alphabet
//! - Compilation of declarative constraint templates to finite automata
//! - The empirical k-order transition system of a corpus
//! - A synchronized, pruned product restricting walks to
//!   constraint-satisfying paths
//! - Weighted random-walk sampling with bounded retries
//! - Directly-follows conformance measures for validating output
//!
//! The sequential dependency chain is corpus model → transition system
//! → product → sampling; every structure is immutable once built and
//! can be shared read-only across any number of sampling workers.

/// Core models, product construction, sampling and conformance.
pub mod model;

/// Error taxonomy shared across the pipeline.
pub mod error;

/// I/O utilities (plain-text corpus loading, cache path helpers).
pub mod io;
