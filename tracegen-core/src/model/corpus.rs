use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::error::GenError;
use crate::io;

/// An interned event label.
///
/// Symbols are opaque integer handles into an [`Alphabet`]; they are
/// totally ordered and hashable so they can key transition tables and
/// context windows directly. Two reserved sentinels live outside the
/// alphabet proper:
///
/// - [`Symbol::START`]: padding for context windows shorter than k
/// - [`Symbol::END`]: the end-of-sequence marker
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
	/// Start-padding sentinel, never part of the alphabet.
	pub const START: Symbol = Symbol(u32::MAX - 1);

	/// End-of-sequence sentinel, never part of the alphabet.
	pub const END: Symbol = Symbol(u32::MAX);

	/// Whether this symbol is one of the reserved sentinels.
	pub fn is_sentinel(self) -> bool {
		self == Self::START || self == Self::END
	}
}

/// An ordered list of symbols forming one trace.
pub type Sequence = Vec<Symbol>;

/// A multiset of sequences.
pub type Corpus = Vec<Sequence>;

/// The closed set of distinct symbols observed across a corpus.
///
/// Labels are kept in first-occurrence order, which makes symbol ids (and
/// everything derived from them) reproducible for a given input order.
/// Once a model is built the alphabet is fixed; encoding a later corpus
/// against it fails with `UnknownSymbol` for labels outside the set.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Alphabet {
	labels: Vec<String>,
	index: HashMap<String, u32>,
}

impl Alphabet {
	/// Returns the symbol for `label`, interning it if unseen.
	fn intern(&mut self, label: &str) -> Symbol {
		if let Some(&id) = self.index.get(label) {
			return Symbol(id);
		}
		let id = self.labels.len() as u32;
		self.labels.push(label.to_owned());
		self.index.insert(label.to_owned(), id);
		Symbol(id)
	}

	/// Looks up a label in the fixed alphabet.
	pub fn lookup(&self, label: &str) -> Option<Symbol> {
		self.index.get(label).map(|&id| Symbol(id))
	}

	/// Returns the label behind a symbol.
	///
	/// Sentinels render as `<` and `>` (they never collide with alphabet
	/// entries because they are not interned).
	pub fn label(&self, symbol: Symbol) -> &str {
		match symbol {
			Symbol::START => "<",
			Symbol::END => ">",
			Symbol(id) => &self.labels[id as usize],
		}
	}

	/// Number of symbols in the alphabet (sentinels excluded).
	pub fn len(&self) -> usize {
		self.labels.len()
	}

	pub fn is_empty(&self) -> bool {
		self.labels.is_empty()
	}

	/// Iterates over the alphabet's symbols in deterministic order.
	pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
		(0..self.labels.len() as u32).map(Symbol)
	}

	/// Iterates over labels in first-occurrence order.
	pub fn labels(&self) -> impl Iterator<Item = &str> {
		self.labels.iter().map(String::as_str)
	}

	/// Encodes one sequence of labels against this fixed alphabet.
	///
	/// # Errors
	/// `UnknownSymbol` for any label outside the alphabet.
	pub fn encode_sequence(&self, labels: &[String]) -> Result<Sequence, GenError> {
		labels
			.iter()
			.map(|label| {
				self.lookup(label).ok_or_else(|| GenError::UnknownSymbol {
					symbol: label.clone(),
				})
			})
			.collect()
	}

	/// Encodes a whole raw corpus against this fixed alphabet.
	pub fn encode_corpus(&self, raw: &[Vec<String>]) -> Result<Corpus, GenError> {
		raw.iter().map(|seq| self.encode_sequence(seq)).collect()
	}
}

/// Frequency model of one corpus: alphabet, encoded sequences and
/// unigram counts. k-gram transition counts are derived on demand via
/// [`CorpusModel::kgram_counts`].
///
/// # Invariants
/// - `unigram.len() == alphabet.len()` and each entry is the number of
///   occurrences of that symbol across all sequences
/// - sequences and alphabet are never mutated after construction; every
///   downstream structure borrows them read-only
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CorpusModel {
	alphabet: Alphabet,
	sequences: Corpus,
	unigram: Vec<u64>,
}

impl CorpusModel {
	fn empty() -> Self {
		Self {
			alphabet: Alphabet::default(),
			sequences: Vec::new(),
			unigram: Vec::new(),
		}
	}

	/// Builds the frequency model from a raw corpus.
	///
	/// The alphabet is fixed by this call, ordered by first occurrence.
	///
	/// # Errors
	/// `EmptyCorpus` if `raw` contains zero sequences.
	pub fn new(raw: &[Vec<String>]) -> Result<Self, GenError> {
		if raw.is_empty() {
			return Err(GenError::EmptyCorpus);
		}
		let mut model = Self::empty();
		for sequence in raw {
			model.add_sequence(sequence);
		}
		Ok(model)
	}

	/// Builds the model by fanning the raw corpus out over worker
	/// threads and merging the partial models in chunk order.
	///
	/// Chunk-ordered merging keeps the alphabet's first-occurrence
	/// ordering identical to a sequential [`CorpusModel::new`] on the
	/// same input, so the two constructors are interchangeable.
	///
	/// # Errors
	/// `EmptyCorpus` if `raw` contains zero sequences.
	pub fn parallel(raw: &[Vec<String>]) -> Result<Self, GenError> {
		if raw.is_empty() {
			return Err(GenError::EmptyCorpus);
		}

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = (raw.len() + chunks - 1) / chunks;

		let (tx, rx) = mpsc::channel();
		for (chunk_index, chunk) in raw.chunks(chunk_size).enumerate() {
			let tx = tx.clone();
			let chunk: Vec<Vec<String>> = chunk.to_vec();

			thread::spawn(move || {
				let mut partial = Self::empty();
				for sequence in &chunk {
					partial.add_sequence(sequence);
				}
				tx.send((chunk_index, partial)).expect("Failed to send from thread");
			});
		}
		drop(tx);

		let mut partials: Vec<(usize, Self)> = rx.iter().collect();
		partials.sort_by_key(|(chunk_index, _)| *chunk_index);

		let mut model = Self::empty();
		for (_, partial) in &partials {
			model.merge(partial);
		}
		Ok(model)
	}

	/// Loads a model from its binary cache if present, otherwise reads
	/// the plain-text corpus file, builds the model and writes the cache
	/// (`corpus.txt` → `corpus.bin`, postcard-encoded).
	pub fn load_or_build<P: AsRef<Path>>(path: P) -> Result<Self, GenError> {
		let cache_path = io::build_output_path(&path, "bin")?;
		if cache_path.exists() {
			let bytes = std::fs::read(cache_path)?;
			let model: Self = postcard::from_bytes(&bytes)?;
			tracing::debug!(model = %io::get_filename(&path)?, "loaded corpus model from cache");
			return Ok(model);
		}

		let raw = io::read_corpus_file(&path)?;
		let model = Self::new(&raw)?;
		let bytes = postcard::to_stdvec(&model)?;
		std::fs::write(cache_path, bytes)?;
		tracing::info!(
			model = %io::get_filename(&path)?,
			sequences = model.sequences.len(),
			symbols = model.alphabet.len(),
			"built corpus model"
		);
		Ok(model)
	}

	/// Interns one raw sequence: grows the alphabet, bumps unigram
	/// counts and stores the encoded sequence.
	fn add_sequence(&mut self, labels: &[String]) {
		let mut sequence = Vec::with_capacity(labels.len());
		for label in labels {
			let symbol = self.alphabet.intern(label);
			let Symbol(id) = symbol;
			if self.unigram.len() <= id as usize {
				self.unigram.resize(id as usize + 1, 0);
			}
			self.unigram[id as usize] += 1;
			sequence.push(symbol);
		}
		self.sequences.push(sequence);
	}

	/// Merges another partial model into this one.
	///
	/// Symbols from `other` are re-interned in `other`'s first-occurrence
	/// order, so merging chunked partials in chunk order reproduces the
	/// sequential alphabet exactly.
	pub fn merge(&mut self, other: &Self) {
		let mut remap = Vec::with_capacity(other.alphabet.len());
		for label in other.alphabet.labels() {
			remap.push(self.alphabet.intern(label));
		}

		self.unigram.resize(self.alphabet.len(), 0);
		for (id, count) in other.unigram.iter().enumerate() {
			let Symbol(new_id) = remap[id];
			self.unigram[new_id as usize] += count;
		}

		for sequence in &other.sequences {
			self.sequences.push(
				sequence
					.iter()
					.map(|&Symbol(id)| remap[id as usize])
					.collect(),
			);
		}
	}

	pub fn alphabet(&self) -> &Alphabet {
		&self.alphabet
	}

	pub fn sequences(&self) -> &Corpus {
		&self.sequences
	}

	/// Occurrence count of one symbol across the whole corpus.
	///
	/// Sentinels count as zero.
	pub fn unigram_count(&self, symbol: Symbol) -> u64 {
		let Symbol(id) = symbol;
		if symbol.is_sentinel() {
			return 0;
		}
		self.unigram.get(id as usize).copied().unwrap_or(0)
	}

	/// Computes k-gram transition counts with START-padded contexts.
	///
	/// For every sequence a window of size `k` slides across it; each
	/// (context, next-symbol) pair increments a transition count and the
	/// final window of the sequence increments an ending count.
	///
	/// # Errors
	/// `InvalidArgument` for `k == 0`.
	pub fn kgram_counts(&self, k: usize) -> Result<KGramCounts, GenError> {
		if k == 0 {
			return Err(GenError::invalid("context order k must be >= 1"));
		}

		let mut transitions: HashMap<(Vec<Symbol>, Symbol), u64> = HashMap::new();
		let mut endings: HashMap<Vec<Symbol>, u64> = HashMap::new();

		for sequence in &self.sequences {
			let mut context = vec![Symbol::START; k];
			for &symbol in sequence {
				*transitions.entry((context.clone(), symbol)).or_insert(0) += 1;
				context.remove(0);
				context.push(symbol);
			}
			*endings.entry(context).or_insert(0) += 1;
		}

		Ok(KGramCounts { k, transitions, endings })
	}
}

/// k-gram transition counts of one corpus.
///
/// `transitions` maps (context window, next symbol) to its observed
/// frequency; `endings` maps a context window to the number of sequences
/// that end exactly there. Contexts are always of length `k`, padded on
/// the left with [`Symbol::START`] for prefixes shorter than `k`.
#[derive(Clone, Debug, PartialEq)]
pub struct KGramCounts {
	pub(crate) k: usize,
	pub(crate) transitions: HashMap<(Vec<Symbol>, Symbol), u64>,
	pub(crate) endings: HashMap<Vec<Symbol>, u64>,
}

impl KGramCounts {
	pub fn k(&self) -> usize {
		self.k
	}

	/// Observed frequency of `symbol` directly after `context`.
	pub fn transition_count(&self, context: &[Symbol], symbol: Symbol) -> u64 {
		self.transitions
			.get(&(context.to_vec(), symbol))
			.copied()
			.unwrap_or(0)
	}

	/// Number of sequences ending exactly at `context`.
	pub fn ending_count(&self, context: &[Symbol]) -> u64 {
		self.endings.get(context).copied().unwrap_or(0)
	}
}
