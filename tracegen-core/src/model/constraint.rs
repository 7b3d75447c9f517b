use std::collections::{HashMap, HashSet};

use crate::error::GenError;
use crate::model::corpus::{Alphabet, Symbol};

/// The fixed catalog of declarative constraint templates.
///
/// Template names arrive as strings from external constraint catalogs and
/// are matched case-insensitively; anything outside this catalog fails
/// with `UnsupportedTemplate`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Template {
	Existence,
	Absence,
	Init,
	Last,
	Precedence,
	Response,
	ChainPrecedence,
	ChainResponse,
	Coexistence,
	Choice,
	ExclusiveChoice,
}

impl Template {
	/// Resolves a template name from the catalog.
	///
	/// # Errors
	/// `UnsupportedTemplate` for unknown names.
	pub fn parse(name: &str) -> Result<Self, GenError> {
		match name.to_ascii_lowercase().as_str() {
			"existence" => Ok(Self::Existence),
			"absence" => Ok(Self::Absence),
			"init" => Ok(Self::Init),
			"last" => Ok(Self::Last),
			"precedence" => Ok(Self::Precedence),
			"response" => Ok(Self::Response),
			"chainprecedence" => Ok(Self::ChainPrecedence),
			"chainresponse" => Ok(Self::ChainResponse),
			"coexistence" => Ok(Self::Coexistence),
			"choice" => Ok(Self::Choice),
			"exclusivechoice" => Ok(Self::ExclusiveChoice),
			_ => Err(GenError::UnsupportedTemplate { name: name.to_owned() }),
		}
	}

	/// Number of symbol arguments the template takes.
	pub fn arity(self) -> usize {
		match self {
			Self::Existence | Self::Absence | Self::Init | Self::Last => 1,
			_ => 2,
		}
	}

	pub fn name(self) -> &'static str {
		match self {
			Self::Existence => "Existence",
			Self::Absence => "Absence",
			Self::Init => "Init",
			Self::Last => "Last",
			Self::Precedence => "Precedence",
			Self::Response => "Response",
			Self::ChainPrecedence => "ChainPrecedence",
			Self::ChainResponse => "ChainResponse",
			Self::Coexistence => "Coexistence",
			Self::Choice => "Choice",
			Self::ExclusiveChoice => "ExclusiveChoice",
		}
	}
}

/// Boundary shape of one constraint: template name, ordered symbol
/// arguments, and the optional occurrence count used by `Existence`.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintSpec {
	pub template: String,
	pub args: Vec<String>,
	pub count: Option<usize>,
}

impl ConstraintSpec {
	pub fn unary(template: &str, a: &str) -> Self {
		Self { template: template.to_owned(), args: vec![a.to_owned()], count: None }
	}

	pub fn binary(template: &str, a: &str, b: &str) -> Self {
		Self {
			template: template.to_owned(),
			args: vec![a.to_owned(), b.to_owned()],
			count: None,
		}
	}

	pub fn existence(a: &str, count: usize) -> Self {
		Self {
			template: "Existence".to_owned(),
			args: vec![a.to_owned()],
			count: Some(count),
		}
	}
}

pub type StateId = u32;

/// A compiled constraint automaton over the full alphabet.
///
/// The transition function is total over Σ by convention: a missing
/// `(state, symbol)` entry means the symbol is irrelevant to the
/// constraint and self-loops, while an explicit empty entry rejects the
/// symbol outright. The representation allows non-deterministic
/// successor sets even though the fixed catalog compiles to
/// deterministic automata.
///
/// # Invariants
/// - state ids are dense in `0..state_count`
/// - every successor id in `moves` is a valid state
/// - compiled automata are pure data: no reference back to any corpus
#[derive(Clone, Debug, PartialEq)]
pub struct Automaton {
	name: String,
	state_count: u32,
	start: StateId,
	accepting: Vec<bool>,
	moves: HashMap<(StateId, Symbol), Vec<StateId>>,
}

impl Automaton {
	/// Compiles one constraint specification against the global alphabet.
	///
	/// # Errors
	/// - `UnsupportedTemplate` for a template name outside the catalog
	/// - `InvalidArgument` for wrong arity, an argument symbol missing
	///   from the alphabet, or a count parameter on a non-Existence
	///   template
	pub fn compile(spec: &ConstraintSpec, alphabet: &Alphabet) -> Result<Self, GenError> {
		let template = Template::parse(&spec.template)?;

		if spec.args.len() != template.arity() {
			return Err(GenError::invalid(format!(
				"{} takes {} symbol argument(s), got {}",
				template.name(),
				template.arity(),
				spec.args.len()
			)));
		}
		if spec.count.is_some() && template != Template::Existence {
			return Err(GenError::invalid(format!(
				"{} does not take a count parameter",
				template.name()
			)));
		}

		let mut symbols = Vec::with_capacity(spec.args.len());
		for arg in &spec.args {
			let symbol = alphabet.lookup(arg).ok_or_else(|| {
				GenError::invalid(format!("symbol '{}' is not in the alphabet", arg))
			})?;
			symbols.push(symbol);
		}

		let name = match template {
			Template::Existence => {
				format!("{}({}, {})", template.name(), spec.args[0], spec.count.unwrap_or(1))
			}
			_ => format!("{}({})", template.name(), spec.args.join(", ")),
		};

		let mut moves: HashMap<(StateId, Symbol), Vec<StateId>> = HashMap::new();
		let a = symbols[0];

		let (state_count, accepting): (u32, Vec<bool>) = match template {
			Template::Existence => {
				let n = spec.count.unwrap_or(1);
				if n == 0 {
					// Vacuously true: one accepting state, everything self-loops.
					(1, vec![true])
				} else {
					// State i = "a seen i times", state n absorbing.
					for i in 0..n {
						moves.insert((i as StateId, a), vec![i as StateId + 1]);
					}
					(n as u32 + 1, (0..=n).map(|i| i == n).collect())
				}
			}
			Template::Absence => {
				moves.insert((0, a), vec![]);
				(1, vec![true])
			}
			Template::Init => {
				// The first consumed symbol must be a; afterwards anything goes.
				for s in alphabet.symbols() {
					if s != a {
						moves.insert((0, s), vec![]);
					}
				}
				moves.insert((0, a), vec![1]);
				(2, vec![false, true])
			}
			Template::Last => {
				// State 1 = "most recent symbol was a".
				moves.insert((0, a), vec![1]);
				for s in alphabet.symbols() {
					if s != a {
						moves.insert((1, s), vec![0]);
					}
				}
				(2, vec![false, true])
			}
			Template::Precedence => {
				let b = symbols[1];
				moves.insert((0, b), vec![]);
				if a != b {
					moves.insert((0, a), vec![1]);
				}
				(2, vec![true, true])
			}
			Template::Response => {
				let b = symbols[1];
				// State 1 = "an a still awaits its b". With a == b the
				// obligation reopens on discharge and can never close.
				moves.insert((0, a), vec![1]);
				if b != a {
					moves.insert((1, b), vec![0]);
				}
				(2, vec![true, false])
			}
			Template::ChainPrecedence => {
				let b = symbols[1];
				if a == b {
					// The first a can have no immediately preceding a.
					moves.insert((0, a), vec![]);
					(1, vec![true])
				} else {
					// State 1 = "most recent symbol was a", the only
					// position from which b may be consumed.
					moves.insert((0, a), vec![1]);
					moves.insert((0, b), vec![]);
					moves.insert((1, b), vec![0]);
					for s in alphabet.symbols() {
						if s != a && s != b {
							moves.insert((1, s), vec![0]);
						}
					}
					(2, vec![true, true])
				}
			}
			Template::ChainResponse => {
				let b = symbols[1];
				// State 1 = "just consumed a, the next symbol must be b".
				moves.insert((0, a), vec![1]);
				if a == b {
					// a discharges and immediately reopens; anything else rejects.
					for s in alphabet.symbols() {
						if s != a {
							moves.insert((1, s), vec![]);
						}
					}
				} else {
					moves.insert((1, b), vec![0]);
					for s in alphabet.symbols() {
						if s != b {
							moves.insert((1, s), vec![]);
						}
					}
				}
				(2, vec![true, false])
			}
			Template::Coexistence => {
				let b = symbols[1];
				if a == b {
					// "a iff a" holds vacuously.
					(1, vec![true])
				} else {
					// States: 0 = neither, 1 = only a, 2 = only b, 3 = both.
					moves.insert((0, a), vec![1]);
					moves.insert((0, b), vec![2]);
					moves.insert((1, b), vec![3]);
					moves.insert((2, a), vec![3]);
					(4, vec![true, false, false, true])
				}
			}
			Template::Choice => {
				let b = symbols[1];
				moves.insert((0, a), vec![1]);
				moves.insert((0, b), vec![1]);
				(2, vec![false, true])
			}
			Template::ExclusiveChoice => {
				let b = symbols[1];
				if a == b {
					// Degenerate instantiation: exactly one occurrence of a.
					moves.insert((0, a), vec![1]);
					moves.insert((1, a), vec![]);
					(2, vec![false, true])
				} else {
					moves.insert((0, a), vec![1]);
					moves.insert((0, b), vec![2]);
					moves.insert((1, b), vec![]);
					moves.insert((2, a), vec![]);
					(3, vec![false, true, true])
				}
			}
		};

		Ok(Self { name, state_count, start: 0, accepting, moves })
	}

	/// Human-readable instance name, e.g. `Precedence(submit, approve)`.
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn start(&self) -> StateId {
		self.start
	}

	pub fn state_count(&self) -> u32 {
		self.state_count
	}

	pub fn is_accepting(&self, state: StateId) -> bool {
		self.accepting[state as usize]
	}

	/// Successor states for one consumed symbol.
	///
	/// A missing entry self-loops (the symbol is irrelevant to this
	/// constraint); an explicit empty entry rejects the path.
	pub fn step(&self, state: StateId, symbol: Symbol) -> Vec<StateId> {
		match self.moves.get(&(state, symbol)) {
			Some(next) => next.clone(),
			None => vec![state],
		}
	}

	/// Set-based acceptance simulation over a finished sequence.
	///
	/// Used to validate generated output independently of the product
	/// construction.
	pub fn accepts(&self, sequence: &[Symbol]) -> bool {
		let mut current: HashSet<StateId> = HashSet::from([self.start]);
		for &symbol in sequence {
			let mut next = HashSet::new();
			for &state in &current {
				next.extend(self.step(state, symbol));
			}
			if next.is_empty() {
				return false;
			}
			current = next;
		}
		current.iter().any(|&state| self.is_accepting(state))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::corpus::{CorpusModel, Sequence};

	fn alphabet() -> Alphabet {
		let raw: Vec<Vec<String>> =
			vec![vec!["a".into(), "b".into(), "c".into()]];
		CorpusModel::new(&raw).unwrap().alphabet().clone()
	}

	fn seq(alphabet: &Alphabet, trace: &str) -> Sequence {
		trace
			.split_whitespace()
			.map(|label| alphabet.lookup(label).unwrap())
			.collect()
	}

	fn compiled(spec: ConstraintSpec) -> (Alphabet, Automaton) {
		let alphabet = alphabet();
		let automaton = Automaton::compile(&spec, &alphabet).unwrap();
		(alphabet, automaton)
	}

	fn check(spec: ConstraintSpec, accepted: &[&str], rejected: &[&str]) {
		let (alphabet, automaton) = compiled(spec);
		for trace in accepted {
			assert!(
				automaton.accepts(&seq(&alphabet, trace)),
				"{} should accept '{}'",
				automaton.name(),
				trace
			);
		}
		for trace in rejected {
			assert!(
				!automaton.accepts(&seq(&alphabet, trace)),
				"{} should reject '{}'",
				automaton.name(),
				trace
			);
		}
	}

	#[test]
	fn unknown_template_is_rejected() {
		let result = Automaton::compile(&ConstraintSpec::unary("Eventually", "a"), &alphabet());
		assert!(matches!(result, Err(GenError::UnsupportedTemplate { name }) if name == "Eventually"));
	}

	#[test]
	fn template_names_are_case_insensitive() {
		assert_eq!(Template::parse("precedence").unwrap(), Template::Precedence);
		assert_eq!(Template::parse("ChainResponse").unwrap(), Template::ChainResponse);
	}

	#[test]
	fn wrong_arity_is_rejected() {
		let result = Automaton::compile(&ConstraintSpec::unary("Precedence", "a"), &alphabet());
		assert!(matches!(result, Err(GenError::InvalidArgument { .. })));
	}

	#[test]
	fn out_of_alphabet_argument_is_rejected() {
		let result = Automaton::compile(&ConstraintSpec::unary("Absence", "x"), &alphabet());
		assert!(matches!(result, Err(GenError::InvalidArgument { .. })));
	}

	#[test]
	fn count_on_non_existence_is_rejected() {
		let mut spec = ConstraintSpec::binary("Response", "a", "b");
		spec.count = Some(2);
		let result = Automaton::compile(&spec, &alphabet());
		assert!(matches!(result, Err(GenError::InvalidArgument { .. })));
	}

	#[test]
	fn existence_counts_occurrences() {
		check(
			ConstraintSpec::existence("a", 2),
			&["a a", "a b a c a"],
			&["", "a", "b a c"],
		);
	}

	#[test]
	fn existence_zero_is_vacuous() {
		check(ConstraintSpec::existence("a", 0), &["", "b c", "a a a"], &[]);
	}

	#[test]
	fn absence_forbids_the_symbol() {
		check(ConstraintSpec::unary("Absence", "a"), &["", "b c b"], &["a", "b a"]);
	}

	#[test]
	fn init_fixes_the_first_symbol() {
		check(ConstraintSpec::unary("Init", "a"), &["a", "a b c"], &["", "b a"]);
	}

	#[test]
	fn last_fixes_the_final_symbol() {
		check(ConstraintSpec::unary("Last", "a"), &["a", "b a", "a b a"], &["", "a b"]);
	}

	#[test]
	fn precedence_requires_an_earlier_a() {
		check(
			ConstraintSpec::binary("Precedence", "a", "b"),
			&["", "c", "a b", "a c b b"],
			&["b", "c b a"],
		);
	}

	#[test]
	fn response_requires_a_later_b() {
		check(
			ConstraintSpec::binary("Response", "a", "b"),
			&["", "b", "a b", "a c a b"],
			&["a", "a b a"],
		);
	}

	#[test]
	fn chain_precedence_requires_immediate_predecessor() {
		check(
			ConstraintSpec::binary("ChainPrecedence", "a", "b"),
			&["", "a b", "a b a b", "a c"],
			&["b", "a c b"],
		);
	}

	#[test]
	fn chain_response_requires_immediate_successor() {
		check(
			ConstraintSpec::binary("ChainResponse", "a", "b"),
			&["", "a b", "a b c a b"],
			&["a", "a c", "a a b"],
		);
	}

	#[test]
	fn coexistence_is_both_or_neither() {
		check(
			ConstraintSpec::binary("Coexistence", "a", "b"),
			&["", "c", "a b", "b c a"],
			&["a", "b b"],
		);
	}

	#[test]
	fn choice_requires_at_least_one() {
		check(
			ConstraintSpec::binary("Choice", "a", "b"),
			&["a", "b", "c a"],
			&["", "c"],
		);
	}

	#[test]
	fn exclusive_choice_forbids_both() {
		check(
			ConstraintSpec::binary("ExclusiveChoice", "a", "b"),
			&["a", "b", "a c a"],
			&["", "c", "a b"],
		);
	}

	#[test]
	fn equal_arguments_keep_the_informal_reading() {
		// Precedence(a, a): a can never occur (no strictly earlier a).
		check(
			ConstraintSpec::binary("Precedence", "a", "a"),
			&["", "b c"],
			&["a", "b a"],
		);
		// Response(a, a): every a needs a later a, so the last one fails.
		check(
			ConstraintSpec::binary("Response", "a", "a"),
			&["", "b"],
			&["a", "a a"],
		);
		// Coexistence(a, a) holds vacuously.
		check(ConstraintSpec::binary("Coexistence", "a", "a"), &["", "a", "a a"], &[]);
	}
}
