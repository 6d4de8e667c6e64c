//! Definitional Boolean-to-CNF translation.
//!
//! A two-pass algorithm over the circuit DAG. The first pass records the
//! polarities with which every gate is reachable from the root; the second
//! walks the gates bottom-up and emits, for each reachable gate, only the
//! defining clauses demanded by its recorded polarities. Gates unreachable
//! at any polarity contribute no variables and no clauses, and CNF
//! variables are renumbered densely so that the root's variable equals the
//! total variable count.

use std::collections::HashMap;

use tracing::trace;

use crate::{
	circuit::{BoolValue, CircuitFactory, Gate},
	solver::{options::Options, sat::SatSolver},
	translate::TranslationError,
};

/// The flag recording that a gate is reachable with negative polarity.
const NEG: u8 = 2;
/// The flag recording that a gate is reachable with positive polarity.
const POS: u8 = 1;

/// The state of one clausification pass.
struct Clausifier<'a> {
	/// The circuit being clausified.
	factory: &'a CircuitFactory,
	/// The number of primary variables, which keep their labels.
	num_primary: usize,
	/// The polarities with which each gate has been reached.
	polarity: HashMap<i32, u8>,
	/// The CNF variable assigned to each reachable gate.
	vars: HashMap<i32, i32>,
}

impl Clausifier<'_> {
	/// The CNF literal of a circuit value.
	fn lit(&self, value: BoolValue) -> i32 {
		let label = value.label();
		let var = if label.unsigned_abs() as usize <= self.num_primary {
			label.abs()
		} else {
			self.vars[&label.abs()]
		};
		if label < 0 {
			-var
		} else {
			var
		}
	}

	/// Record that `value` is reachable with the polarities of `pol`,
	/// descending into newly reached inputs.
	fn mark(&mut self, value: BoolValue, mut pol: u8) {
		debug_assert!(!value.is_constant(), "constants never reach the cnf pass");
		let mut label = value.label();
		if label < 0 {
			label = -label;
			pol = flip(pol);
		}
		if label as usize <= self.num_primary {
			return;
		}
		let seen = self.polarity.entry(label).or_insert(0);
		let added = pol & !*seen;
		if added == 0 {
			return;
		}
		*seen |= added;
		match self.factory.gate(label).expect("gate label") {
			Gate::And(inputs) | Gate::Or(inputs) => {
				for &input in inputs {
					self.mark(input, added);
				}
			},
			Gate::Ite(c, t, e) => {
				let (c, t, e) = (*c, *t, *e);
				// The condition is used by both defining clauses of either
				// polarity.
				self.mark(c, POS | NEG);
				self.mark(t, added);
				self.mark(e, added);
			},
		}
	}
}

/// Swap the positive and negative polarity flags.
fn flip(pol: u8) -> u8 {
	((pol & POS) << 1) | ((pol & NEG) >> 1)
}

/// Translate the circuit rooted at `root` into clauses on `sat`.
///
/// The root must not be constant; trivial formulas are detected before this
/// pass runs.
pub(crate) fn clausify(
	factory: &CircuitFactory,
	root: BoolValue,
	sat: &mut dyn SatSolver,
	options: &Options,
) -> Result<(), TranslationError> {
	debug_assert!(root.label().abs() <= factory.max_label(), "foreign root");
	let num_primary = factory.num_variables();
	let mut clausifier = Clausifier {
		factory,
		num_primary,
		polarity: HashMap::new(),
		vars: HashMap::new(),
	};
	clausifier.mark(root, POS);

	// Primaries keep labels 1..=num_primary; reachable gates are numbered
	// densely above them in ascending label order, so the root gate ends up
	// with the largest variable.
	let mut total = num_primary;
	for (label, _) in factory.gates() {
		if clausifier.polarity.contains_key(&label) {
			total += 1;
			let _ = clausifier.vars.insert(label, total as i32);
		}
	}
	sat.add_variables(total);

	for (label, gate) in factory.gates() {
		let Some(&pol) = clausifier.polarity.get(&label) else {
			continue;
		};
		if options.interrupted() {
			return Err(TranslationError::Aborted);
		}
		let o = clausifier.vars[&label];
		match gate {
			Gate::And(inputs) => {
				if pol & POS != 0 {
					for &input in inputs {
						sat.add_clause(vec![-o, clausifier.lit(input)]);
					}
				}
				if pol & NEG != 0 {
					let mut clause = Vec::with_capacity(inputs.len() + 1);
					clause.push(o);
					clause.extend(inputs.iter().map(|&i| -clausifier.lit(i)));
					sat.add_clause(clause);
				}
			},
			Gate::Or(inputs) => {
				if pol & POS != 0 {
					let mut clause = Vec::with_capacity(inputs.len() + 1);
					clause.push(-o);
					clause.extend(inputs.iter().map(|&i| clausifier.lit(i)));
					sat.add_clause(clause);
				}
				if pol & NEG != 0 {
					for &input in inputs {
						sat.add_clause(vec![o, -clausifier.lit(input)]);
					}
				}
			},
			Gate::Ite(c, t, e) => {
				let (c, t, e) = (
					clausifier.lit(*c),
					clausifier.lit(*t),
					clausifier.lit(*e),
				);
				if pol & POS != 0 {
					sat.add_clause(vec![-o, -c, t]);
					sat.add_clause(vec![-o, c, e]);
				}
				if pol & NEG != 0 {
					sat.add_clause(vec![o, -c, -t]);
					sat.add_clause(vec![o, c, -e]);
				}
			},
		}
	}
	sat.add_clause(vec![clausifier.lit(root)]);
	trace!(
		variables = total,
		clauses = sat.num_clauses(),
		"clausified circuit"
	);
	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::{
		circuit::{BoolValue, CircuitFactory},
		solver::{
			options::Options,
			sat::{SatError, SatSolver},
		},
		translate::cnf::clausify,
	};

	#[derive(Debug, Default)]
	/// A recording back-end that keeps every added clause.
	struct Recorder {
		/// The number of declared variables.
		vars: usize,
		/// The added clauses, in order.
		clauses: Vec<Vec<i32>>,
	}

	impl SatSolver for Recorder {
		fn add_clause(&mut self, lits: Vec<i32>) {
			self.clauses.push(lits);
		}

		fn add_variables(&mut self, n: usize) {
			self.vars += n;
		}

		fn num_clauses(&self) -> usize {
			self.clauses.len()
		}

		fn num_variables(&self) -> usize {
			self.vars
		}

		fn set_timeout(&mut self, _seconds: u32) {}

		fn solve(&mut self) -> Result<bool, SatError> {
			unreachable!("the recorder never solves")
		}

		fn timeout(&self) -> u32 {
			u32::MAX
		}

		fn value_of(&self, _var: usize) -> bool {
			unreachable!("the recorder never solves")
		}
	}

	#[test]
	fn test_polarity_halves_clauses() {
		// root = v1 ∧ (v2 ∨ v3); everything is reached positively only.
		let mut f = CircuitFactory::new(3, 3);
		let (v1, v2, v3) = (f.variable(1), f.variable(2), f.variable(3));
		let or = f.or(v2, v3);
		let root = f.and(v1, or);

		let mut sat = Recorder::default();
		clausify(&f, root, &mut sat, &Options::default()).unwrap();

		// or gate -> var 4, and gate (root) -> var 5.
		assert_eq!(sat.num_variables(), 5);
		assert_eq!(
			sat.clauses,
			vec![
				vec![-4, 2, 3],
				vec![-5, 1],
				vec![-5, 4],
				vec![5],
			]
		);
	}

	#[test]
	fn test_negative_polarity() {
		// root = ¬(v1 ∧ v2): the and gate is reached negatively only.
		let mut f = CircuitFactory::new(2, 3);
		let (v1, v2) = (f.variable(1), f.variable(2));
		let and = f.and(v1, v2);
		let root = !and;

		let mut sat = Recorder::default();
		clausify(&f, root, &mut sat, &Options::default()).unwrap();

		assert_eq!(sat.num_variables(), 3);
		assert_eq!(sat.clauses, vec![vec![3, -1, -2], vec![-3]]);
	}

	#[test]
	fn test_ite_clauses() {
		let mut f = CircuitFactory::new(3, 3);
		let (c, t, e) = (f.variable(1), f.variable(2), f.variable(3));
		let root = f.ite(c, t, e);

		let mut sat = Recorder::default();
		clausify(&f, root, &mut sat, &Options::default()).unwrap();

		assert_eq!(sat.num_variables(), 4);
		assert_eq!(sat.clauses, vec![vec![-4, -1, 2], vec![-4, 1, 3], vec![4]]);
	}

	#[test]
	fn test_variable_root() {
		let f = CircuitFactory::new(2, 3);
		let root = !f.variable(2);

		let mut sat = Recorder::default();
		clausify(&f, root, &mut sat, &Options::default()).unwrap();

		assert_eq!(sat.num_variables(), 2);
		assert_eq!(sat.clauses, vec![vec![-2]]);
	}

	#[test]
	fn test_unreachable_gate_contributes_nothing() {
		let mut f = CircuitFactory::new(3, 3);
		let (v1, v2, v3) = (f.variable(1), f.variable(2), f.variable(3));
		// An orphan gate that the root never reaches.
		let _orphan = f.or(v2, v3);
		let root = f.and(v1, v2);

		let mut sat = Recorder::default();
		clausify(&f, root, &mut sat, &Options::default()).unwrap();

		// Only the root gate gets a variable; its label is renumbered to 4.
		assert_eq!(sat.num_variables(), 4);
		assert_eq!(sat.clauses, vec![vec![-4, 1], vec![-4, 2], vec![4]]);
	}
}
