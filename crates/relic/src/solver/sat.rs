//! The minimal interface required of every SAT back-end, and the bundled
//! back-end built on the pure-Rust `varisat` CDCL solver.

use std::fmt::{self, Debug, Formatter};

use thiserror::Error;
use varisat::{ExtendFormula, Lit};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// An error raised by a SAT back-end during solving.
pub enum SatError {
	#[error("the SAT solver was aborted")]
	/// The back-end failed or was cooperatively cancelled mid-search.
	Aborted,
	#[error("the SAT solver exceeded its time budget")]
	/// The back-end gave up after exhausting its configured time budget.
	Timeout,
}

/// A factory producing fresh instances of one SAT back-end, together with
/// the capabilities the back-end advertises.
pub trait SatFactory: Debug {
	/// Whether instances accept further clauses after a `solve` call;
	/// required for solution enumeration.
	fn incremental(&self) -> bool {
		false
	}

	/// Create a fresh, empty back-end instance.
	fn instance(&self) -> Box<dyn SatSolver>;
}

/// The minimal interface required of every SAT back-end.
pub trait SatSolver: Debug {
	/// Add a clause over the current vocabulary.
	///
	/// Literals are nonzero and bounded by the number of variables.
	/// Repeated and complementary literals are permitted and keep their
	/// natural clause semantics.
	fn add_clause(&mut self, lits: Vec<i32>);

	/// Grow the vocabulary by `n` variables.
	fn add_variables(&mut self, n: usize);

	/// The number of clauses added so far.
	fn num_clauses(&self) -> usize;

	/// The number of variables in the vocabulary.
	fn num_variables(&self) -> usize;

	/// Set the time budget of subsequent `solve` calls, in seconds.
	fn set_timeout(&mut self, seconds: u32);

	/// Decide the satisfiability of the conjunction of the added clauses.
	fn solve(&mut self) -> Result<bool, SatError>;

	/// The configured time budget in seconds; `u32::MAX` when unbounded.
	fn timeout(&self) -> u32;

	/// The value of `var` in the satisfying assignment.
	///
	/// Panics unless the preceding `solve` call returned true.
	fn value_of(&self, var: usize) -> bool;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// The factory of the bundled [`varisat`] back-end.
pub struct Varisat;

/// A SAT instance backed by an in-process [`varisat`] solver.
///
/// The back-end is incremental: clauses may be added after a `solve` call.
/// The time budget is recorded but not enforced, as the underlying solver
/// cannot interrupt a running search.
struct VarisatInstance {
	/// The underlying solver.
	solver: varisat::Solver<'static>,
	/// The number of declared variables.
	num_vars: usize,
	/// The number of added clauses.
	num_clauses: usize,
	/// The recorded time budget in seconds.
	timeout: u32,
	/// The satisfying assignment of the last successful `solve` call.
	model: Option<Vec<bool>>,
}

impl SatFactory for Varisat {
	fn incremental(&self) -> bool {
		true
	}

	fn instance(&self) -> Box<dyn SatSolver> {
		Box::new(VarisatInstance {
			solver: varisat::Solver::new(),
			num_vars: 0,
			num_clauses: 0,
			timeout: u32::MAX,
			model: None,
		})
	}
}

impl Debug for VarisatInstance {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("VarisatInstance")
			.field("num_vars", &self.num_vars)
			.field("num_clauses", &self.num_clauses)
			.field("timeout", &self.timeout)
			.finish()
	}
}

impl SatSolver for VarisatInstance {
	fn add_clause(&mut self, lits: Vec<i32>) {
		debug_assert!(
			lits.iter()
				.all(|&l| l != 0 && l.unsigned_abs() as usize <= self.num_vars),
			"literals must be nonzero and within the vocabulary"
		);
		let clause: Vec<Lit> = lits.iter().map(|&l| Lit::from_dimacs(l as isize)).collect();
		self.solver.add_clause(&clause);
		self.num_clauses += 1;
		self.model = None;
	}

	fn add_variables(&mut self, n: usize) {
		for _ in 0..n {
			let _ = self.solver.new_var();
		}
		self.num_vars += n;
	}

	fn num_clauses(&self) -> usize {
		self.num_clauses
	}

	fn num_variables(&self) -> usize {
		self.num_vars
	}

	fn set_timeout(&mut self, seconds: u32) {
		self.timeout = seconds;
	}

	fn solve(&mut self) -> Result<bool, SatError> {
		match self.solver.solve() {
			Ok(true) => {
				let mut model = vec![false; self.num_vars];
				for lit in self
					.solver
					.model()
					.expect("a satisfiable solve produces a model")
				{
					let dimacs = lit.to_dimacs();
					if dimacs > 0 {
						model[dimacs as usize - 1] = true;
					}
				}
				self.model = Some(model);
				Ok(true)
			},
			Ok(false) => {
				self.model = None;
				Ok(false)
			},
			Err(_) => Err(SatError::Aborted),
		}
	}

	fn timeout(&self) -> u32 {
		self.timeout
	}

	fn value_of(&self, var: usize) -> bool {
		assert!(var >= 1 && var <= self.num_vars, "variable out of range");
		self.model.as_ref().expect("no satisfying assignment available")[var - 1]
	}
}

#[cfg(test)]
mod tests {
	use crate::solver::sat::{SatFactory, Varisat};

	#[test]
	fn test_varisat_roundtrip() {
		let mut sat = Varisat.instance();
		sat.add_variables(2);
		sat.add_clause(vec![1, 2]);
		sat.add_clause(vec![-1]);
		assert_eq!(sat.num_variables(), 2);
		assert_eq!(sat.num_clauses(), 2);
		assert_eq!(sat.solve(), Ok(true));
		assert!(!sat.value_of(1));
		assert!(sat.value_of(2));

		// Incremental use: block the model and re-solve.
		sat.add_clause(vec![-2]);
		assert_eq!(sat.solve(), Ok(false));
	}

	#[test]
	fn test_varisat_empty_clause() {
		let mut sat = Varisat.instance();
		sat.add_variables(1);
		sat.add_clause(vec![]);
		assert_eq!(sat.solve(), Ok(false));
	}
}
