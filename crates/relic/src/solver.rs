//! Module containing the solving driver: translation, trivial-outcome
//! detection, SAT solving, instance reconstruction, and solution
//! enumeration.

pub mod options;
pub mod sat;

use std::{
	fmt::{self, Display, Formatter},
	mem,
	time::{Duration, Instant},
};

use delegate::delegate;
use thiserror::Error;
use tracing::debug;

use crate::{
	ast::{AstPool, FormulaId, IntoExpr, Relation},
	instance::bounds::{Bounds, Instance},
	solver::{options::Options, sat::SatError},
	translate::{self, Translated, Translation, TranslationError, TrivialFormula},
};

#[derive(Debug)]
#[allow(
	variant_size_differences,
	reason = "the running state carries the boxed translation"
)]
/// The state of a [`Solutions`] iterator between `next` calls.
enum EnumerationState {
	/// The terminating outcome has been produced.
	Done,
	/// The current formula still needs to be translated.
	Fresh,
	/// An incremental SAT instance is being re-solved under blocking
	/// clauses.
	Running(Box<Translation>, Duration),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The outcome of a solving attempt.
pub enum Outcome {
	/// The formula is satisfiable, witnessed by the instance.
	Satisfiable,
	/// The formula folded to true before any variable was allocated.
	TriviallySatisfiable,
	/// The formula folded to false before any variable was allocated.
	TriviallyUnsatisfiable,
	/// The formula has no instance within the bounds.
	Unsatisfiable,
}

#[derive(Clone, Debug)]
/// The answer of a [`Solver::solve`] call: an outcome, the witnessing
/// instance when there is one, and solving statistics.
pub struct Solution {
	/// The outcome of the attempt.
	outcome: Outcome,
	/// The witnessing instance of a satisfiable outcome.
	instance: Option<Instance>,
	/// The statistics of the attempt.
	statistics: Statistics,
}

#[derive(Debug)]
/// A lazy sequence of all solutions of a formula, produced by
/// [`Solver::solve_all`].
///
/// Non-trivial solutions are enumerated by adding a blocking clause over
/// the primary variables after each model; a trivially satisfiable formula
/// is blocked by binding fresh witness relations exactly to the found
/// tuples and conjoining a disequality. The final element is always the
/// terminating unsatisfiable outcome.
pub struct Solutions<'a> {
	/// The pool that owns the enumerated formula.
	pool: &'a mut AstPool,
	/// The options of the enclosing solver.
	options: Options,
	/// The formula being enumerated, extended by trivial blocking.
	formula: FormulaId,
	/// The bounds being enumerated, extended by witness relations.
	bounds: Bounds,
	/// The iteration state.
	state: EnumerationState,
}

#[derive(Error, Debug)]
/// An error raised by a [`Solver`] call.
pub enum SolveError {
	#[error("solving was aborted")]
	/// The cooperative interrupt flag was raised, or the back-end failed.
	Aborted,
	#[error("higher-order declaration `{decl}' cannot be translated")]
	/// A declaration with a multiplicity other than `one` survived to the
	/// translation in a context where it could not be skolemized away.
	HigherOrderDecl {
		/// A rendering of the offending declaration.
		decl: String,
	},
	#[error("the SAT solver exceeded its time budget")]
	/// The SAT back-end gave up after exhausting its time budget.
	Timeout,
	#[error("unbound leaf `{name}'")]
	/// A variable occurred free, or a relation was missing from the
	/// bounds.
	UnboundLeaf {
		/// The name of the unbound relation or variable.
		name: String,
	},
}

#[derive(Clone, Debug, Default)]
/// Statistics of one solving attempt.
pub struct Statistics {
	/// The number of primary variables of the translation.
	primary_variables: usize,
	/// The total number of variables of the translation.
	variables: usize,
	/// The number of clauses of the translation.
	clauses: usize,
	/// The time spent translating.
	translation_time: Duration,
	/// The time spent solving.
	solving_time: Duration,
}

#[derive(Clone, Debug, Default)]
/// The relational model finder: translates formulas under bounds to CNF
/// and interprets satisfying assignments back into instances.
pub struct Solver {
	/// The options configuring every solve of this solver.
	options: Options,
}

impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Outcome::Satisfiable => "SATISFIABLE",
			Outcome::TriviallySatisfiable => "TRIVIALLY_SATISFIABLE",
			Outcome::TriviallyUnsatisfiable => "TRIVIALLY_UNSATISFIABLE",
			Outcome::Unsatisfiable => "UNSATISFIABLE",
		})
	}
}

impl Outcome {
	/// Whether the outcome witnesses satisfiability.
	pub fn is_satisfiable(&self) -> bool {
		matches!(self, Outcome::Satisfiable | Outcome::TriviallySatisfiable)
	}
}

impl Solution {
	/// The witnessing instance of a satisfiable outcome.
	pub fn instance(&self) -> Option<&Instance> {
		self.instance.as_ref()
	}

	/// The outcome of the attempt.
	pub fn outcome(&self) -> Outcome {
		self.outcome
	}

	/// The statistics of the attempt.
	pub fn statistics(&self) -> &Statistics {
		&self.statistics
	}

	delegate! {
		to self.statistics {
			/// The number of clauses of the translation.
			pub fn clauses(&self) -> usize;
			/// The number of primary variables of the translation.
			pub fn primary_variables(&self) -> usize;
			/// The total number of variables of the translation.
			pub fn variables(&self) -> usize;
		}
	}
}

impl Display for Solution {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match &self.instance {
			Some(instance) => write!(f, "{}: {instance}", self.outcome),
			None => write!(f, "{}", self.outcome),
		}
	}
}

impl Iterator for Solutions<'_> {
	type Item = Result<Solution, SolveError>;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			match mem::replace(&mut self.state, EnumerationState::Done) {
				EnumerationState::Done => return None,
				EnumerationState::Fresh => {
					let start = Instant::now();
					match translate::translate(self.pool, self.formula, &self.bounds, &self.options)
					{
						Ok(Translated::Cnf(translation)) => {
							self.state = EnumerationState::Running(
								Box::new(translation),
								start.elapsed(),
							);
						},
						Ok(Translated::Trivial(trivial)) => {
							let solution = trivial_solution(trivial, start.elapsed());
							if solution.outcome() == Outcome::TriviallySatisfiable {
								let instance =
									solution.instance().expect("trivially satisfiable").clone();
								self.block_trivial(&instance);
								self.state = EnumerationState::Fresh;
							}
							return Some(Ok(solution));
						},
						Err(e) => return Some(Err(e.into())),
					}
				},
				EnumerationState::Running(mut translation, translation_time) => {
					self.options.reporter().solving_cnf(
						translation.num_primary_variables(),
						translation.num_variables(),
						translation.num_clauses(),
					);
					let start = Instant::now();
					let solved = match translation.solve() {
						Ok(solved) => solved,
						Err(e) => return Some(Err(e.into())),
					};
					let statistics = Statistics {
						primary_variables: translation.num_primary_variables(),
						variables: translation.num_variables(),
						clauses: translation.num_clauses(),
						translation_time,
						solving_time: start.elapsed(),
					};
					if solved {
						let instance = translation.interpret();
						translation.block_model();
						self.state = EnumerationState::Running(translation, translation_time);
						return Some(Ok(Solution {
							outcome: Outcome::Satisfiable,
							instance: Some(instance),
							statistics,
						}));
					}
					return Some(Ok(Solution {
						outcome: Outcome::Unsatisfiable,
						instance: None,
						statistics,
					}));
				},
			}
		}
	}
}

impl Solutions<'_> {
	/// Block a trivially satisfiable instance: every bound relation gets a
	/// fresh witness relation bound exactly to its found tuples, and the
	/// formula is extended with the disequality that some relation must
	/// differ from its witness.
	fn block_trivial(&mut self, instance: &Instance) {
		let relations: Vec<Relation> = self.bounds.relations().cloned().collect();
		let mut differs = Vec::with_capacity(relations.len());
		for relation in relations {
			let tuples = instance
				.tuples(&relation)
				.expect("the instance covers every bound relation")
				.clone();
			let witness = self
				.pool
				.relation(format!("{}'", relation.name()), relation.arity());
			self.bounds.bound_exactly(&witness, tuples);
			let re = (&relation).into_expr(self.pool);
			let we = (&witness).into_expr(self.pool);
			let same = self.pool.equals(re, we);
			differs.push(self.pool.not(same));
		}
		let blocking = self.pool.or_all(differs);
		self.formula = self.pool.and(self.formula, blocking);
		debug!("blocked trivially satisfiable instance");
	}
}

impl Statistics {
	/// The number of clauses of the translation.
	pub fn clauses(&self) -> usize {
		self.clauses
	}

	/// The number of primary variables of the translation.
	pub fn primary_variables(&self) -> usize {
		self.primary_variables
	}

	/// The time spent solving.
	pub fn solving_time(&self) -> Duration {
		self.solving_time
	}

	/// The time spent translating.
	pub fn translation_time(&self) -> Duration {
		self.translation_time
	}

	/// The total number of variables of the translation.
	pub fn variables(&self) -> usize {
		self.variables
	}
}

impl Display for Statistics {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} primary vars; {} vars; {} clauses; {}ms translation; {}ms solving",
			self.primary_variables,
			self.variables,
			self.clauses,
			self.translation_time.as_millis(),
			self.solving_time.as_millis()
		)
	}
}

impl From<SatError> for SolveError {
	fn from(e: SatError) -> Self {
		match e {
			SatError::Aborted => SolveError::Aborted,
			SatError::Timeout => SolveError::Timeout,
		}
	}
}

impl From<TranslationError> for SolveError {
	fn from(e: TranslationError) -> Self {
		match e {
			TranslationError::Aborted => SolveError::Aborted,
			TranslationError::HigherOrderDecl { decl } => SolveError::HigherOrderDecl { decl },
			TranslationError::UnboundLeaf { name } => SolveError::UnboundLeaf { name },
		}
	}
}

impl Solver {
	/// Create a solver with the given options.
	pub fn new(options: Options) -> Self {
		Solver { options }
	}

	/// The options configuring every solve of this solver.
	pub fn options(&self) -> &Options {
		&self.options
	}

	/// Decide the satisfiability of `formula` within `bounds` and, when
	/// satisfiable, produce a witnessing instance.
	///
	/// The caller's bounds are never modified; skolem constants live in an
	/// internal copy and appear in the returned instance.
	pub fn solve(
		&self,
		pool: &mut AstPool,
		formula: FormulaId,
		bounds: &Bounds,
	) -> Result<Solution, SolveError> {
		let start = Instant::now();
		match translate::translate(pool, formula, bounds, &self.options)? {
			Translated::Cnf(mut translation) => {
				let translation_time = start.elapsed();
				if let Some(log) = translation.log() {
					debug!(
						relations = log.ranges().len(),
						skolems = log.skolems().len(),
						tracked = log.sources().map_or(0, |s| s.len()),
						"retained translation log"
					);
				}
				self.options.reporter().solving_cnf(
					translation.num_primary_variables(),
					translation.num_variables(),
					translation.num_clauses(),
				);
				let solve_start = Instant::now();
				let solved = translation.solve()?;
				let statistics = Statistics {
					primary_variables: translation.num_primary_variables(),
					variables: translation.num_variables(),
					clauses: translation.num_clauses(),
					translation_time,
					solving_time: solve_start.elapsed(),
				};
				debug!(solved, %statistics, "solved cnf");
				if solved {
					Ok(Solution {
						outcome: Outcome::Satisfiable,
						instance: Some(translation.interpret()),
						statistics,
					})
				} else {
					Ok(Solution {
						outcome: Outcome::Unsatisfiable,
						instance: None,
						statistics,
					})
				}
			},
			Translated::Trivial(trivial) => Ok(trivial_solution(trivial, start.elapsed())),
		}
	}

	/// Lazily enumerate all solutions of `formula` within `bounds`.
	///
	/// Panics when the configured SAT back-end is not incremental. The
	/// final element of the sequence is the terminating unsatisfiable
	/// outcome; iteration ends after it.
	pub fn solve_all<'a>(
		&self,
		pool: &'a mut AstPool,
		formula: FormulaId,
		bounds: &Bounds,
	) -> Solutions<'a> {
		assert!(
			self.options.sat_factory().incremental(),
			"solution enumeration requires an incremental SAT back-end"
		);
		Solutions {
			pool,
			options: self.options.clone(),
			formula,
			bounds: bounds.clone(),
			state: EnumerationState::Fresh,
		}
	}
}

/// Convert a trivial-formula signal into a solution: trivially
/// satisfiable formulas are witnessed by the lower bounds of every
/// relation, and the statistics report zero variables and clauses.
fn trivial_solution(trivial: TrivialFormula, translation_time: Duration) -> Solution {
	let statistics = Statistics {
		primary_variables: 0,
		variables: 0,
		clauses: 0,
		translation_time,
		solving_time: Duration::ZERO,
	};
	if trivial.value {
		let mut instance = Instance::new(trivial.bounds.universe().clone());
		for relation in trivial.bounds.relations() {
			let lower = trivial
				.bounds
				.lower(relation)
				.expect("relation is bound")
				.clone();
			instance.add(relation, lower);
		}
		for (value, tuple) in trivial.bounds.ints() {
			instance.add_int(value, tuple.clone());
		}
		Solution {
			outcome: Outcome::TriviallySatisfiable,
			instance: Some(instance),
			statistics,
		}
	} else {
		Solution {
			outcome: Outcome::TriviallyUnsatisfiable,
			instance: None,
			statistics,
		}
	}
}
