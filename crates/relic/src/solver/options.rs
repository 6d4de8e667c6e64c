//! Configuration of the solving pipeline and the progress reporting
//! surface.

use std::{
	fmt::Debug,
	rc::Rc,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
};

use tracing::debug;

use crate::{
	ast::{Decl, Relation, Variable},
	solver::sat::{SatFactory, Varisat},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
/// The encoding used for integer expressions.
#[non_exhaustive]
pub enum IntEncoding {
	#[default]
	/// Two's-complement binary encoding of the configured bit width.
	TwosComplement,
}

#[derive(Clone, Debug)]
/// Structure holding the options used to configure a [`crate::Solver`] and
/// the translations it performs.
pub struct Options {
	/// The factory producing SAT back-end instances.
	solver: Rc<dyn SatFactory>,
	/// The receiver of progress callbacks.
	reporter: Rc<dyn Reporter>,
	/// The encoding used for integer expressions.
	int_encoding: IntEncoding,
	/// The bit width of integer expressions, in `[1, 32]`.
	bitwidth: u32,
	/// The universal nesting depth up to which existentials are
	/// skolemized; `-1` disables skolemization.
	skolem_depth: i32,
	/// Whether translations retain a log of their variable allocation.
	log_translation: bool,
	/// The depth to which circuit gates are inspected for sharing; values
	/// of two and above enable absorption checks.
	sharing: u32,
	/// Whether rewriting passes record the provenance of rewritten
	/// formulas in the translation log.
	track_formulas: bool,
	/// The cooperative interrupt flag polled during translation.
	interrupt: Option<Arc<AtomicBool>>,
}

/// The progress callback surface of the translation and solving pipeline.
///
/// All methods have empty defaults; implementations override the events
/// they care about.
pub trait Reporter: Debug {
	/// Symmetry detection over the bounds is starting.
	fn detecting_symmetries(&self) {}

	/// Generation of a symmetry-breaking predicate is starting.
	fn generating_sbp(&self) {}

	/// The given declaration is being replaced by the skolem constant
	/// `skolem` under the given enclosing universal variables.
	fn skolemizing(&self, _decl: &Decl, _skolem: &Relation, _universals: &[Variable]) {}

	/// The SAT solver is being invoked on the translated clauses.
	fn solving_cnf(&self, _primary: usize, _variables: usize, _clauses: usize) {}

	/// The FOL-to-Boolean translation is starting.
	fn translating_to_boolean(&self) {}

	/// The Boolean-to-CNF translation is starting.
	fn translating_to_cnf(&self) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// A [`Reporter`] that forwards every event to [`tracing`] at debug level.
pub struct TraceReporter;

impl Options {
	/// The bit width of integer expressions.
	pub fn bitwidth(&self) -> u32 {
		self.bitwidth
	}

	/// The encoding used for integer expressions.
	pub fn int_encoding(&self) -> IntEncoding {
		self.int_encoding
	}

	/// Whether the cooperative interrupt flag has been raised.
	pub(crate) fn interrupted(&self) -> bool {
		self.interrupt
			.as_ref()
			.is_some_and(|flag| flag.load(Ordering::Relaxed))
	}

	/// Whether translations retain a log of their variable allocation.
	pub fn log_translation(&self) -> bool {
		self.log_translation
	}

	/// The receiver of progress callbacks.
	pub fn reporter(&self) -> &dyn Reporter {
		self.reporter.as_ref()
	}

	/// The factory producing SAT back-end instances.
	pub fn sat_factory(&self) -> &dyn SatFactory {
		self.solver.as_ref()
	}

	/// The depth to which circuit gates are inspected for sharing.
	pub fn sharing(&self) -> u32 {
		self.sharing
	}

	/// The universal nesting depth up to which existentials are
	/// skolemized.
	pub fn skolem_depth(&self) -> i32 {
		self.skolem_depth
	}

	/// Whether rewriting passes record the provenance of rewritten
	/// formulas.
	pub fn track_formulas(&self) -> bool {
		self.track_formulas
	}

	/// Change the bit width of integer expressions.
	///
	/// Panics when the width is not in `[1, 32]`.
	pub fn with_bitwidth(mut self, bitwidth: u32) -> Self {
		assert!(
			(1..=32).contains(&bitwidth),
			"the bit width must be between 1 and 32"
		);
		self.bitwidth = bitwidth;
		self
	}

	/// Change the encoding used for integer expressions.
	pub fn with_int_encoding(mut self, encoding: IntEncoding) -> Self {
		self.int_encoding = encoding;
		self
	}

	/// Install a cooperative interrupt flag; raising it aborts the solve
	/// at the next translation boundary.
	pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
		self.interrupt = Some(flag);
		self
	}

	/// Change whether translations retain a log of their variable
	/// allocation.
	pub fn with_log_translation(mut self, log: bool) -> Self {
		self.log_translation = log;
		self
	}

	/// Change the receiver of progress callbacks.
	pub fn with_reporter(mut self, reporter: Rc<dyn Reporter>) -> Self {
		self.reporter = reporter;
		self
	}

	/// Change the depth to which circuit gates are inspected for sharing.
	///
	/// Panics when the depth is zero.
	pub fn with_sharing(mut self, sharing: u32) -> Self {
		assert!(sharing >= 1, "the sharing depth must be at least one");
		self.sharing = sharing;
		self
	}

	/// Change the universal nesting depth up to which existentials are
	/// skolemized; `-1` disables skolemization.
	///
	/// Panics when the depth is below `-1`.
	pub fn with_skolem_depth(mut self, depth: i32) -> Self {
		assert!(depth >= -1, "the skolem depth must be at least -1");
		self.skolem_depth = depth;
		self
	}

	/// Change the factory producing SAT back-end instances.
	pub fn with_solver(mut self, solver: Rc<dyn SatFactory>) -> Self {
		self.solver = solver;
		self
	}

	/// Change whether rewriting passes record the provenance of rewritten
	/// formulas in the translation log.
	pub fn with_track_formulas(mut self, track: bool) -> Self {
		self.track_formulas = track;
		self
	}
}

impl Default for Options {
	fn default() -> Self {
		Options {
			solver: Rc::new(Varisat),
			reporter: Rc::new(TraceReporter),
			int_encoding: IntEncoding::default(),
			bitwidth: 4,
			skolem_depth: 0,
			log_translation: false,
			sharing: 3,
			track_formulas: false,
			interrupt: None,
		}
	}
}

impl Reporter for TraceReporter {
	fn detecting_symmetries(&self) {
		debug!("detecting symmetries");
	}

	fn generating_sbp(&self) {
		debug!("generating symmetry-breaking predicate");
	}

	fn skolemizing(&self, decl: &Decl, skolem: &Relation, universals: &[Variable]) {
		debug!(
			variable = %decl.variable,
			skolem = %skolem,
			universals = universals.len(),
			"skolemizing declaration"
		);
	}

	fn solving_cnf(&self, primary: usize, variables: usize, clauses: usize) {
		debug!(primary, variables, clauses, "solving cnf");
	}

	fn translating_to_boolean(&self) {
		debug!("translating to boolean");
	}

	fn translating_to_cnf(&self) {
		debug!("translating to cnf");
	}
}

#[cfg(test)]
mod tests {
	use crate::solver::options::Options;

	#[test]
	fn test_defaults() {
		let options = Options::default();
		assert_eq!(options.bitwidth(), 4);
		assert_eq!(options.skolem_depth(), 0);
		assert_eq!(options.sharing(), 3);
		assert!(!options.log_translation());
		assert!(!options.interrupted());
		assert!(options.sat_factory().incremental());
	}

	#[test]
	#[should_panic(expected = "between 1 and 32")]
	fn test_bitwidth_bounds() {
		let _ = Options::default().with_bitwidth(33);
	}

	#[test]
	#[should_panic(expected = "at least -1")]
	fn test_skolem_depth_bounds() {
		let _ = Options::default().with_skolem_depth(-2);
	}
}
