//! Module containing the translation pipeline from relational formulas and
//! bounds to CNF, and the interpretation of satisfying assignments back
//! into instances.
//!
//! The pipeline is: sharing analysis, skolemization, relation predicate
//! inlining, FOL-to-Boolean translation over symbolic matrices, and
//! definitional Boolean-to-CNF translation into a SAT back-end. A formula
//! whose circuit folds to a constant before the root is reified short-cuts
//! the pipeline with a [`Translated::Trivial`] outcome.

pub(crate) mod cnf;
pub(crate) mod fol2bool;
pub(crate) mod skolemize;

use std::collections::HashMap;

use delegate::delegate;
use thiserror::Error;
use tracing::debug;

use crate::{
	ast::{
		annotate::{Annotated, Node},
		AstPool, FormulaId, RelId, Relation, Variable,
	},
	circuit::CircuitFactory,
	instance::bounds::{Bounds, Instance},
	solver::{
		options::Options,
		sat::{SatError, SatSolver},
	},
};

#[derive(Clone, Copy, Debug)]
/// The contiguous block of primary variables allocated to one relation.
pub(crate) struct PrimaryRange {
	/// The label of the first variable of the block.
	start: usize,
	/// The number of variables of the block, one per tuple of the upper
	/// bound that is not in the lower bound, in ascending index order.
	count: usize,
}

#[derive(Debug)]
/// The product of a completed translation: a SAT instance whose variable
/// numbering is traceable back to the source relations.
pub(crate) struct Translation {
	/// The SAT instance holding the clauses of the translation.
	sat: Box<dyn SatSolver>,
	/// The bounds of the translation, extended with any skolem constants.
	bounds: Bounds,
	/// The primary variables allocated to each bound relation.
	primary: HashMap<RelId, PrimaryRange>,
	/// The total number of primary variables.
	num_primary: usize,
	/// The translation log, when logging was requested.
	log: Option<TranslationLog>,
}

#[derive(Debug)]
/// The retained record of how a translation numbered and rewrote its
/// problem, available when translation logging is enabled.
pub(crate) struct TranslationLog {
	/// The primary variable block of each relation, in allocation order.
	ranges: Vec<(Relation, PrimaryRange)>,
	/// The skolem constant introduced for each eliminated declaration.
	skolems: Vec<(Variable, Relation)>,
	/// The mapping from rewritten nodes to their sources, retained when
	/// formula tracking is enabled in addition to logging.
	sources: Option<HashMap<Node, Node>>,
}

#[derive(Debug)]
/// The result sum of the translation pipeline.
pub(crate) enum Translated {
	/// The formula was translated to CNF.
	Cnf(Translation),
	/// The formula folded to a constant before the root was reified.
	Trivial(TrivialFormula),
}

#[derive(Error, Debug, PartialEq, Eq)]
/// A fatal error raised by the translation pipeline.
pub(crate) enum TranslationError {
	#[error("translation was aborted")]
	/// The cooperative interrupt flag was raised during translation.
	Aborted,
	#[error("higher-order declaration `{decl}' cannot be translated")]
	/// A declaration with a multiplicity other than `one` survived to the
	/// translation in a context where it could not be skolemized away.
	HigherOrderDecl {
		/// A rendering of the offending declaration.
		decl: String,
	},
	#[error("unbound leaf `{name}'")]
	/// A variable occurred free, or a relation was missing from the bounds.
	UnboundLeaf {
		/// The name of the unbound relation or variable.
		name: String,
	},
}

#[derive(Clone, Debug)]
/// The control signal raised when a formula folds to a constant, carrying
/// the bounds as extended by any skolem constants installed before the
/// fold.
pub(crate) struct TrivialFormula {
	/// The constant value of the formula.
	pub(crate) value: bool,
	/// The bounds at the time of the fold.
	pub(crate) bounds: Bounds,
}

impl Translation {
	/// Add a clause blocking the current satisfying assignment of the
	/// primary variables.
	pub(crate) fn block_model(&mut self) {
		let clause: Vec<i32> = (1..=self.num_primary)
			.map(|v| {
				if self.sat.value_of(v) {
					-(v as i32)
				} else {
					v as i32
				}
			})
			.collect();
		self.sat.add_clause(clause);
	}

	/// Reconstruct the instance described by the satisfying assignment of
	/// the SAT instance.
	///
	/// Every relation starts from its lower bound; the tuples whose primary
	/// variables are true are added on top, so the instance always contains
	/// the lower bounds.
	pub(crate) fn interpret(&self) -> Instance {
		let mut instance = Instance::new(self.bounds.universe().clone());
		for relation in self.bounds.relations() {
			let lower = self.bounds.lower(relation).expect("relation is bound");
			let upper = self.bounds.upper(relation).expect("relation is bound");
			let mut tuples = lower.clone();
			let mut var = self.primary[&relation.id()].start;
			for index in upper.indices() {
				if lower.contains_index(index) {
					continue;
				}
				if self.sat.value_of(var) {
					tuples.insert_index(index);
				}
				var += 1;
			}
			instance.add(relation, tuples);
		}
		for (value, tuple) in self.bounds.ints() {
			instance.add_int(value, tuple.clone());
		}
		instance
	}

	/// The translation log, when logging was requested.
	pub(crate) fn log(&self) -> Option<&TranslationLog> {
		self.log.as_ref()
	}

	/// The number of primary variables of the translation.
	pub(crate) fn num_primary_variables(&self) -> usize {
		self.num_primary
	}

	/// Run the SAT solver on the translated clauses.
	pub(crate) fn solve(&mut self) -> Result<bool, SatError> {
		self.sat.solve()
	}

	delegate! {
		to self.sat {
			/// The number of clauses of the SAT instance.
			pub(crate) fn num_clauses(&self) -> usize;
			/// The total number of variables of the SAT instance.
			pub(crate) fn num_variables(&self) -> usize;
		}
	}
}

impl TranslationLog {
	/// The primary variable blocks of the translation, in allocation order.
	pub(crate) fn ranges(&self) -> &[(Relation, PrimaryRange)] {
		&self.ranges
	}

	/// The skolem constants introduced by the translation.
	pub(crate) fn skolems(&self) -> &[(Variable, Relation)] {
		&self.skolems
	}

	/// The rewritten-node provenance, when formula tracking was enabled.
	pub(crate) fn sources(&self) -> Option<&HashMap<Node, Node>> {
		self.sources.as_ref()
	}
}

/// Translate `formula` under `bounds` into a SAT instance, or detect that
/// it is trivially constant.
///
/// The caller's bounds are never modified; skolem constants extend an
/// internal copy that travels with the result.
pub(crate) fn translate(
	pool: &mut AstPool,
	formula: FormulaId,
	bounds: &Bounds,
	options: &Options,
) -> Result<Translated, TranslationError> {
	let mut bounds = bounds.clone();
	let annotated = Annotated::annotate_formula(pool, formula);
	let (annotated, skolems) = skolemize::skolemize(pool, annotated, &mut bounds, options)?;
	let annotated = skolemize::inline_predicates(pool, annotated);

	options.reporter().translating_to_boolean();
	let mut primary = HashMap::new();
	let mut ranges = Vec::new();
	let mut num_primary = 0usize;
	for relation in bounds.relations() {
		let lower = bounds.lower(relation).expect("relation is bound");
		let upper = bounds.upper(relation).expect("relation is bound");
		let range = PrimaryRange {
			start: num_primary + 1,
			count: upper.len() - lower.len(),
		};
		let _ = primary.insert(relation.id(), range);
		ranges.push((relation.clone(), range));
		num_primary += range.count;
	}
	debug!(num_primary, "allocated primary variables");

	let mut factory = CircuitFactory::new(num_primary, options.sharing());
	let root = fol2bool::formula(pool, &annotated, &bounds, &primary, &mut factory, options)?;
	if root.is_constant() {
		debug!("formula folded to a constant");
		return Ok(Translated::Trivial(TrivialFormula {
			value: root == crate::circuit::BoolValue::TRUE,
			bounds,
		}));
	}

	options.reporter().translating_to_cnf();
	let mut sat = options.sat_factory().instance();
	cnf::clausify(&factory, root, sat.as_mut(), options)?;
	debug!(
		variables = sat.num_variables(),
		clauses = sat.num_clauses(),
		"translated to cnf"
	);

	let log = options.log_translation().then(|| TranslationLog {
		ranges,
		skolems,
		sources: if options.track_formulas() {
			annotated.sources().cloned()
		} else {
			None
		},
	});
	Ok(Translated::Cnf(Translation {
		sat,
		bounds,
		primary,
		num_primary,
		log,
	}))
}
