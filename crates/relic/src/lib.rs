//! # Relic - A Finite Relational Model Finder
//!
//! Relic decides the satisfiability of first-order relational formulas
//! over finite bounds and, when a formula is satisfiable, produces a
//! concrete instance that witnesses it. Satisfiability is reduced to
//! propositional satisfiability: formulas are evaluated into Boolean
//! circuits over symbolic matrices, the circuits are clausified with a
//! definitional (polarity-aware) translation, and the resulting CNF is
//! handed to a SAT back-end behind a minimal interface.
//!
//! A problem is described by three values: an [`AstPool`] holding the
//! formula, a [`Universe`] of atoms, and [`Bounds`] giving every relation
//! a lower and upper tuple set. The [`Solver`] drives translation and
//! solving, and can lazily enumerate all solutions of a formula.

pub mod ast;
pub(crate) mod circuit;
pub(crate) mod helpers;
pub mod instance;
pub mod solver;
pub(crate) mod translate;

#[cfg(test)]
pub(crate) mod tests;

/// Type alias for the integer values of integer expressions and bounds.
pub type IntVal = i32;

pub use crate::{
	ast::{
		AstPool, CompOp, Decl, DeclsId, ExprBinOp, ExprConst, ExprId, ExprUnOp, FormulaBinOp,
		FormulaId, IntBinOp, IntCastOp, IntCompOp, IntExprId, IntUnOp, IntoExpr, Multiplicity,
		Quantifier, Relation, Variable,
	},
	instance::{
		bounds::{Bounds, Instance},
		Tuple, TupleSet, Universe,
	},
	solver::{
		options::{IntEncoding, Options, Reporter, TraceReporter},
		sat::{SatError, SatFactory, SatSolver, Varisat},
		Outcome, Solution, Solutions, SolveError, Solver, Statistics,
	},
};
