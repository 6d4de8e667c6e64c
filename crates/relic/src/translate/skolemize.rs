//! The skolemizer and the relation predicate inliner: the two rewriting
//! passes that run between sharing analysis and the FOL-to-Boolean
//! translation.
//!
//! The skolemizer eliminates existential quantifiers whose effective
//! polarity is existential and whose universal nesting depth is within the
//! configured budget. Each eliminated declaration `x: m E` under enclosing
//! universal variables `u_1 … u_k` becomes a fresh relation `$x` of arity
//! `k + arity(x)`, bounded above by the product of the universals' upper
//! bounds and the over-approximated upper bound of `E`; occurrences of `x`
//! are replaced by `u_k·(…·(u_1·$x))` and the constraint `$x ⊆ E ∧ (m $x)`
//! is conjoined with the body, or made an antecedent under universal
//! polarity.

use std::collections::HashMap;

use tracing::debug;

use crate::{
	ast::{
		annotate::{Annotated, Node},
		AstPool, CompOp, Decl, DeclsId, ExprId, ExprNode, ExprUnOp, FormulaBinOp, FormulaId,
		FormulaNode, IntExprId, IntExprNode, IntoExpr, Multiplicity, Quantifier, Relation,
		VarId, Variable,
	},
	circuit::matrix::BooleanMatrix,
	instance::{bounds::Bounds, TupleSet, Universe},
	solver::options::Options,
	translate::{fol2bool, TranslationError},
};

/// The inlining state of one predicate inlining pass.
struct Inliner<'a> {
	/// The pool that owns the rewritten nodes.
	pool: &'a mut AstPool,
	/// The memo of rewritten expressions.
	expr_cache: HashMap<ExprId, ExprId>,
	/// The memo of rewritten formulas.
	formula_cache: HashMap<FormulaId, FormulaId>,
	/// The memo of rewritten integer expressions.
	int_cache: HashMap<IntExprId, IntExprId>,
}

/// The rewriting state of one skolemization pass.
struct Skolemizer<'a> {
	/// The pool that owns the rewritten nodes.
	pool: &'a mut AstPool,
	/// The annotations of the original root.
	annotated: &'a Annotated,
	/// The bounds being extended with skolem constants.
	bounds: &'a mut Bounds,
	/// The options of the enclosing solve.
	options: &'a Options,
	/// The enclosing universal declarations that skolemization reaches
	/// through, outermost first.
	universals: Vec<UniversalDecl>,
	/// Variable substitutions in scope, innermost last; `None` marks a
	/// shadowing binder whose occurrences are kept as-is.
	env: Vec<(VarId, Option<ExprId>)>,
	/// The memo of rewritten shared closed formulas outside any binder.
	cache: HashMap<(FormulaId, bool, i32), FormulaId>,
	/// The rewritten-node provenance, recorded when formula tracking is on.
	sources: Option<HashMap<Node, Node>>,
	/// The skolem constant introduced for each eliminated declaration.
	skolems: Vec<(Variable, Relation)>,
}

/// A universal declaration on the skolemization stack.
struct UniversalDecl {
	/// The declared variable.
	variable: Variable,
	/// The over-approximated matrix of the declaration's domain, used both
	/// to bound skolem constants and as the environment of deeper
	/// approximations.
	matrix: BooleanMatrix,
}

impl Inliner<'_> {
	/// Rewrite an expression, expanding predicates inside comprehensions
	/// and conditionals.
	fn expr(&mut self, expr: ExprId) -> ExprId {
		if let Some(&e) = self.expr_cache.get(&expr) {
			return e;
		}
		let result = match self.pool.expr_node(expr).clone() {
			ExprNode::Relation(_) | ExprNode::Variable(_) | ExprNode::Constant(_) => expr,
			ExprNode::Binary(op, a, b) => {
				let (a2, b2) = (self.expr(a), self.expr(b));
				if a2 == a && b2 == b {
					expr
				} else {
					self.pool.expr_binary(op, a2, b2)
				}
			},
			ExprNode::Unary(op, e) => {
				let e2 = self.expr(e);
				if e2 == e {
					expr
				} else {
					self.pool.expr_unary(op, e2)
				}
			},
			ExprNode::IfThenElse(c, t, e) => {
				let (c2, t2, e2) = (self.formula(c), self.expr(t), self.expr(e));
				if c2 == c && t2 == t && e2 == e {
					expr
				} else {
					self.pool.ite_expr(c2, t2, e2)
				}
			},
			ExprNode::Comprehension(decls, body) => {
				let (ds2, changed) = self.decls(decls);
				let body2 = self.formula(body);
				if !changed && body2 == body {
					expr
				} else {
					let ds2 = self.pool.decls(ds2);
					self.pool.comprehension_expr(ds2, body2)
				}
			},
			ExprNode::IntCast(ie) => {
				let ie2 = self.int_expr(ie);
				if ie2 == ie {
					expr
				} else {
					self.pool.to_expr(ie2)
				}
			},
		};
		let _ = self.expr_cache.insert(expr, result);
		result
	}

	/// Rewrite the declarations of a binder.
	fn decls(&mut self, decls: DeclsId) -> (Vec<Decl>, bool) {
		let ds = self.pool.decls_of(decls).to_vec();
		let mut changed = false;
		let mut out = Vec::with_capacity(ds.len());
		for d in ds {
			let e2 = self.expr(d.expression);
			changed |= e2 != d.expression;
			out.push(Decl {
				variable: d.variable,
				multiplicity: d.multiplicity,
				expression: e2,
			});
		}
		(out, changed)
	}

	/// Rewrite a formula, replacing every relation predicate by its
	/// relational definition.
	fn formula(&mut self, formula: FormulaId) -> FormulaId {
		if let Some(&f) = self.formula_cache.get(&formula) {
			return f;
		}
		let result = match self.pool.formula_node(formula).clone() {
			FormulaNode::Constant(_) => formula,
			FormulaNode::Not(g) => {
				let g2 = self.formula(g);
				if g2 == g {
					formula
				} else {
					self.pool.not(g2)
				}
			},
			FormulaNode::Binary(op, a, b) => {
				let (a2, b2) = (self.formula(a), self.formula(b));
				if a2 == a && b2 == b {
					formula
				} else {
					match op {
						FormulaBinOp::And => self.pool.and(a2, b2),
						FormulaBinOp::Or => self.pool.or(a2, b2),
						FormulaBinOp::Implies => self.pool.implies(a2, b2),
						FormulaBinOp::Iff => self.pool.iff(a2, b2),
					}
				}
			},
			FormulaNode::Quantified(q, decls, body) => {
				let (ds2, changed) = self.decls(decls);
				let body2 = self.formula(body);
				if !changed && body2 == body {
					formula
				} else {
					let ds2 = self.pool.decls(ds2);
					match q {
						Quantifier::All => self.pool.forall(ds2, body2),
						Quantifier::Some => self.pool.exists(ds2, body2),
					}
				}
			},
			FormulaNode::Multiplicity(m, e) => {
				let e2 = self.expr(e);
				if e2 == e {
					formula
				} else {
					self.pool.mult_formula(m, e2)
				}
			},
			FormulaNode::Comparison(op, a, b) => {
				let (a2, b2) = (self.expr(a), self.expr(b));
				if a2 == a && b2 == b {
					formula
				} else {
					self.pool.compare(op, a2, b2)
				}
			},
			FormulaNode::IntComparison(op, a, b) => {
				let (a2, b2) = (self.int_expr(a), self.int_expr(b));
				if a2 == a && b2 == b {
					formula
				} else {
					self.pool.int_compare(op, a2, b2)
				}
			},
			FormulaNode::Acyclic(r) => {
				// acyclic(r) ≡ no (^r ∩ iden)
				let re = (&r).into_expr(self.pool);
				let closed = self.pool.expr_unary(ExprUnOp::Closure, re);
				let iden = crate::ast::ExprConst::Iden.into_expr(self.pool);
				let diag = self.pool.intersection(closed, iden);
				self.pool.no(diag)
			},
			FormulaNode::Function {
				relation,
				domain,
				range,
				partial,
			} => {
				let domain = self.expr(domain);
				let range = self.expr(range);
				// r ⊆ domain×range, and every domain atom has one (or at
				// most one, for partial functions) image under r.
				let re = (&relation).into_expr(self.pool);
				let prod = self.pool.product(domain, range);
				let within = self.pool.subset(re, prod);
				let v = self.pool.variable("v", 1);
				let ve = (&v).into_expr(self.pool);
				let re2 = (&relation).into_expr(self.pool);
				let image = self.pool.join(ve, re2);
				let m = if partial {
					Multiplicity::Lone
				} else {
					Multiplicity::One
				};
				let image_mult = self.pool.mult_formula(m, image);
				let d = self.pool.one_of(&v, domain);
				let ds = self.pool.decls([d]);
				let total = self.pool.forall(ds, image_mult);
				self.pool.and(within, total)
			},
			FormulaNode::TotalOrdering {
				relation,
				ordered,
				first,
				last,
			} => self.total_ordering(&relation, &ordered, &first, &last),
		};
		let _ = self.formula_cache.insert(formula, result);
		result
	}

	/// Rewrite an integer expression.
	fn int_expr(&mut self, expr: IntExprId) -> IntExprId {
		if let Some(&e) = self.int_cache.get(&expr) {
			return e;
		}
		let result = match self.pool.int_node(expr).clone() {
			IntExprNode::Constant(_) => expr,
			IntExprNode::Unary(op, e) => {
				let e2 = self.int_expr(e);
				if e2 == e {
					expr
				} else {
					self.pool.int_unary(op, e2)
				}
			},
			IntExprNode::Binary(op, a, b) => {
				let (a2, b2) = (self.int_expr(a), self.int_expr(b));
				if a2 == a && b2 == b {
					expr
				} else {
					self.pool.int_binary(op, a2, b2)
				}
			},
			IntExprNode::Sum(decls, body) => {
				let (ds2, changed) = self.decls(decls);
				let body2 = self.int_expr(body);
				if !changed && body2 == body {
					expr
				} else {
					let ds2 = self.pool.decls(ds2);
					self.pool.sum(ds2, body2)
				}
			},
			IntExprNode::Cast(op, e) => {
				let e2 = self.expr(e);
				if e2 == e {
					expr
				} else {
					match op {
						crate::ast::IntCastOp::Cardinality => self.pool.cardinality(e2),
						crate::ast::IntCastOp::Sum => self.pool.int_sum_of(e2),
					}
				}
			},
		};
		let _ = self.int_cache.insert(expr, result);
		result
	}

	/// Expand the total-ordering predicate into its relational definition:
	/// the successor relation arranges the ordered atoms in one chain.
	fn total_ordering(
		&mut self,
		relation: &Relation,
		ordered: &Relation,
		first: &Relation,
		last: &Relation,
	) -> FormulaId {
		let re = (relation).into_expr(self.pool);
		let oe = (ordered).into_expr(self.pool);
		let prod = self.pool.product(ordered, ordered);
		let within = self.pool.subset(re, prod);

		// Every ordered atom is reachable from the first.
		let star = self.pool.expr_unary(ExprUnOp::ReflexiveClosure, relation);
		let reach = self.pool.join(first, star);
		let covers = self.pool.compare(CompOp::Equals, oe, reach);

		// The first atom has no predecessor and the last no successor.
		let preds_of_first = self.pool.join(relation, first);
		let no_pred = self.pool.no(preds_of_first);
		let succs_of_last = self.pool.join(last, relation);
		let no_succ = self.pool.no(succs_of_last);

		// Every atom but the last has one successor, every atom but the
		// first one predecessor.
		let v = self.pool.variable("v", 1);
		let ve = (&v).into_expr(self.pool);
		let succ = self.pool.join(ve, relation);
		let one_succ = self.pool.one(succ);
		let not_last = self.pool.difference(ordered, last);
		let dv = self.pool.one_of(&v, not_last);
		let dsv = self.pool.decls([dv]);
		let succs = self.pool.forall(dsv, one_succ);

		let u = self.pool.variable("u", 1);
		let ue = (&u).into_expr(self.pool);
		let pred = self.pool.join(relation, ue);
		let one_pred = self.pool.one(pred);
		let not_first = self.pool.difference(ordered, first);
		let du = self.pool.one_of(&u, not_first);
		let dsu = self.pool.decls([du]);
		let preds = self.pool.forall(dsu, one_pred);

		self.pool
			.and_all([within, covers, no_pred, no_succ, succs, preds])
	}
}

impl Skolemizer<'_> {
	/// The over-approximation environment binding every stacked universal
	/// variable to its domain matrix.
	fn approx_env(&self) -> Vec<(VarId, BooleanMatrix)> {
		self.universals
			.iter()
			.map(|u| (u.variable.id(), u.matrix.clone()))
			.collect()
	}

	/// Rewrite an expression under the substitution environment.
	///
	/// Expressions are always non-skolemizable contexts, so nothing inside
	/// them is eliminated; only variable occurrences change.
	fn expr(&mut self, expr: ExprId) -> Result<ExprId, TranslationError> {
		let result = match self.pool.expr_node(expr).clone() {
			ExprNode::Relation(_) | ExprNode::Constant(_) => expr,
			ExprNode::Variable(v) => {
				match self.env.iter().rev().find(|(id, _)| *id == v.id()) {
					Some((_, Some(replacement))) => *replacement,
					_ => expr,
				}
			},
			ExprNode::Binary(op, a, b) => {
				let (a2, b2) = (self.expr(a)?, self.expr(b)?);
				if a2 == a && b2 == b {
					expr
				} else {
					self.pool.expr_binary(op, a2, b2)
				}
			},
			ExprNode::Unary(op, e) => {
				let e2 = self.expr(e)?;
				if e2 == e {
					expr
				} else {
					self.pool.expr_unary(op, e2)
				}
			},
			ExprNode::IfThenElse(c, t, e) => {
				let c2 = self.formula(c, false, -1)?;
				let (t2, e2) = (self.expr(t)?, self.expr(e)?);
				if c2 == c && t2 == t && e2 == e {
					expr
				} else {
					self.pool.ite_expr(c2, t2, e2)
				}
			},
			ExprNode::Comprehension(decls, body) => {
				let (ds2, changed) = self.shadowed_decls(decls)?;
				let body2 = self.formula(body, false, -1)?;
				self.pop_shadows(ds2.len());
				if !changed && body2 == body {
					expr
				} else {
					let ds2 = self.pool.decls(ds2);
					self.pool.comprehension_expr(ds2, body2)
				}
			},
			ExprNode::IntCast(ie) => {
				let ie2 = self.int_expr(ie)?;
				if ie2 == ie {
					expr
				} else {
					self.pool.to_expr(ie2)
				}
			},
		};
		Ok(result)
	}

	/// Rewrite a formula under the given polarity and remaining skolem
	/// depth budget.
	fn formula(
		&mut self,
		formula: FormulaId,
		negated: bool,
		depth: i32,
	) -> Result<FormulaId, TranslationError> {
		let node = Node::Formula(formula);
		let cacheable = self.annotated.shared(node)
			&& self.annotated.closed(node)
			&& self.universals.is_empty()
			&& self.env.is_empty();
		let key = (formula, negated, depth);
		if cacheable {
			if let Some(&f) = self.cache.get(&key) {
				return Ok(f);
			}
		}
		let result = match self.pool.formula_node(formula).clone() {
			FormulaNode::Constant(_)
			| FormulaNode::Acyclic(_)
			| FormulaNode::TotalOrdering { .. } => formula,
			FormulaNode::Not(g) => {
				let g2 = self.formula(g, !negated, depth)?;
				if g2 == g {
					formula
				} else {
					self.pool.not(g2)
				}
			},
			FormulaNode::Binary(op, a, b) => {
				// Skolemization continues only through effective
				// conjunctions; every other connective is an unsound
				// context.
				let child_depth = match op {
					FormulaBinOp::And if !negated => depth,
					FormulaBinOp::Or | FormulaBinOp::Implies if negated => depth,
					_ => -1,
				};
				let a_negated = if op == FormulaBinOp::Implies {
					!negated
				} else {
					negated
				};
				let a2 = self.formula(a, a_negated, child_depth)?;
				let b2 = self.formula(b, negated, child_depth)?;
				if a2 == a && b2 == b {
					formula
				} else {
					match op {
						FormulaBinOp::And => self.pool.and(a2, b2),
						FormulaBinOp::Or => self.pool.or(a2, b2),
						FormulaBinOp::Implies => self.pool.implies(a2, b2),
						FormulaBinOp::Iff => self.pool.iff(a2, b2),
					}
				}
			},
			FormulaNode::Quantified(q, decls, body) => {
				self.quantified(formula, q, decls, body, negated, depth)?
			},
			FormulaNode::Multiplicity(m, e) => {
				let e2 = self.expr(e)?;
				if e2 == e {
					formula
				} else {
					self.pool.mult_formula(m, e2)
				}
			},
			FormulaNode::Comparison(op, a, b) => {
				let (a2, b2) = (self.expr(a)?, self.expr(b)?);
				if a2 == a && b2 == b {
					formula
				} else {
					self.pool.compare(op, a2, b2)
				}
			},
			FormulaNode::IntComparison(op, a, b) => {
				let (a2, b2) = (self.int_expr(a)?, self.int_expr(b)?);
				if a2 == a && b2 == b {
					formula
				} else {
					self.pool.int_compare(op, a2, b2)
				}
			},
			FormulaNode::Function {
				relation,
				domain,
				range,
				partial,
			} => {
				let (d2, r2) = (self.expr(domain)?, self.expr(range)?);
				if d2 == domain && r2 == range {
					formula
				} else if partial {
					self.pool.partial_function(&relation, d2, r2)
				} else {
					self.pool.function(&relation, d2, r2)
				}
			},
		};
		if cacheable {
			let _ = self.cache.insert(key, result);
		}
		if result != formula {
			if let Some(sources) = &mut self.sources {
				let _ = sources.insert(Node::Formula(result), Node::Formula(formula));
			}
		}
		Ok(result)
	}

	/// Rewrite an integer expression under the substitution environment.
	fn int_expr(&mut self, expr: IntExprId) -> Result<IntExprId, TranslationError> {
		let result = match self.pool.int_node(expr).clone() {
			IntExprNode::Constant(_) => expr,
			IntExprNode::Unary(op, e) => {
				let e2 = self.int_expr(e)?;
				if e2 == e {
					expr
				} else {
					self.pool.int_unary(op, e2)
				}
			},
			IntExprNode::Binary(op, a, b) => {
				let (a2, b2) = (self.int_expr(a)?, self.int_expr(b)?);
				if a2 == a && b2 == b {
					expr
				} else {
					self.pool.int_binary(op, a2, b2)
				}
			},
			IntExprNode::Sum(decls, body) => {
				let (ds2, changed) = self.shadowed_decls(decls)?;
				let body2 = self.int_expr(body)?;
				self.pop_shadows(ds2.len());
				if !changed && body2 == body {
					expr
				} else {
					let ds2 = self.pool.decls(ds2);
					self.pool.sum(ds2, body2)
				}
			},
			IntExprNode::Cast(op, e) => {
				let e2 = self.expr(e)?;
				if e2 == e {
					expr
				} else {
					match op {
						crate::ast::IntCastOp::Cardinality => self.pool.cardinality(e2),
						crate::ast::IntCastOp::Sum => self.pool.int_sum_of(e2),
					}
				}
			},
		};
		Ok(result)
	}

	/// Remove the innermost `count` substitution frames.
	fn pop_shadows(&mut self, count: usize) {
		for _ in 0..count {
			let _ = self.env.pop();
		}
	}

	/// Rewrite a quantified formula: eliminate its declarations when the
	/// effective polarity is existential and budget remains, and otherwise
	/// keep the quantifier, reaching through compatible universals.
	fn quantified(
		&mut self,
		formula: FormulaId,
		q: Quantifier,
		decls: DeclsId,
		body: FormulaId,
		negated: bool,
		depth: i32,
	) -> Result<FormulaId, TranslationError> {
		let effective_some = (q == Quantifier::Some) != negated;
		let ds = self.pool.decls_of(decls).to_vec();

		if effective_some && depth >= 0 {
			let mut constraints = Vec::with_capacity(ds.len());
			for d in &ds {
				let domain = self.expr(d.expression)?;
				let approx =
					fol2bool::approximate(self.pool, domain, self.bounds, self.approx_env(), self.options)?;
				let universe = self.bounds.universe().clone();
				let mut upper = support(&approx, &universe);
				for u in self.universals.iter().rev() {
					upper = support(&u.matrix, &universe).product(&upper);
				}

				let arity = upper.arity();
				let skolem = self.pool.relation(format!("${}", d.variable.name()), arity);
				self.bounds.bound_upper(&skolem, upper);
				let universal_vars: Vec<Variable> =
					self.universals.iter().map(|u| u.variable.clone()).collect();
				self.options.reporter().skolemizing(d, &skolem, &universal_vars);
				debug!(variable = %d.variable, skolem = %skolem, "skolemizing declaration");
				self.skolems.push((d.variable.clone(), skolem.clone()));

				let mut replacement = (&skolem).into_expr(self.pool);
				for u in &universal_vars {
					let ue = (u).into_expr(self.pool);
					replacement = self.pool.join(ue, replacement);
				}

				let mut constraint = self.pool.subset(replacement, domain);
				if d.multiplicity != Multiplicity::Set {
					let mult = self.pool.mult_formula(d.multiplicity, replacement);
					constraint = self.pool.and(constraint, mult);
				}
				constraints.push(constraint);
				self.env.push((d.variable.id(), Some(replacement)));
			}
			let body2 = self.formula(body, negated, depth)?;
			self.pop_shadows(ds.len());
			let combined = self.pool.and_all(constraints);
			return Ok(if negated {
				self.pool.implies(combined, body2)
			} else {
				self.pool.and(combined, body2)
			});
		}

		// The quantifier is kept. An effective universal with remaining
		// budget and `one` declarations joins the stack so that deeper
		// existentials can still be eliminated.
		let reach_through = !effective_some
			&& depth >= 1
			&& ds.iter().all(|d| d.multiplicity == Multiplicity::One);
		let mut changed = false;
		let mut new_ds = Vec::with_capacity(ds.len());
		for d in &ds {
			let domain = self.expr(d.expression)?;
			changed |= domain != d.expression;
			new_ds.push(Decl {
				variable: d.variable.clone(),
				multiplicity: d.multiplicity,
				expression: domain,
			});
			if reach_through {
				let matrix =
					fol2bool::approximate(self.pool, domain, self.bounds, self.approx_env(), self.options)?;
				self.universals.push(UniversalDecl {
					variable: d.variable.clone(),
					matrix,
				});
			} else {
				self.env.push((d.variable.id(), None));
			}
		}
		let body_depth = if reach_through { depth - 1 } else { -1 };
		let body2 = self.formula(body, negated, body_depth)?;
		if reach_through {
			for _ in 0..ds.len() {
				let _ = self.universals.pop();
			}
		} else {
			self.pop_shadows(ds.len());
		}
		Ok(if !changed && body2 == body {
			formula
		} else {
			let ds2 = self.pool.decls(new_ds);
			match q {
				Quantifier::All => self.pool.forall(ds2, body2),
				Quantifier::Some => self.pool.exists(ds2, body2),
			}
		})
	}

	/// Rewrite the declarations of a kept binder, pushing a shadowing frame
	/// for each of its variables.
	fn shadowed_decls(&mut self, decls: DeclsId) -> Result<(Vec<Decl>, bool), TranslationError> {
		let ds = self.pool.decls_of(decls).to_vec();
		let mut changed = false;
		let mut out = Vec::with_capacity(ds.len());
		for d in ds {
			let e2 = self.expr(d.expression)?;
			changed |= e2 != d.expression;
			self.env.push((d.variable.id(), None));
			out.push(Decl {
				variable: d.variable,
				multiplicity: d.multiplicity,
				expression: e2,
			});
		}
		Ok((out, changed))
	}
}

/// Replace every relation predicate of the annotated root by its
/// relational definition, re-annotating when anything changed.
pub(crate) fn inline_predicates(pool: &mut AstPool, annotated: Annotated) -> Annotated {
	let root = annotated.root_formula();
	let mut inliner = Inliner {
		pool: &mut *pool,
		expr_cache: HashMap::new(),
		formula_cache: HashMap::new(),
		int_cache: HashMap::new(),
	};
	let new_root = inliner.formula(root);
	if new_root == root {
		return annotated;
	}
	let sources = annotated.sources().cloned();
	let reannotated = Annotated::annotate_formula(pool, new_root);
	match sources {
		Some(s) => reannotated.with_sources(s),
		None => reannotated,
	}
}

/// Skolemize the annotated root under the configured depth, extending
/// `bounds` with the skolem constants, and return the rewritten annotation
/// together with the introduced constants.
pub(crate) fn skolemize(
	pool: &mut AstPool,
	annotated: Annotated,
	bounds: &mut Bounds,
	options: &Options,
) -> Result<(Annotated, Vec<(Variable, Relation)>), TranslationError> {
	if options.skolem_depth() < 0 {
		return Ok((annotated, Vec::new()));
	}
	let root = annotated.root_formula();
	let mut skolemizer = Skolemizer {
		pool: &mut *pool,
		annotated: &annotated,
		bounds,
		options,
		universals: Vec::new(),
		env: Vec::new(),
		cache: HashMap::new(),
		sources: options.track_formulas().then(HashMap::new),
		skolems: Vec::new(),
	};
	let new_root = skolemizer.formula(root, false, options.skolem_depth())?;
	let skolems = skolemizer.skolems;
	let sources = skolemizer.sources;
	if new_root == root {
		return Ok((annotated, skolems));
	}
	debug!(count = skolems.len(), "skolemized declarations");
	let mut reannotated = Annotated::annotate_formula(pool, new_root);
	if let Some(s) = sources {
		reannotated = reannotated.with_sources(s);
	}
	Ok((reannotated, skolems))
}

/// The tuple set holding the support of an over-approximated matrix.
fn support(matrix: &BooleanMatrix, universe: &Universe) -> TupleSet {
	let mut ts = universe.none(matrix.arity());
	for index in matrix.dense_indices() {
		ts.insert_index(index);
	}
	ts
}
