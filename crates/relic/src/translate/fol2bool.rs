//! The FOL-to-Boolean translator: evaluates the annotated syntax DAG
//! against the bounds into Boolean matrices, formulas, and bit-blasted
//! integers over a circuit factory.
//!
//! Leaves are interpreted by a [`LeafInterpreter`]: the exact interpreter
//! assigns one fresh primary variable to every tuple of a relation's upper
//! bound that is not in its lower bound, while the over-approximating
//! interpreter used to bound skolem constants marks every such tuple true
//! and allocates nothing. Shared nodes without free variables are cached;
//! everything else is re-evaluated under its environment.

use std::collections::HashMap;

use crate::{
	ast::{
		annotate::{Annotated, Node},
		AstPool, Decl, DeclsId, ExprBinOp, ExprConst, ExprNode, ExprUnOp, FormulaBinOp,
		FormulaId, ExprId, IntBinOp, IntCastOp, IntCompOp, IntExprId, IntExprNode, IntUnOp,
		Multiplicity, Quantifier, RelId, Relation, VarId, Variable, CompOp, FormulaNode,
	},
	circuit::{int::IntCircuit, matrix::BooleanMatrix, BoolAccumulator, BoolValue, CircuitFactory},
	instance::bounds::Bounds,
	solver::options::Options,
	translate::{PrimaryRange, TranslationError},
};

/// The translation state of one FOL-to-Boolean pass.
struct Fol2Bool<'a> {
	/// The pool that owns the translated nodes.
	pool: &'a AstPool,
	/// The sharing and free-variable annotations of the translated root.
	annotated: &'a Annotated,
	/// The interpreter for relation, variable, and constant leaves.
	interpreter: LeafInterpreter<'a>,
	/// The circuit factory receiving the allocated gates.
	factory: &'a mut CircuitFactory,
	/// The options of the enclosing solve.
	options: &'a Options,
	/// The quantifier bindings in scope, innermost last.
	env: Vec<(VarId, BooleanMatrix)>,
	/// The cache of translated shared closed expressions.
	expr_cache: HashMap<ExprId, BooleanMatrix>,
	/// The cache of translated shared closed formulas.
	formula_cache: HashMap<FormulaId, BoolValue>,
	/// The cache of translated shared closed integer expressions.
	int_cache: HashMap<IntExprId, IntCircuit>,
}

/// The interpreter mapping leaves to Boolean matrices under the bounds.
pub(crate) struct LeafInterpreter<'a> {
	/// The bounds interpreting the leaves.
	bounds: &'a Bounds,
	/// The primary variable blocks of the exact interpreter, or `None` for
	/// the over-approximating interpreter.
	primary: Option<&'a HashMap<RelId, PrimaryRange>>,
}

impl<'a> LeafInterpreter<'a> {
	/// Create the exact interpreter over the given primary allocation.
	fn exact(bounds: &'a Bounds, primary: &'a HashMap<RelId, PrimaryRange>) -> Self {
		LeafInterpreter {
			bounds,
			primary: Some(primary),
		}
	}

	/// Create the over-approximating interpreter, which marks every
	/// non-lower-bound tuple true and allocates no variables.
	fn overapproximating(bounds: &'a Bounds) -> Self {
		LeafInterpreter {
			bounds,
			primary: None,
		}
	}

	/// The bounds interpreting the leaves.
	fn bounds(&self) -> &'a Bounds {
		self.bounds
	}

	/// The matrix of a constant expression.
	fn constant(&self, c: ExprConst) -> BooleanMatrix {
		let size = self.size();
		match c {
			ExprConst::Iden => BooleanMatrix::identity(size),
			ExprConst::None => BooleanMatrix::new(1, size),
			ExprConst::Univ => {
				let mut m = BooleanMatrix::new(1, size);
				for a in 0..size {
					m.set(a, BoolValue::TRUE);
				}
				m
			},
			ExprConst::Ints => {
				let mut m = BooleanMatrix::new(1, size);
				for (_, tuple) in self.bounds.ints() {
					let atom = tuple.indices().next().expect("int bound is a singleton");
					m.set(atom, BoolValue::TRUE);
				}
				m
			},
		}
	}

	/// The matrix of a relation leaf.
	fn relation(&self, relation: &Relation) -> Result<BooleanMatrix, TranslationError> {
		let unbound = || TranslationError::UnboundLeaf {
			name: relation.name().to_owned(),
		};
		let lower = self.bounds.lower(relation).ok_or_else(unbound)?;
		let upper = self.bounds.upper(relation).ok_or_else(unbound)?;
		let mut m = BooleanMatrix::new(relation.arity(), self.size());
		match self.primary {
			Some(primary) => {
				let mut var = primary[&relation.id()].start;
				for index in upper.indices() {
					if lower.contains_index(index) {
						m.set(index, BoolValue::TRUE);
					} else {
						m.set(index, BoolValue::variable(var));
						var += 1;
					}
				}
			},
			None => {
				for index in upper.indices() {
					m.set(index, BoolValue::TRUE);
				}
			},
		}
		Ok(m)
	}

	/// The number of atoms of the universe.
	fn size(&self) -> usize {
		self.bounds.universe().size()
	}
}

impl Fol2Bool<'_> {
	/// Enumerate one declaration level of a universally quantified formula,
	/// accumulating `membership ⇒ body` for every binding.
	fn all_rec(
		&mut self,
		decls: &[Decl],
		at: usize,
		body: FormulaId,
		negpath: BoolValue,
		acc: &mut BoolAccumulator,
	) -> Result<(), TranslationError> {
		let domain = self.expr(decls[at].expression)?;
		for (index, dv) in domain.iter() {
			let ndv = !dv;
			let np = self.factory.or(negpath, ndv);
			if np == BoolValue::TRUE {
				continue;
			}
			let unit = self.unit(decls[at].variable.arity(), index);
			self.env.push((decls[at].variable.id(), unit));
			if at + 1 == decls.len() {
				let b = self.formula(body)?;
				acc.add(self.factory.or(np, b));
			} else {
				self.all_rec(decls, at + 1, body, np, acc)?;
			}
			let _ = self.env.pop();
		}
		Ok(())
	}

	/// Raise the abort error when the cooperative interrupt flag is set.
	fn check_interrupt(&self) -> Result<(), TranslationError> {
		if self.options.interrupted() {
			Err(TranslationError::Aborted)
		} else {
			Ok(())
		}
	}

	/// Translate a comprehension into its membership matrix.
	fn comprehension(
		&mut self,
		decls: DeclsId,
		body: FormulaId,
	) -> Result<BooleanMatrix, TranslationError> {
		let ds = self.pool.decls_of(decls).to_vec();
		let mut out = BooleanMatrix::new(ds.len(), self.interpreter.size());
		self.comprehension_rec(&ds, 0, body, 0, BoolValue::TRUE, &mut out)?;
		Ok(out)
	}

	/// Enumerate one declaration level of a comprehension, filling the
	/// output matrix with `membership ∧ body` for every binding.
	fn comprehension_rec(
		&mut self,
		decls: &[Decl],
		at: usize,
		body: FormulaId,
		prefix: usize,
		path: BoolValue,
		out: &mut BooleanMatrix,
	) -> Result<(), TranslationError> {
		let size = self.interpreter.size();
		let domain = self.expr(decls[at].expression)?;
		for (index, dv) in domain.iter() {
			let membership = self.factory.and(path, dv);
			if membership == BoolValue::FALSE {
				continue;
			}
			let unit = self.unit(1, index);
			self.env.push((decls[at].variable.id(), unit));
			if at + 1 == decls.len() {
				let b = self.formula(body)?;
				let v = self.factory.and(membership, b);
				out.set(prefix * size + index, v);
			} else {
				self.comprehension_rec(decls, at + 1, body, prefix * size + index, membership, out)?;
			}
			let _ = self.env.pop();
		}
		Ok(())
	}

	/// Translate an expression into its membership matrix.
	fn expr(&mut self, expr: ExprId) -> Result<BooleanMatrix, TranslationError> {
		self.check_interrupt()?;
		let node = Node::Expr(expr);
		let cacheable = self.annotated.shared(node) && self.annotated.closed(node);
		if cacheable {
			if let Some(m) = self.expr_cache.get(&expr) {
				return Ok(m.clone());
			}
		}
		let m = match self.pool.expr_node(expr).clone() {
			ExprNode::Relation(r) => self.interpreter.relation(&r)?,
			ExprNode::Variable(v) => self.lookup(&v)?,
			ExprNode::Constant(c) => self.interpreter.constant(c),
			ExprNode::Binary(op, a, b) => {
				let a = self.expr(a)?;
				let b = self.expr(b)?;
				match op {
					ExprBinOp::Union => a.or(&b, self.factory),
					ExprBinOp::Intersection => a.and(&b, self.factory),
					ExprBinOp::Difference => a.difference(&b, self.factory),
					ExprBinOp::Join => a.dot(&b, self.factory),
					ExprBinOp::Product => a.cross(&b, self.factory),
					ExprBinOp::Override => a.override_with(&b, self.factory),
				}
			},
			ExprNode::Unary(op, e) => {
				let m = self.expr(e)?;
				match op {
					ExprUnOp::Transpose => m.transpose(),
					ExprUnOp::Closure => m.closure(self.factory),
					ExprUnOp::ReflexiveClosure => {
						let closed = m.closure(self.factory);
						let iden = BooleanMatrix::identity(self.interpreter.size());
						closed.or(&iden, self.factory)
					},
				}
			},
			ExprNode::IfThenElse(c, t, e) => {
				let c = self.formula(c)?;
				let t = self.expr(t)?;
				let e = self.expr(e)?;
				t.choice(c, &e, self.factory)
			},
			ExprNode::Comprehension(decls, body) => self.comprehension(decls, body)?,
			ExprNode::IntCast(ie) => self.int_cast(ie)?,
		};
		if cacheable {
			let _ = self.expr_cache.insert(expr, m.clone());
		}
		Ok(m)
	}

	/// Translate a formula into a Boolean value.
	fn formula(&mut self, formula: FormulaId) -> Result<BoolValue, TranslationError> {
		self.check_interrupt()?;
		let node = Node::Formula(formula);
		let cacheable = self.annotated.shared(node) && self.annotated.closed(node);
		if cacheable {
			if let Some(&v) = self.formula_cache.get(&formula) {
				return Ok(v);
			}
		}
		let v = match self.pool.formula_node(formula).clone() {
			FormulaNode::Constant(true) => BoolValue::TRUE,
			FormulaNode::Constant(false) => BoolValue::FALSE,
			FormulaNode::Not(g) => !self.formula(g)?,
			FormulaNode::Binary(op, a, b) => {
				let a = self.formula(a)?;
				let b = self.formula(b)?;
				match op {
					FormulaBinOp::And => self.factory.and(a, b),
					FormulaBinOp::Or => self.factory.or(a, b),
					FormulaBinOp::Implies => self.factory.implies(a, b),
					FormulaBinOp::Iff => self.factory.iff(a, b),
				}
			},
			FormulaNode::Quantified(q, decls, body) => {
				let ds = self.pool.decls_of(decls).to_vec();
				for d in &ds {
					if d.multiplicity != Multiplicity::One {
						return Err(TranslationError::HigherOrderDecl {
							decl: format!("{} {}", d.multiplicity, d.variable),
						});
					}
				}
				match q {
					Quantifier::All => {
						let mut acc = BoolAccumulator::and();
						self.all_rec(&ds, 0, body, BoolValue::FALSE, &mut acc)?;
						self.factory.accumulate(acc)
					},
					Quantifier::Some => {
						let mut acc = BoolAccumulator::or();
						self.some_rec(&ds, 0, body, BoolValue::TRUE, &mut acc)?;
						self.factory.accumulate(acc)
					},
				}
			},
			FormulaNode::Multiplicity(m, e) => {
				let matrix = self.expr(e)?;
				matrix.multiplicity(m, self.factory)
			},
			FormulaNode::Comparison(op, a, b) => {
				let a = self.expr(a)?;
				let b = self.expr(b)?;
				match op {
					CompOp::Subset => a.subset_of(&b, self.factory),
					CompOp::Equals => a.eq_to(&b, self.factory),
				}
			},
			FormulaNode::IntComparison(op, a, b) => {
				let a = self.int_expr(a)?;
				let b = self.int_expr(b)?;
				match op {
					IntCompOp::Eq => a.equals(&b, self.factory),
					IntCompOp::Lt => a.lt(&b, self.factory),
					IntCompOp::Lte => a.lte(&b, self.factory),
					IntCompOp::Gt => a.gt(&b, self.factory),
					IntCompOp::Gte => a.gte(&b, self.factory),
				}
			},
			FormulaNode::Acyclic(_)
			| FormulaNode::Function { .. }
			| FormulaNode::TotalOrdering { .. } => {
				unreachable!("relation predicates are inlined before translation")
			},
		};
		if cacheable {
			let _ = self.formula_cache.insert(formula, v);
		}
		Ok(v)
	}

	/// Translate the cast of an integer expression into the unary matrix
	/// holding the atom of its value.
	fn int_cast(&mut self, expr: IntExprId) -> Result<BooleanMatrix, TranslationError> {
		let int = self.int_expr(expr)?;
		let width = self.options.bitwidth();
		let mut m = BooleanMatrix::new(1, self.interpreter.size());
		let ints: Vec<_> = self
			.interpreter
			.bounds()
			.ints()
			.map(|(i, ts)| (i, ts.indices().next().expect("int bound is a singleton")))
			.collect();
		for (value, atom) in ints {
			let c = IntCircuit::constant(value, width);
			let eq = int.equals(&c, self.factory);
			if eq == BoolValue::FALSE {
				continue;
			}
			let prev = m.get(atom);
			let v = self.factory.or(prev, eq);
			m.set(atom, v);
		}
		Ok(m)
	}

	/// Translate an integer expression into a bit-blasted integer.
	fn int_expr(&mut self, expr: IntExprId) -> Result<IntCircuit, TranslationError> {
		self.check_interrupt()?;
		let node = Node::IntExpr(expr);
		let cacheable = self.annotated.shared(node) && self.annotated.closed(node);
		if cacheable {
			if let Some(v) = self.int_cache.get(&expr) {
				return Ok(v.clone());
			}
		}
		let width = self.options.bitwidth();
		let v = match self.pool.int_node(expr).clone() {
			IntExprNode::Constant(c) => IntCircuit::constant(c, width),
			IntExprNode::Unary(op, e) => {
				let e = self.int_expr(e)?;
				match op {
					IntUnOp::Neg => e.negated(self.factory),
					IntUnOp::Abs => e.abs(self.factory),
					IntUnOp::Sgn => e.sgn(self.factory),
				}
			},
			IntExprNode::Binary(op, a, b) => {
				let a = self.int_expr(a)?;
				let b = self.int_expr(b)?;
				match op {
					IntBinOp::Add => a.plus(&b, self.factory),
					IntBinOp::Sub => a.minus(&b, self.factory),
					IntBinOp::Mul => a.times(&b, self.factory),
					IntBinOp::Div => a.div(&b, self.factory),
					IntBinOp::Rem => a.rem(&b, self.factory),
					IntBinOp::BitAnd => a.bit_and(&b, self.factory),
					IntBinOp::BitOr => a.bit_or(&b, self.factory),
					IntBinOp::BitXor => a.bit_xor(&b, self.factory),
					IntBinOp::Shl => a.shl(&b, self.factory),
					IntBinOp::Shr => a.shr(&b, self.factory),
					IntBinOp::Sha => a.sha(&b, self.factory),
				}
			},
			IntExprNode::Sum(decls, body) => {
				let ds = self.pool.decls_of(decls).to_vec();
				let mut terms = Vec::new();
				self.sum_rec(&ds, 0, body, BoolValue::TRUE, &mut terms)?;
				IntCircuit::sum_all(terms, width, self.factory)
			},
			IntExprNode::Cast(IntCastOp::Cardinality, e) => {
				let m = self.expr(e)?;
				let bits: Vec<BoolValue> = m.iter().map(|(_, v)| v).collect();
				IntCircuit::count(bits, width, self.factory)
			},
			IntExprNode::Cast(IntCastOp::Sum, e) => {
				let m = self.expr(e)?;
				let ints: Vec<_> = self
					.interpreter
					.bounds()
					.ints()
					.map(|(i, ts)| (i, ts.indices().next().expect("int bound is a singleton")))
					.collect();
				let mut terms = Vec::new();
				for (value, atom) in ints {
					let cell = m.get(atom);
					if cell == BoolValue::FALSE {
						continue;
					}
					let c = IntCircuit::constant(value, width);
					terms.push(c.masked(cell, self.factory));
				}
				IntCircuit::sum_all(terms, width, self.factory)
			},
		};
		if cacheable {
			let _ = self.int_cache.insert(expr, v.clone());
		}
		Ok(v)
	}

	/// The matrix bound to a variable in the current environment.
	fn lookup(&self, variable: &Variable) -> Result<BooleanMatrix, TranslationError> {
		self.env
			.iter()
			.rev()
			.find(|(id, _)| *id == variable.id())
			.map(|(_, m)| m.clone())
			.ok_or_else(|| TranslationError::UnboundLeaf {
				name: variable.name().to_owned(),
			})
	}

	/// Enumerate one declaration level of an existentially quantified
	/// formula, accumulating `membership ∧ body` for every binding.
	fn some_rec(
		&mut self,
		decls: &[Decl],
		at: usize,
		body: FormulaId,
		path: BoolValue,
		acc: &mut BoolAccumulator,
	) -> Result<(), TranslationError> {
		let domain = self.expr(decls[at].expression)?;
		for (index, dv) in domain.iter() {
			let p = self.factory.and(path, dv);
			if p == BoolValue::FALSE {
				continue;
			}
			let unit = self.unit(decls[at].variable.arity(), index);
			self.env.push((decls[at].variable.id(), unit));
			if at + 1 == decls.len() {
				let b = self.formula(body)?;
				let v = self.factory.and(p, b);
				acc.add(v);
			} else {
				self.some_rec(decls, at + 1, body, p, acc)?;
			}
			let _ = self.env.pop();
		}
		Ok(())
	}

	/// Enumerate one declaration level of a sum expression, collecting the
	/// body value masked by its binding's membership.
	fn sum_rec(
		&mut self,
		decls: &[Decl],
		at: usize,
		body: IntExprId,
		path: BoolValue,
		terms: &mut Vec<IntCircuit>,
	) -> Result<(), TranslationError> {
		let domain = self.expr(decls[at].expression)?;
		for (index, dv) in domain.iter() {
			let p = self.factory.and(path, dv);
			if p == BoolValue::FALSE {
				continue;
			}
			let unit = self.unit(1, index);
			self.env.push((decls[at].variable.id(), unit));
			if at + 1 == decls.len() {
				let v = self.int_expr(body)?;
				terms.push(v.masked(p, self.factory));
			} else {
				self.sum_rec(decls, at + 1, body, p, terms)?;
			}
			let _ = self.env.pop();
		}
		Ok(())
	}

	/// The matrix binding a variable to a single tuple.
	fn unit(&self, arity: usize, index: usize) -> BooleanMatrix {
		let mut m = BooleanMatrix::new(arity, self.interpreter.size());
		m.set(index, BoolValue::TRUE);
		m
	}
}

/// Over-approximate the tuple set of `expr` under `bounds` and the given
/// environment, without allocating any variables.
///
/// The result is the support of the expression's matrix when every primary
/// variable is replaced by true; it soundly contains every tuple the
/// expression can hold in any instance within the bounds.
pub(crate) fn approximate(
	pool: &AstPool,
	expr: ExprId,
	bounds: &Bounds,
	env: Vec<(VarId, BooleanMatrix)>,
	options: &Options,
) -> Result<BooleanMatrix, TranslationError> {
	let annotated = Annotated::annotate_expr(pool, expr);
	let mut factory = CircuitFactory::new(0, 1);
	let mut translator = Fol2Bool {
		pool,
		annotated: &annotated,
		interpreter: LeafInterpreter::overapproximating(bounds),
		factory: &mut factory,
		options,
		env,
		expr_cache: HashMap::new(),
		formula_cache: HashMap::new(),
		int_cache: HashMap::new(),
	};
	translator.expr(expr)
}

/// Translate the annotated root formula into a Boolean value over
/// `factory`, allocating the primary variables of `primary`.
pub(crate) fn formula(
	pool: &AstPool,
	annotated: &Annotated,
	bounds: &Bounds,
	primary: &HashMap<RelId, PrimaryRange>,
	factory: &mut CircuitFactory,
	options: &Options,
) -> Result<BoolValue, TranslationError> {
	let root = annotated.root_formula();
	let mut translator = Fol2Bool {
		pool,
		annotated,
		interpreter: LeafInterpreter::exact(bounds, primary),
		factory,
		options,
		env: Vec::new(),
		expr_cache: HashMap::new(),
		formula_cache: HashMap::new(),
		int_cache: HashMap::new(),
	};
	translator.formula(root)
}
