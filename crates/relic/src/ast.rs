//! Module containing the abstract syntax of the relational logic.
//!
//! All nodes are owned by an [`AstPool`] and referenced through typed
//! indices; node identity is index identity, and sharing a node between two
//! parents makes the syntax a DAG rather than a tree. Constructors are total:
//! every arity rule is checked when a node is created, so no node ever
//! exists in an invalid state.

pub(crate) mod annotate;

use std::{
	fmt::{self, Display, Formatter},
	rc::Rc,
};

use index_vec::{define_index_type, IndexVec};

use crate::IntVal;

define_index_type! {
	/// Reference type for declaration sequences in an [`AstPool`].
	pub struct DeclsId = u32;
}

define_index_type! {
	/// Reference type for relational expressions in an [`AstPool`].
	pub struct ExprId = u32;
}

define_index_type! {
	/// Reference type for formulas in an [`AstPool`].
	pub struct FormulaId = u32;
}

define_index_type! {
	/// Reference type for integer expressions in an [`AstPool`].
	pub struct IntExprId = u32;
}

define_index_type! {
	/// Reference type for relations in an [`AstPool`].
	pub struct RelId = u32;
}

define_index_type! {
	/// Reference type for variables in an [`AstPool`].
	pub struct VarId = u32;
}

#[derive(Clone, Debug)]
/// The arena that owns every node of the abstract syntax.
///
/// Nodes are created through the constructor methods of the pool and are
/// immutable once created. Two nodes are the same exactly when their indices
/// are equal; constructors never unify structurally equal nodes, so equal
/// indices arise only from sharing.
pub struct AstPool {
	/// The declared relations.
	relations: IndexVec<RelId, Relation>,
	/// The declared variables.
	variables: IndexVec<VarId, Variable>,
	/// The relational expression nodes, with their computed arities.
	exprs: IndexVec<ExprId, ExprInfo>,
	/// The integer expression nodes.
	int_exprs: IndexVec<IntExprId, IntExprNode>,
	/// The formula nodes.
	formulas: IndexVec<FormulaId, FormulaNode>,
	/// The declaration sequences.
	decls: IndexVec<DeclsId, Vec<Decl>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// The comparison operators on relational expressions.
pub enum CompOp {
	/// Equality of tuple sets.
	Equals,
	/// Containment of tuple sets.
	Subset,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// A declaration of a variable ranging over a relational expression.
pub struct Decl {
	/// The declared variable.
	pub variable: Variable,
	/// The multiplicity with which the variable ranges over the expression.
	pub multiplicity: Multiplicity,
	/// The expression over which the variable ranges.
	pub expression: ExprId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The binary operators on relational expressions.
pub enum ExprBinOp {
	/// Set difference.
	Difference,
	/// Set intersection.
	Intersection,
	/// Relational join.
	Join,
	/// Relational override.
	Override,
	/// Cross product.
	Product,
	/// Set union.
	Union,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The constant relational expressions.
pub enum ExprConst {
	/// The binary identity relation over the universe.
	Iden,
	/// The set of atoms that represent an integer.
	Ints,
	/// The empty unary relation.
	None,
	/// The unary relation holding every atom of the universe.
	Univ,
}

#[derive(Clone, Debug)]
/// A relational expression node, together with its arity.
struct ExprInfo {
	/// The expression node.
	node: ExprNode,
	/// The arity of the expression.
	arity: usize,
}

#[derive(Clone, Debug)]
/// The variants of a relational expression.
pub(crate) enum ExprNode {
	/// A binary expression.
	Binary(ExprBinOp, ExprId, ExprId),
	/// A comprehension `{decls | formula}`.
	Comprehension(DeclsId, FormulaId),
	/// A constant expression.
	Constant(ExprConst),
	/// A choice between two expressions, conditioned on a formula.
	IfThenElse(FormulaId, ExprId, ExprId),
	/// The unary relation holding the atom that represents the value of an
	/// integer expression.
	IntCast(IntExprId),
	/// A relation leaf.
	Relation(Relation),
	/// A unary expression.
	Unary(ExprUnOp, ExprId),
	/// A variable leaf.
	Variable(Variable),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The unary operators on relational expressions.
pub enum ExprUnOp {
	/// Transitive closure of a binary expression.
	Closure,
	/// Reflexive transitive closure of a binary expression.
	ReflexiveClosure,
	/// Transposition of a binary expression.
	Transpose,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The binary connectives on formulas.
pub enum FormulaBinOp {
	/// Conjunction.
	And,
	/// Implication.
	Implies,
	/// Equivalence.
	Iff,
	/// Disjunction.
	Or,
}

#[derive(Clone, Debug)]
#[allow(
	variant_size_differences,
	reason = "the predicate variants carry their full signatures"
)]
/// The variants of a formula.
pub(crate) enum FormulaNode {
	/// The predicate that a binary relation has no cycles.
	Acyclic(Relation),
	/// A binary connective.
	Binary(FormulaBinOp, FormulaId, FormulaId),
	/// A comparison between two relational expressions.
	Comparison(CompOp, ExprId, ExprId),
	/// A constant formula.
	Constant(bool),
	/// The predicate that a binary relation is a (partial) function from a
	/// domain to a range.
	Function {
		/// The constrained relation.
		relation: Relation,
		/// The domain of the function.
		domain: ExprId,
		/// The range of the function.
		range: ExprId,
		/// Whether the function may be partial.
		partial: bool,
	},
	/// A comparison between two integer expressions.
	IntComparison(IntCompOp, IntExprId, IntExprId),
	/// A multiplicity test on a relational expression.
	Multiplicity(Multiplicity, ExprId),
	/// Negation of a formula.
	Not(FormulaId),
	/// A quantified formula.
	Quantified(Quantifier, DeclsId, FormulaId),
	/// The predicate that a binary relation is a total ordering.
	TotalOrdering {
		/// The successor relation being constrained.
		relation: Relation,
		/// The relation holding the ordered atoms.
		ordered: Relation,
		/// The relation holding the first atom of the ordering.
		first: Relation,
		/// The relation holding the last atom of the ordering.
		last: Relation,
	},
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The binary operators on integer expressions.
pub enum IntBinOp {
	/// Addition.
	Add,
	/// Bitwise conjunction.
	BitAnd,
	/// Bitwise disjunction.
	BitOr,
	/// Bitwise exclusive disjunction.
	BitXor,
	/// Truncating division.
	Div,
	/// Multiplication.
	Mul,
	/// Remainder of truncating division.
	Rem,
	/// Arithmetic (sign-extending) right shift.
	Sha,
	/// Left shift.
	Shl,
	/// Logical (zero-extending) right shift.
	Shr,
	/// Subtraction.
	Sub,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The cast operators from relational expressions to integer expressions.
pub enum IntCastOp {
	/// The number of tuples in the expression.
	Cardinality,
	/// The sum of the integers whose atoms are held by the expression.
	Sum,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The comparison operators on integer expressions.
pub enum IntCompOp {
	/// Equality.
	Eq,
	/// Greater-than.
	Gt,
	/// Greater-than-or-equal.
	Gte,
	/// Less-than.
	Lt,
	/// Less-than-or-equal.
	Lte,
}

#[derive(Clone, Debug)]
/// The variants of an integer expression.
pub(crate) enum IntExprNode {
	/// A binary operation.
	Binary(IntBinOp, IntExprId, IntExprId),
	/// A cast from a relational expression.
	Cast(IntCastOp, ExprId),
	/// An integer constant.
	Constant(IntVal),
	/// A sum of an integer expression over a sequence of declarations.
	Sum(DeclsId, IntExprId),
	/// A unary operation.
	Unary(IntUnOp, IntExprId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The unary operators on integer expressions.
pub enum IntUnOp {
	/// Absolute value.
	Abs,
	/// Negation.
	Neg,
	/// Sign (`-1`, `0`, or `1`).
	Sgn,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The multiplicities of declarations and multiplicity formulas.
///
/// `No` is valid only in multiplicity formulas; `Set` is valid only in
/// declarations.
pub enum Multiplicity {
	/// At most one tuple.
	Lone,
	/// No tuples.
	No,
	/// Exactly one tuple.
	One,
	/// At least one tuple.
	Some,
	/// Any set of tuples.
	Set,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The quantifiers of quantified formulas.
pub enum Quantifier {
	/// Universal quantification.
	All,
	/// Existential quantification.
	Some,
}

#[derive(Clone, Debug)]
/// A named relational constant of fixed arity, interpreted by the bounds of
/// a problem.
///
/// Relations compare by identity: two relations created by separate calls to
/// [`AstPool::relation`] are distinct even when their names coincide.
pub struct Relation {
	/// The index of the relation in its pool.
	id: RelId,
	/// The arity of the relation.
	arity: usize,
	/// The name of the relation.
	name: Rc<str>,
}

#[derive(Clone, Debug)]
/// A named placeholder of fixed arity, bound by a declaration.
///
/// Variables compare by identity, like [`Relation`]s.
pub struct Variable {
	/// The index of the variable in its pool.
	id: VarId,
	/// The arity of the variable.
	arity: usize,
	/// The name of the variable.
	name: Rc<str>,
}

/// Helper trait for constructor arguments that can stand for a relational
/// expression: an existing expression, a relation or variable leaf, or a
/// constant.
pub trait IntoExpr {
	/// Resolve `self` to an expression in `pool`.
	fn into_expr(self, pool: &mut AstPool) -> ExprId;
}

impl AstPool {
	/// Create an empty pool.
	pub fn new() -> Self {
		AstPool {
			relations: IndexVec::new(),
			variables: IndexVec::new(),
			exprs: IndexVec::new(),
			int_exprs: IndexVec::new(),
			formulas: IndexVec::new(),
			decls: IndexVec::new(),
		}
	}

	/// Create the formula stating that the binary relation `relation` has no
	/// cycles.
	pub fn acyclic(&mut self, relation: &Relation) -> FormulaId {
		assert_eq!(relation.arity(), 2, "acyclic requires a binary relation");
		self.formulas.push(FormulaNode::Acyclic(relation.clone()))
	}

	/// Create the conjunction of two formulas.
	pub fn and(&mut self, a: FormulaId, b: FormulaId) -> FormulaId {
		self.formulas.push(FormulaNode::Binary(FormulaBinOp::And, a, b))
	}

	/// Create the conjunction of a sequence of formulas, associating to the
	/// left; the empty conjunction is the constant true formula.
	pub fn and_all<I: IntoIterator<Item = FormulaId>>(&mut self, formulas: I) -> FormulaId {
		let mut iter = formulas.into_iter();
		match iter.next() {
			None => self.bool_const(true),
			Some(first) => iter.fold(first, |acc, f| self.and(acc, f)),
		}
	}

	/// Create a constant formula.
	pub fn bool_const(&mut self, value: bool) -> FormulaId {
		self.formulas.push(FormulaNode::Constant(value))
	}

	/// Create the integer expression counting the tuples of an expression.
	pub fn cardinality<E: IntoExpr>(&mut self, expr: E) -> IntExprId {
		let e = expr.into_expr(self);
		self.int_exprs.push(IntExprNode::Cast(IntCastOp::Cardinality, e))
	}

	/// Create the comparison of two expressions of equal arity.
	pub fn compare<A: IntoExpr, B: IntoExpr>(&mut self, op: CompOp, a: A, b: B) -> FormulaId {
		let a = a.into_expr(self);
		let b = b.into_expr(self);
		assert_eq!(
			self.expr_arity(a),
			self.expr_arity(b),
			"compared expressions must have the same arity"
		);
		self.formulas.push(FormulaNode::Comparison(op, a, b))
	}

	/// Create the comprehension expression `{decls | formula}`.
	///
	/// Panics when a declaration of the sequence is not a `one` declaration
	/// of a unary variable.
	pub fn comprehension_expr(&mut self, decls: DeclsId, formula: FormulaId) -> ExprId {
		let arity = self.decls_of(decls).len();
		for d in self.decls_of(decls) {
			assert!(
				d.variable.arity() == 1 && d.multiplicity == Multiplicity::One,
				"comprehensions require `one' declarations of unary variables"
			);
		}
		self.exprs.push(ExprInfo {
			node: ExprNode::Comprehension(decls, formula),
			arity,
		})
	}

	/// Create a declaration of `variable` ranging over `domain` with the
	/// given multiplicity.
	///
	/// Panics when the multiplicity is `no` or the arity of the domain does
	/// not match the arity of the variable.
	pub fn decl<E: IntoExpr>(
		&mut self,
		variable: &Variable,
		multiplicity: Multiplicity,
		domain: E,
	) -> Decl {
		assert!(
			multiplicity != Multiplicity::No,
			"a declaration cannot have multiplicity `no'"
		);
		let expression = domain.into_expr(self);
		assert_eq!(
			self.expr_arity(expression),
			variable.arity(),
			"the domain of `{variable}' must match its arity"
		);
		Decl {
			variable: variable.clone(),
			multiplicity,
			expression,
		}
	}

	/// Intern a nonempty sequence of declarations.
	pub fn decls<I: IntoIterator<Item = Decl>>(&mut self, decls: I) -> DeclsId {
		let decls: Vec<Decl> = decls.into_iter().collect();
		assert!(!decls.is_empty(), "a declaration sequence cannot be empty");
		self.decls.push(decls)
	}

	/// Look up a declaration sequence.
	pub(crate) fn decls_of(&self, id: DeclsId) -> &[Decl] {
		&self.decls[id]
	}

	/// Create the set difference of two expressions of equal arity.
	pub fn difference<A: IntoExpr, B: IntoExpr>(&mut self, a: A, b: B) -> ExprId {
		self.expr_binary(ExprBinOp::Difference, a, b)
	}

	/// Create the comparison `a = b` of two expressions of equal arity.
	pub fn equals<A: IntoExpr, B: IntoExpr>(&mut self, a: A, b: B) -> FormulaId {
		self.compare(CompOp::Equals, a, b)
	}

	/// The arity of an expression.
	pub fn expr_arity(&self, expr: ExprId) -> usize {
		self.exprs[expr].arity
	}

	/// Create a binary expression, checking the arity rule of the operator.
	pub fn expr_binary<A: IntoExpr, B: IntoExpr>(
		&mut self,
		op: ExprBinOp,
		a: A,
		b: B,
	) -> ExprId {
		let a = a.into_expr(self);
		let b = b.into_expr(self);
		let (m, n) = (self.expr_arity(a), self.expr_arity(b));
		let arity = match op {
			ExprBinOp::Union
			| ExprBinOp::Intersection
			| ExprBinOp::Difference
			| ExprBinOp::Override => {
				assert_eq!(m, n, "{op:?} requires operands of the same arity");
				m
			},
			ExprBinOp::Join => {
				assert!(m + n >= 3, "join requires a result arity of at least one");
				m + n - 2
			},
			ExprBinOp::Product => m + n,
		};
		self.exprs.push(ExprInfo {
			node: ExprNode::Binary(op, a, b),
			arity,
		})
	}

	/// Look up an expression node.
	pub(crate) fn expr_node(&self, expr: ExprId) -> &ExprNode {
		&self.exprs[expr].node
	}

	/// Create a unary expression, checking the arity rule of the operator.
	pub fn expr_unary<E: IntoExpr>(&mut self, op: ExprUnOp, expr: E) -> ExprId {
		let e = expr.into_expr(self);
		assert_eq!(
			self.expr_arity(e),
			2,
			"{op:?} requires a binary operand"
		);
		self.exprs.push(ExprInfo {
			node: ExprNode::Unary(op, e),
			arity: 2,
		})
	}

	/// Create the existentially quantified formula `some decls | body`.
	pub fn exists(&mut self, decls: DeclsId, body: FormulaId) -> FormulaId {
		self.formulas
			.push(FormulaNode::Quantified(Quantifier::Some, decls, body))
	}

	/// Create the universally quantified formula `all decls | body`.
	pub fn forall(&mut self, decls: DeclsId, body: FormulaId) -> FormulaId {
		self.formulas
			.push(FormulaNode::Quantified(Quantifier::All, decls, body))
	}

	/// Look up a formula node.
	pub(crate) fn formula_node(&self, formula: FormulaId) -> &FormulaNode {
		&self.formulas[formula]
	}

	/// Create the predicate that the binary relation `relation` is a total
	/// function from `domain` to `range`.
	pub fn function<D: IntoExpr, R: IntoExpr>(
		&mut self,
		relation: &Relation,
		domain: D,
		range: R,
	) -> FormulaId {
		self.function_impl(relation, domain, range, false)
	}

	/// Create the choice `if condition then a else b` between two
	/// expressions of equal arity.
	pub fn ite_expr<A: IntoExpr, B: IntoExpr>(
		&mut self,
		condition: FormulaId,
		a: A,
		b: B,
	) -> ExprId {
		let a = a.into_expr(self);
		let b = b.into_expr(self);
		assert_eq!(
			self.expr_arity(a),
			self.expr_arity(b),
			"the branches of a conditional expression must have the same arity"
		);
		let arity = self.expr_arity(a);
		self.exprs.push(ExprInfo {
			node: ExprNode::IfThenElse(condition, a, b),
			arity,
		})
	}

	/// Create the equivalence of two formulas.
	pub fn iff(&mut self, a: FormulaId, b: FormulaId) -> FormulaId {
		self.formulas.push(FormulaNode::Binary(FormulaBinOp::Iff, a, b))
	}

	/// Create the implication of two formulas.
	pub fn implies(&mut self, a: FormulaId, b: FormulaId) -> FormulaId {
		self.formulas
			.push(FormulaNode::Binary(FormulaBinOp::Implies, a, b))
	}

	/// Create a binary integer expression.
	pub fn int_binary(&mut self, op: IntBinOp, a: IntExprId, b: IntExprId) -> IntExprId {
		self.int_exprs.push(IntExprNode::Binary(op, a, b))
	}

	/// Create the comparison of two integer expressions.
	pub fn int_compare(&mut self, op: IntCompOp, a: IntExprId, b: IntExprId) -> FormulaId {
		self.formulas.push(FormulaNode::IntComparison(op, a, b))
	}

	/// Create an integer constant expression.
	pub fn int_const(&mut self, value: IntVal) -> IntExprId {
		self.int_exprs.push(IntExprNode::Constant(value))
	}

	/// Create the comparison `a = b` of two integer expressions.
	pub fn int_eq(&mut self, a: IntExprId, b: IntExprId) -> FormulaId {
		self.int_compare(IntCompOp::Eq, a, b)
	}

	/// Look up an integer expression node.
	pub(crate) fn int_node(&self, expr: IntExprId) -> &IntExprNode {
		&self.int_exprs[expr]
	}

	/// Create the integer expression summing the integer atoms held by a
	/// unary expression.
	pub fn int_sum_of<E: IntoExpr>(&mut self, expr: E) -> IntExprId {
		let e = expr.into_expr(self);
		assert_eq!(
			self.expr_arity(e),
			1,
			"integer sums are defined over unary expressions"
		);
		self.int_exprs.push(IntExprNode::Cast(IntCastOp::Sum, e))
	}

	/// Create a unary integer expression.
	pub fn int_unary(&mut self, op: IntUnOp, expr: IntExprId) -> IntExprId {
		self.int_exprs.push(IntExprNode::Unary(op, expr))
	}

	/// Create the set intersection of two expressions of equal arity.
	pub fn intersection<A: IntoExpr, B: IntoExpr>(&mut self, a: A, b: B) -> ExprId {
		self.expr_binary(ExprBinOp::Intersection, a, b)
	}

	/// Create the relational join of two expressions.
	///
	/// Panics when the arities of the operands sum to less than three, since
	/// the join would then have no columns.
	pub fn join<A: IntoExpr, B: IntoExpr>(&mut self, a: A, b: B) -> ExprId {
		self.expr_binary(ExprBinOp::Join, a, b)
	}

	/// Create the multiplicity formula `lone expr`.
	pub fn lone<E: IntoExpr>(&mut self, expr: E) -> FormulaId {
		self.mult_formula(Multiplicity::Lone, expr)
	}

	/// Create a `lone` declaration of `variable` over `domain`.
	pub fn lone_of<E: IntoExpr>(&mut self, variable: &Variable, domain: E) -> Decl {
		self.decl(variable, Multiplicity::Lone, domain)
	}

	/// Create a multiplicity formula.
	///
	/// Panics when the multiplicity is `set`, which is meaningful only in
	/// declarations.
	pub fn mult_formula<E: IntoExpr>(&mut self, m: Multiplicity, expr: E) -> FormulaId {
		assert!(
			m != Multiplicity::Set,
			"`set' is not a multiplicity formula"
		);
		let e = expr.into_expr(self);
		self.formulas.push(FormulaNode::Multiplicity(m, e))
	}

	/// Create the multiplicity formula `no expr`.
	pub fn no<E: IntoExpr>(&mut self, expr: E) -> FormulaId {
		self.mult_formula(Multiplicity::No, expr)
	}

	/// Create the negation of a formula.
	pub fn not(&mut self, formula: FormulaId) -> FormulaId {
		self.formulas.push(FormulaNode::Not(formula))
	}

	/// Create the multiplicity formula `one expr`.
	pub fn one<E: IntoExpr>(&mut self, expr: E) -> FormulaId {
		self.mult_formula(Multiplicity::One, expr)
	}

	/// Create a `one` declaration of `variable` over `domain`.
	pub fn one_of<E: IntoExpr>(&mut self, variable: &Variable, domain: E) -> Decl {
		self.decl(variable, Multiplicity::One, domain)
	}

	/// Create the disjunction of two formulas.
	pub fn or(&mut self, a: FormulaId, b: FormulaId) -> FormulaId {
		self.formulas.push(FormulaNode::Binary(FormulaBinOp::Or, a, b))
	}

	/// Create the disjunction of a sequence of formulas, associating to the
	/// left; the empty disjunction is the constant false formula.
	pub fn or_all<I: IntoIterator<Item = FormulaId>>(&mut self, formulas: I) -> FormulaId {
		let mut iter = formulas.into_iter();
		match iter.next() {
			None => self.bool_const(false),
			Some(first) => iter.fold(first, |acc, f| self.or(acc, f)),
		}
	}

	/// Create the relational override `a ++ b` of two expressions of equal
	/// arity.
	pub fn override_of<A: IntoExpr, B: IntoExpr>(&mut self, a: A, b: B) -> ExprId {
		self.expr_binary(ExprBinOp::Override, a, b)
	}

	/// Create the predicate that the binary relation `relation` is a partial
	/// function from `domain` to `range`.
	pub fn partial_function<D: IntoExpr, R: IntoExpr>(
		&mut self,
		relation: &Relation,
		domain: D,
		range: R,
	) -> FormulaId {
		self.function_impl(relation, domain, range, true)
	}

	/// Create the cross product of two expressions.
	pub fn product<A: IntoExpr, B: IntoExpr>(&mut self, a: A, b: B) -> ExprId {
		self.expr_binary(ExprBinOp::Product, a, b)
	}

	/// Declare a fresh relation with the given name and arity.
	///
	/// Panics when the arity is zero.
	pub fn relation(&mut self, name: impl Into<Rc<str>>, arity: usize) -> Relation {
		assert!(arity >= 1, "a relation must have arity at least one");
		let name = name.into();
		let id = self.relations.next_idx();
		let relation = Relation { id, arity, name };
		let _ = self.relations.push(relation.clone());
		relation
	}

	/// Create a `set` declaration of `variable` over `domain`.
	pub fn set_of<E: IntoExpr>(&mut self, variable: &Variable, domain: E) -> Decl {
		self.decl(variable, Multiplicity::Set, domain)
	}

	/// Create the multiplicity formula `some expr`.
	pub fn some<E: IntoExpr>(&mut self, expr: E) -> FormulaId {
		self.mult_formula(Multiplicity::Some, expr)
	}

	/// Create a `some` declaration of `variable` over `domain`.
	pub fn some_of<E: IntoExpr>(&mut self, variable: &Variable, domain: E) -> Decl {
		self.decl(variable, Multiplicity::Some, domain)
	}

	/// Create the comparison `a ⊆ b` of two expressions of equal arity.
	pub fn subset<A: IntoExpr, B: IntoExpr>(&mut self, a: A, b: B) -> FormulaId {
		self.compare(CompOp::Subset, a, b)
	}

	/// Create the integer expression summing `body` over the bindings of a
	/// declaration sequence.
	///
	/// Panics when a declaration of the sequence is not a `one` declaration
	/// of a unary variable.
	pub fn sum(&mut self, decls: DeclsId, body: IntExprId) -> IntExprId {
		for d in self.decls_of(decls) {
			assert!(
				d.variable.arity() == 1 && d.multiplicity == Multiplicity::One,
				"sums require `one' declarations of unary variables"
			);
		}
		self.int_exprs.push(IntExprNode::Sum(decls, body))
	}

	/// Create the unary expression holding the atom that represents the
	/// value of an integer expression.
	pub fn to_expr(&mut self, expr: IntExprId) -> ExprId {
		self.exprs.push(ExprInfo {
			node: ExprNode::IntCast(expr),
			arity: 1,
		})
	}

	/// Create the predicate that `relation` is a total ordering: a successor
	/// relation arranging the atoms of `ordered` in a single chain from
	/// `first` to `last`.
	pub fn total_ordering(
		&mut self,
		relation: &Relation,
		ordered: &Relation,
		first: &Relation,
		last: &Relation,
	) -> FormulaId {
		assert_eq!(relation.arity(), 2, "a total ordering must be binary");
		assert!(
			ordered.arity() == 1 && first.arity() == 1 && last.arity() == 1,
			"the ordered, first, and last relations must be unary"
		);
		self.formulas.push(FormulaNode::TotalOrdering {
			relation: relation.clone(),
			ordered: ordered.clone(),
			first: first.clone(),
			last: last.clone(),
		})
	}

	/// Create the set union of two expressions of equal arity.
	pub fn union<A: IntoExpr, B: IntoExpr>(&mut self, a: A, b: B) -> ExprId {
		self.expr_binary(ExprBinOp::Union, a, b)
	}

	/// Declare a fresh variable with the given name and arity.
	///
	/// Panics when the arity is zero.
	pub fn variable(&mut self, name: impl Into<Rc<str>>, arity: usize) -> Variable {
		assert!(arity >= 1, "a variable must have arity at least one");
		let name = name.into();
		let id = self.variables.next_idx();
		let variable = Variable { id, arity, name };
		let _ = self.variables.push(variable.clone());
		variable
	}

	/// Shared implementation of the total and partial function predicates.
	fn function_impl<D: IntoExpr, R: IntoExpr>(
		&mut self,
		relation: &Relation,
		domain: D,
		range: R,
		partial: bool,
	) -> FormulaId {
		assert_eq!(relation.arity(), 2, "a function must be a binary relation");
		let domain = domain.into_expr(self);
		let range = range.into_expr(self);
		assert!(
			self.expr_arity(domain) == 1 && self.expr_arity(range) == 1,
			"the domain and range of a function must be unary"
		);
		self.formulas.push(FormulaNode::Function {
			relation: relation.clone(),
			domain,
			range,
			partial,
		})
	}
}

impl Default for AstPool {
	fn default() -> Self {
		AstPool::new()
	}
}

impl Display for Multiplicity {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Multiplicity::Lone => "lone",
			Multiplicity::No => "no",
			Multiplicity::One => "one",
			Multiplicity::Some => "some",
			Multiplicity::Set => "set",
		})
	}
}

impl Relation {
	/// The arity of the relation.
	pub fn arity(&self) -> usize {
		self.arity
	}

	/// The index of the relation in its pool.
	pub(crate) fn id(&self) -> RelId {
		self.id
	}

	/// The name of the relation.
	pub fn name(&self) -> &str {
		&self.name
	}
}

impl Display for Relation {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)
	}
}

impl PartialEq for Relation {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for Relation {}

impl std::hash::Hash for Relation {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl Variable {
	/// The arity of the variable.
	pub fn arity(&self) -> usize {
		self.arity
	}

	/// The index of the variable in its pool.
	pub(crate) fn id(&self) -> VarId {
		self.id
	}

	/// The name of the variable.
	pub fn name(&self) -> &str {
		&self.name
	}
}

impl Display for Variable {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)
	}
}

impl PartialEq for Variable {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for Variable {}

impl std::hash::Hash for Variable {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl IntoExpr for ExprId {
	fn into_expr(self, _: &mut AstPool) -> ExprId {
		self
	}
}

impl IntoExpr for &Relation {
	fn into_expr(self, pool: &mut AstPool) -> ExprId {
		let arity = self.arity();
		pool.exprs.push(ExprInfo {
			node: ExprNode::Relation(self.clone()),
			arity,
		})
	}
}

impl IntoExpr for &Variable {
	fn into_expr(self, pool: &mut AstPool) -> ExprId {
		let arity = self.arity();
		pool.exprs.push(ExprInfo {
			node: ExprNode::Variable(self.clone()),
			arity,
		})
	}
}

impl IntoExpr for ExprConst {
	fn into_expr(self, pool: &mut AstPool) -> ExprId {
		let arity = match self {
			ExprConst::Iden => 2,
			_ => 1,
		};
		pool.exprs.push(ExprInfo {
			node: ExprNode::Constant(self),
			arity,
		})
	}
}

#[cfg(test)]
mod tests {
	use crate::ast::{AstPool, ExprConst, ExprUnOp, IntoExpr, Multiplicity};

	#[test]
	fn test_arity_rules() {
		let mut ast = AstPool::new();
		let r = ast.relation("r", 2);
		let s = ast.relation("s", 1);

		let j = ast.join(&s, &r);
		assert_eq!(ast.expr_arity(j), 1);
		let p = ast.product(&r, &s);
		assert_eq!(ast.expr_arity(p), 3);
		let t = ast.expr_unary(ExprUnOp::Transpose, &r);
		assert_eq!(ast.expr_arity(t), 2);
		let iden = ExprConst::Iden.into_expr(&mut ast);
		assert_eq!(ast.expr_arity(iden), 2);
	}

	#[test]
	fn test_leaf_identity() {
		let mut ast = AstPool::new();
		let r = ast.relation("r", 1);
		let r2 = ast.relation("r", 1);
		assert_eq!(r, r.clone());
		assert_ne!(r, r2);
	}

	#[test]
	#[should_panic(expected = "same arity")]
	fn test_union_arity_violation() {
		let mut ast = AstPool::new();
		let r = ast.relation("r", 2);
		let s = ast.relation("s", 1);
		let _ = ast.union(&r, &s);
	}

	#[test]
	#[should_panic(expected = "result arity of at least one")]
	fn test_join_arity_violation() {
		let mut ast = AstPool::new();
		let r = ast.relation("r", 1);
		let s = ast.relation("s", 1);
		let _ = ast.join(&r, &s);
	}

	#[test]
	#[should_panic(expected = "binary operand")]
	fn test_closure_arity_violation() {
		let mut ast = AstPool::new();
		let r = ast.relation("r", 3);
		let _ = ast.expr_unary(ExprUnOp::Closure, &r);
	}

	#[test]
	#[should_panic(expected = "`one' declarations")]
	fn test_comprehension_multiplicity_violation() {
		let mut ast = AstPool::new();
		let r = ast.relation("r", 1);
		let x = ast.variable("x", 1);
		let d = ast.set_of(&x, &r);
		let ds = ast.decls([d]);
		let t = ast.bool_const(true);
		let _ = ast.comprehension_expr(ds, t);
	}

	#[test]
	#[should_panic(expected = "cannot have multiplicity `no'")]
	fn test_decl_no_violation() {
		let mut ast = AstPool::new();
		let r = ast.relation("r", 1);
		let x = ast.variable("x", 1);
		let _ = ast.decl(&x, Multiplicity::No, &r);
	}
}
