//! Sharing and free-variable analysis over the syntax DAG.
//!
//! A single depth-first pass computes, for a root node, the identity set of
//! its internal descendants that have more than one parent, together with
//! the free variables of every visited node. Later passes consult the result
//! to decide which nodes may be cached: only shared nodes, and only when
//! they have no free variables.

use std::{
	collections::{HashMap, HashSet},
	rc::Rc,
};

use itertools::Itertools;

use crate::ast::{
	AstPool, DeclsId, ExprId, ExprNode, FormulaId, FormulaNode, IntExprId, IntExprNode, VarId,
};

/// The analysis state of a single [`Annotated::annotate_formula`] or
/// [`Annotated::annotate_expr`] pass.
struct Analyzer<'a> {
	/// The pool that owns the analyzed nodes.
	pool: &'a AstPool,
	/// The free variables of every node visited so far.
	///
	/// A node is visited again exactly when it has more than one parent, so
	/// a memo hit doubles as the sharing signal.
	memo: HashMap<Node, Rc<Vec<VarId>>>,
	/// The internal nodes found to have more than one parent.
	shared: HashSet<Node>,
	/// The nodes with at least one free variable.
	open: HashSet<Node>,
}

#[derive(Clone, Debug)]
/// A root node together with the sharing and free-variable structure of its
/// descendants.
pub(crate) struct Annotated {
	/// The annotated root.
	root: Node,
	/// The internal descendants of the root with more than one parent.
	shared: HashSet<Node>,
	/// The descendants of the root with at least one free variable.
	open: HashSet<Node>,
	/// For roots produced by a rewriting pass, the mapping from rewritten
	/// descendants to the nodes they were derived from.
	sources: Option<HashMap<Node, Node>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// An identity reference to a node of any syntactic category.
pub(crate) enum Node {
	/// A relational expression.
	Expr(ExprId),
	/// A formula.
	Formula(FormulaId),
	/// An integer expression.
	IntExpr(IntExprId),
}

impl Analyzer<'_> {
	/// The free variables of a declaration sequence's domains, together with
	/// the variables the sequence binds.
	fn decls(&mut self, decls: DeclsId) -> (Rc<Vec<VarId>>, Vec<VarId>) {
		let ds = self.pool.decls_of(decls).to_vec();
		let mut free = Rc::new(Vec::new());
		let mut bound = Vec::with_capacity(ds.len());
		for d in &ds {
			let fv = self.expr(d.expression);
			free = union(&free, &fv);
			bound.push(d.variable.id());
		}
		(free, bound)
	}

	/// Analyze an expression, returning its free variables.
	fn expr(&mut self, expr: ExprId) -> Rc<Vec<VarId>> {
		let node = Node::Expr(expr);
		if let Some(fv) = self.memo.get(&node) {
			let fv = Rc::clone(fv);
			self.mark_shared(node);
			return fv;
		}
		let fv = match self.pool.expr_node(expr).clone() {
			ExprNode::Relation(_) | ExprNode::Constant(_) => Rc::new(Vec::new()),
			ExprNode::Variable(v) => Rc::new(vec![v.id()]),
			ExprNode::Unary(_, e) => self.expr(e),
			ExprNode::Binary(_, a, b) => {
				let a = self.expr(a);
				let b = self.expr(b);
				union(&a, &b)
			},
			ExprNode::IfThenElse(c, t, e) => {
				let c = self.formula(c);
				let t = self.expr(t);
				let e = self.expr(e);
				union(&union(&c, &t), &e)
			},
			ExprNode::Comprehension(decls, f) => {
				let (dv, bound) = self.decls(decls);
				let bv = self.formula(f);
				minus(&union(&dv, &bv), &bound)
			},
			ExprNode::IntCast(ie) => self.int_expr(ie),
		};
		self.record(node, fv)
	}

	/// Analyze a formula, returning its free variables.
	fn formula(&mut self, formula: FormulaId) -> Rc<Vec<VarId>> {
		let node = Node::Formula(formula);
		if let Some(fv) = self.memo.get(&node) {
			let fv = Rc::clone(fv);
			self.mark_shared(node);
			return fv;
		}
		let fv = match self.pool.formula_node(formula).clone() {
			FormulaNode::Constant(_) | FormulaNode::Acyclic(_) | FormulaNode::TotalOrdering { .. } => {
				Rc::new(Vec::new())
			},
			FormulaNode::Not(f) => self.formula(f),
			FormulaNode::Binary(_, a, b) => {
				let a = self.formula(a);
				let b = self.formula(b);
				union(&a, &b)
			},
			FormulaNode::Quantified(_, decls, body) => {
				let (dv, bound) = self.decls(decls);
				let bv = self.formula(body);
				minus(&union(&dv, &bv), &bound)
			},
			FormulaNode::Multiplicity(_, e) => self.expr(e),
			FormulaNode::Comparison(_, a, b) => {
				let a = self.expr(a);
				let b = self.expr(b);
				union(&a, &b)
			},
			FormulaNode::IntComparison(_, a, b) => {
				let a = self.int_expr(a);
				let b = self.int_expr(b);
				union(&a, &b)
			},
			FormulaNode::Function { domain, range, .. } => {
				let d = self.expr(domain);
				let r = self.expr(range);
				union(&d, &r)
			},
		};
		self.record(node, fv)
	}

	/// Analyze an integer expression, returning its free variables.
	fn int_expr(&mut self, expr: IntExprId) -> Rc<Vec<VarId>> {
		let node = Node::IntExpr(expr);
		if let Some(fv) = self.memo.get(&node) {
			let fv = Rc::clone(fv);
			self.mark_shared(node);
			return fv;
		}
		let fv = match self.pool.int_node(expr).clone() {
			IntExprNode::Constant(_) => Rc::new(Vec::new()),
			IntExprNode::Unary(_, e) => self.int_expr(e),
			IntExprNode::Binary(_, a, b) => {
				let a = self.int_expr(a);
				let b = self.int_expr(b);
				union(&a, &b)
			},
			IntExprNode::Sum(decls, body) => {
				let (dv, bound) = self.decls(decls);
				let bv = self.int_expr(body);
				minus(&union(&dv, &bv), &bound)
			},
			IntExprNode::Cast(_, e) => self.expr(e),
		};
		self.record(node, fv)
	}

	/// Add an internal node that was reached through a second parent to the
	/// shared set.
	fn mark_shared(&mut self, node: Node) {
		let leaf = match node {
			Node::Expr(e) => matches!(
				self.pool.expr_node(e),
				ExprNode::Relation(_) | ExprNode::Variable(_) | ExprNode::Constant(_)
			),
			Node::Formula(f) => matches!(self.pool.formula_node(f), FormulaNode::Constant(_)),
			Node::IntExpr(e) => matches!(self.pool.int_node(e), IntExprNode::Constant(_)),
		};
		if !leaf {
			let _ = self.shared.insert(node);
		}
	}

	/// Memoize the free variables of a first-visited node.
	fn record(&mut self, node: Node, fv: Rc<Vec<VarId>>) -> Rc<Vec<VarId>> {
		if !fv.is_empty() {
			let _ = self.open.insert(node);
		}
		let _ = self.memo.insert(node, Rc::clone(&fv));
		fv
	}
}

impl Annotated {
	/// Analyze the expression DAG rooted at `root`.
	pub(crate) fn annotate_expr(pool: &AstPool, root: ExprId) -> Self {
		let mut analyzer = Analyzer {
			pool,
			memo: HashMap::new(),
			shared: HashSet::new(),
			open: HashSet::new(),
		};
		let _ = analyzer.expr(root);
		Annotated {
			root: Node::Expr(root),
			shared: analyzer.shared,
			open: analyzer.open,
			sources: None,
		}
	}

	/// Analyze the formula DAG rooted at `root`.
	pub(crate) fn annotate_formula(pool: &AstPool, root: FormulaId) -> Self {
		let mut analyzer = Analyzer {
			pool,
			memo: HashMap::new(),
			shared: HashSet::new(),
			open: HashSet::new(),
		};
		let _ = analyzer.formula(root);
		Annotated {
			root: Node::Formula(root),
			shared: analyzer.shared,
			open: analyzer.open,
			sources: None,
		}
	}

	/// Whether `node` has no free variables.
	pub(crate) fn closed(&self, node: Node) -> bool {
		!self.open.contains(&node)
	}

	/// The annotated root, which must be a formula.
	pub(crate) fn root_formula(&self) -> FormulaId {
		match self.root {
			Node::Formula(f) => f,
			_ => unreachable!("the annotated root is not a formula"),
		}
	}

	/// Whether `node` is an internal node with more than one parent.
	pub(crate) fn shared(&self, node: Node) -> bool {
		self.shared.contains(&node)
	}

	/// The mapping from rewritten descendants to their sources, when the
	/// root was produced by a rewriting pass that recorded one.
	pub(crate) fn sources(&self) -> Option<&HashMap<Node, Node>> {
		self.sources.as_ref()
	}

	/// Attach the rewritten-node provenance of a rewriting pass.
	pub(crate) fn with_sources(mut self, sources: HashMap<Node, Node>) -> Self {
		self.sources = Some(sources);
		self
	}
}

/// The sorted difference of a free-variable set and a sequence of bound
/// variables.
fn minus(fv: &Rc<Vec<VarId>>, bound: &[VarId]) -> Rc<Vec<VarId>> {
	if fv.is_empty() || bound.is_empty() {
		return Rc::clone(fv);
	}
	Rc::new(
		fv.iter()
			.filter(|&v| !bound.contains(v))
			.copied()
			.collect::<Vec<_>>(),
	)
}

/// The sorted union of two free-variable sets.
fn union(a: &Rc<Vec<VarId>>, b: &Rc<Vec<VarId>>) -> Rc<Vec<VarId>> {
	if a.is_empty() {
		return Rc::clone(b);
	}
	if b.is_empty() {
		return Rc::clone(a);
	}
	Rc::new(a.iter().merge(b.iter()).dedup().copied().collect())
}

#[cfg(test)]
mod tests {
	use crate::ast::{
		annotate::{Annotated, Node},
		AstPool, IntoExpr,
	};

	#[test]
	fn test_shared_detection() {
		let mut ast = AstPool::new();
		let r = ast.relation("r", 1);
		let s = ast.relation("s", 1);
		let u = ast.union(&r, &s);
		// `u` has two parents; the leaves are excluded from the shared set.
		let f = {
			let a = ast.some(u);
			let b = ast.no(u);
			ast.and(a, b)
		};

		let annotated = Annotated::annotate_formula(&ast, f);
		assert!(annotated.shared(Node::Expr(u)));
		assert!(annotated.closed(Node::Expr(u)));
		assert_eq!(annotated.root_formula(), f);
	}

	#[test]
	fn test_free_variables() {
		let mut ast = AstPool::new();
		let r = ast.relation("r", 1);
		let x = ast.variable("x", 1);
		let xe = (&x).into_expr(&mut ast);
		let body = ast.subset(xe, &r);
		let d = ast.one_of(&x, &r);
		let ds = ast.decls([d]);
		let q = ast.forall(ds, body);

		let annotated = Annotated::annotate_formula(&ast, q);
		// The body mentions `x` free; the quantified formula binds it.
		assert!(!annotated.closed(Node::Formula(body)));
		assert!(annotated.closed(Node::Formula(q)));
	}
}
