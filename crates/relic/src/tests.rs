//! End-to-end tests driving formulas through translation, solving, and
//! instance reconstruction.

use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};

use expect_test::expect;
use tracing_test::traced_test;

use crate::{
	ast::{AstPool, ExprConst, ExprUnOp, FormulaId, IntBinOp, IntoExpr},
	instance::bounds::Bounds,
	solver::{Outcome, SolveError, Solver},
	Options, Universe,
};

/// Collect the sorted instance renderings of all satisfiable solutions,
/// asserting that enumeration ends with an unsatisfiable outcome.
fn sorted_models(
	solver: &Solver,
	pool: &mut AstPool,
	formula: FormulaId,
	bounds: &Bounds,
) -> Vec<String> {
	let solutions: Vec<_> = solver
		.solve_all(pool, formula, bounds)
		.map(|s| s.expect("enumeration succeeds"))
		.collect();
	let last = solutions.last().expect("enumeration is never empty");
	assert!(
		!last.outcome().is_satisfiable(),
		"enumeration must terminate with an unsatisfiable outcome"
	);
	let mut models: Vec<String> = solutions
		.iter()
		.filter(|s| s.outcome().is_satisfiable())
		.map(|s| s.instance().expect("satisfiable solution").to_string())
		.collect();
	models.sort();
	models
}

#[test]
fn test_trivially_satisfiable_equality() {
	let mut ast = AstPool::new();
	let u = Universe::new(["a", "b"]);
	let r = ast.relation("r", 1);
	let mut bounds = Bounds::new(u.clone());
	bounds.bound_upper(&r, u.all(1));

	let f = ast.equals(&r, &r);
	let solution = Solver::default().solve(&mut ast, f, &bounds).unwrap();

	assert_eq!(solution.outcome(), Outcome::TriviallySatisfiable);
	assert_eq!(
		(
			solution.primary_variables(),
			solution.variables(),
			solution.clauses()
		),
		(0, 0, 0)
	);
	// The trivial instance is the lower bound of every relation.
	expect!["TRIVIALLY_SATISFIABLE: r={}"].assert_eq(&solution.to_string());
}

#[test]
fn test_trivially_unsatisfiable() {
	let mut ast = AstPool::new();
	let u = Universe::new(["a"]);
	let bounds = Bounds::new(u);

	let f = ast.some(ExprConst::None);
	let solution = Solver::default().solve(&mut ast, f, &bounds).unwrap();

	assert_eq!(solution.outcome(), Outcome::TriviallyUnsatisfiable);
	assert_eq!(solution.variables(), 0);
	expect!["TRIVIALLY_UNSATISFIABLE"].assert_eq(&solution.to_string());
}

#[test]
fn test_some_relation_enumeration() {
	let mut ast = AstPool::new();
	let u = Universe::new(["a", "b"]);
	let r = ast.relation("r", 1);
	let mut bounds = Bounds::new(u.clone());
	bounds.bound_upper(&r, u.all(1));

	let f = ast.some(&r);
	let solver = Solver::default();
	let first = solver.solve(&mut ast, f, &bounds).unwrap();
	assert_eq!(first.outcome(), Outcome::Satisfiable);
	assert_eq!(first.primary_variables(), 2);

	let models = sorted_models(&solver, &mut ast, f, &bounds);
	expect![[r#"
        r={[a], [b]}
        r={[a]}
        r={[b]}"#]]
	.assert_eq(&models.join("\n"));
}

#[test]
fn test_lower_bound_padding() {
	let mut ast = AstPool::new();
	let u = Universe::new(["a", "b"]);
	let a = ast.relation("A", 1);
	let b = ast.relation("B", 1);
	let mut bounds = Bounds::new(u.clone());
	bounds.bound_exactly(&a, u.tuples(1, [["a"]]));
	bounds.bound_upper(&b, u.tuples(1, [["b"]]));

	let f = ast.some(&b);
	let solution = Solver::default().solve(&mut ast, f, &bounds).unwrap();

	assert_eq!(solution.outcome(), Outcome::Satisfiable);
	// `A` has no primary variables, yet the instance carries its lower
	// bound.
	expect!["SATISFIABLE: A={[a]}, B={[b]}"].assert_eq(&solution.to_string());
}

#[test]
fn test_unbound_relation() {
	let mut ast = AstPool::new();
	let u = Universe::new(["a"]);
	let r = ast.relation("r", 1);
	let bounds = Bounds::new(u);

	let f = ast.some(&r);
	let err = Solver::default().solve(&mut ast, f, &bounds).unwrap_err();
	assert!(matches!(err, SolveError::UnboundLeaf { name } if name == "r"));
}

#[test]
fn test_higher_order_declaration() {
	let mut ast = AstPool::new();
	let u = Universe::new(["a", "b"]);
	let r = ast.relation("r", 1);
	let mut bounds = Bounds::new(u.clone());
	bounds.bound_upper(&r, u.all(1));

	let x = ast.variable("x", 1);
	let xe = (&x).into_expr(&mut ast);
	let body = ast.some(xe);
	let d = ast.set_of(&x, &r);
	let ds = ast.decls([d]);
	let f = ast.exists(ds, body);

	// Without skolemization the `set` declaration cannot be translated.
	let solver = Solver::new(Options::default().with_skolem_depth(-1));
	let err = solver.solve(&mut ast, f, &bounds).unwrap_err();
	assert!(matches!(err, SolveError::HigherOrderDecl { .. }));

	// Skolemization eliminates it: the models pair every nonempty subset
	// of `r` with `r` itself.
	let solver = Solver::default();
	let models = sorted_models(&solver, &mut ast, f, &bounds);
	assert_eq!(models.len(), 5);
}

#[test]
fn test_skolemization_preserves_outcome() {
	for (r_rows, s_rows, expected) in [
		(vec!["a", "b"], vec!["a"], true),
		(vec!["a"], vec!["b"], false),
	] {
		let mut outcomes = Vec::new();
		for depth in [0, -1] {
			let mut ast = AstPool::new();
			let u = Universe::new(["a", "b"]);
			let r = ast.relation("r", 1);
			let s = ast.relation("s", 1);
			let mut bounds = Bounds::new(u.clone());
			bounds.bound_upper(&r, u.tuples(1, r_rows.iter().map(|a| [*a])));
			bounds.bound_exactly(&s, u.tuples(1, s_rows.iter().map(|a| [*a])));

			// some x: one r | x ⊆ s, with x also required in r's upper
			// half so both paths do real work.
			let x = ast.variable("x", 1);
			let xe = (&x).into_expr(&mut ast);
			let body = ast.subset(xe, &s);
			let d = ast.one_of(&x, &r);
			let ds = ast.decls([d]);
			let f = ast.exists(ds, body);

			let solver = Solver::new(Options::default().with_skolem_depth(depth));
			outcomes.push(solver.solve(&mut ast, f, &bounds).unwrap().outcome());
		}
		// The two pipelines may fold differently (a trivial outcome on one
		// side), but satisfiability must agree.
		assert_eq!(outcomes[0].is_satisfiable(), outcomes[1].is_satisfiable());
		assert_eq!(outcomes[0].is_satisfiable(), expected);
	}
}

/// The pigeonhole formula: `nest` is a total function from pigeons to
/// holes, and no hole houses two pigeons.
fn pigeonhole(ast: &mut AstPool, pigeons: usize, holes: usize) -> (FormulaId, Bounds) {
	let u = Universe::new(
		(0..pigeons)
			.map(|i| format!("p{i}"))
			.chain((0..holes).map(|i| format!("h{i}"))),
	);
	let p = ast.relation("Pigeon", 1);
	let h = ast.relation("Hole", 1);
	let nest = ast.relation("nest", 2);

	let mut bounds = Bounds::new(u.clone());
	bounds.bound_exactly(&p, u.tuples(1, (0..pigeons).map(|i| [format!("p{i}")])));
	bounds.bound_exactly(&h, u.tuples(1, (0..holes).map(|i| [format!("h{i}")])));
	let pts = bounds.lower(&p).unwrap().clone();
	let hts = bounds.lower(&h).unwrap().clone();
	bounds.bound_upper(&nest, pts.product(&hts));

	let total = ast.function(&nest, &p, &h);
	let v = ast.variable("h", 1);
	let ve = (&v).into_expr(ast);
	let occupants = ast.join(&nest, ve);
	let lone = ast.lone(occupants);
	let d = ast.one_of(&v, &h);
	let ds = ast.decls([d]);
	let injective = ast.forall(ds, lone);
	(ast.and(total, injective), bounds)
}

#[test]
#[traced_test]
fn test_pigeonhole_unsatisfiable() {
	let mut ast = AstPool::new();
	let (f, bounds) = pigeonhole(&mut ast, 3, 2);
	let solution = Solver::default().solve(&mut ast, f, &bounds).unwrap();
	assert_eq!(solution.outcome(), Outcome::Unsatisfiable);
	assert_eq!(solution.primary_variables(), 6);
}

#[test]
fn test_pigeonhole_model_count() {
	let mut ast = AstPool::new();
	let (f, bounds) = pigeonhole(&mut ast, 2, 2);
	// The models are exactly the two bijections.
	let models = sorted_models(&Solver::default(), &mut ast, f, &bounds);
	expect![[r#"
        Pigeon={[p0], [p1]}, Hole={[h0], [h1]}, nest={[p0, h0], [p1, h1]}
        Pigeon={[p0], [p1]}, Hole={[h0], [h1]}, nest={[p0, h1], [p1, h0]}"#]]
	.assert_eq(&models.join("\n"));
}

#[test]
fn test_translation_is_deterministic() {
	let mut counts = Vec::new();
	for _ in 0..2 {
		let mut ast = AstPool::new();
		let (f, bounds) = pigeonhole(&mut ast, 3, 2);
		let solution = Solver::default().solve(&mut ast, f, &bounds).unwrap();
		counts.push((
			solution.primary_variables(),
			solution.variables(),
			solution.clauses(),
		));
	}
	assert_eq!(counts[0], counts[1]);
}

#[test]
#[traced_test]
fn test_total_ordering_unique_model() {
	let mut ast = AstPool::new();
	let u = Universe::new(["a", "b", "c"]);
	let ord = ast.relation("ord", 2);
	let elems = ast.relation("elems", 1);
	let first = ast.relation("first", 1);
	let last = ast.relation("last", 1);

	let mut bounds = Bounds::new(u.clone());
	bounds.bound_upper(&ord, u.all(2));
	bounds.bound_exactly(&elems, u.all(1));
	bounds.bound_exactly(&first, u.tuples(1, [["a"]]));
	bounds.bound_exactly(&last, u.tuples(1, [["c"]]));

	let f = ast.total_ordering(&ord, &elems, &first, &last);
	let models = sorted_models(&Solver::default(), &mut ast, f, &bounds);
	expect![[r#"
        ord={[a, b], [b, c]}, elems={[a], [b], [c]}, first={[a]}, last={[c]}"#]]
	.assert_eq(&models.join("\n"));
}

#[test]
fn test_acyclic_enumeration() {
	let mut ast = AstPool::new();
	let u = Universe::new(["a", "b"]);
	let r = ast.relation("r", 2);
	let mut bounds = Bounds::new(u.clone());
	bounds.bound_upper(&r, u.all(2));

	let acyclic = ast.acyclic(&r);
	let nonempty = ast.some(&r);
	let f = ast.and(acyclic, nonempty);
	// Of the nonempty subsets of a 2x2 universe, only the two single
	// cross edges are acyclic.
	let models = sorted_models(&Solver::default(), &mut ast, f, &bounds);
	expect![[r#"
        r={[a, b]}
        r={[b, a]}"#]]
	.assert_eq(&models.join("\n"));
}

#[test]
fn test_closure_and_transpose_on_constants() {
	let mut ast = AstPool::new();
	let u = Universe::new(["a", "b", "c"]);
	let r = ast.relation("r", 2);
	let reach = ast.relation("reach", 1);
	let mut bounds = Bounds::new(u.clone());
	bounds.bound_exactly(&r, u.tuples(2, [["a", "b"], ["b", "c"]]));
	bounds.bound_exactly(&reach, u.tuples(1, [["b"], ["c"]]));

	// a.^r = {b, c} and ~r maps b back to a.
	let closure = ast.expr_unary(ExprUnOp::Closure, &r);
	let a_atom = ast.relation("start", 1);
	bounds.bound_exactly(&a_atom, u.tuples(1, [["a"]]));
	let reachable = ast.join(&a_atom, closure);
	let covers = ast.equals(reachable, &reach);

	let transposed = ast.expr_unary(ExprUnOp::Transpose, &r);
	let b_atom = ast.relation("mid", 1);
	bounds.bound_exactly(&b_atom, u.tuples(1, [["b"]]));
	let back = ast.join(&b_atom, transposed);
	let returns = ast.equals(back, &a_atom);

	let f = ast.and(covers, returns);
	let solution = Solver::default().solve(&mut ast, f, &bounds).unwrap();
	assert_eq!(solution.outcome(), Outcome::TriviallySatisfiable);
}

#[test]
fn test_override_on_constants() {
	let mut ast = AstPool::new();
	let u = Universe::new(["a", "b"]);
	let old = ast.relation("old", 2);
	let new = ast.relation("new", 2);
	let expected = ast.relation("expected", 2);
	let mut bounds = Bounds::new(u.clone());
	bounds.bound_exactly(&old, u.tuples(2, [["a", "a"], ["b", "a"]]));
	bounds.bound_exactly(&new, u.tuples(2, [["a", "b"]]));
	bounds.bound_exactly(&expected, u.tuples(2, [["a", "b"], ["b", "a"]]));

	let overridden = ast.override_of(&old, &new);
	let f = ast.equals(overridden, &expected);
	let solution = Solver::default().solve(&mut ast, f, &bounds).unwrap();
	assert_eq!(solution.outcome(), Outcome::TriviallySatisfiable);
}

#[test]
fn test_comprehension_collapses() {
	let mut ast = AstPool::new();
	let u = Universe::new(["a", "b"]);
	let r = ast.relation("r", 1);
	let mut bounds = Bounds::new(u.clone());
	bounds.bound_upper(&r, u.all(1));

	// {x: univ | x ⊆ r} is r itself, whatever r turns out to be.
	let x = ast.variable("x", 1);
	let xe = (&x).into_expr(&mut ast);
	let body = ast.subset(xe, &r);
	let d = ast.one_of(&x, ExprConst::Univ);
	let ds = ast.decls([d]);
	let comprehension = ast.comprehension_expr(ds, body);
	let f = ast.equals(comprehension, &r);

	let solution = Solver::default().solve(&mut ast, f, &bounds).unwrap();
	assert_eq!(solution.outcome(), Outcome::TriviallySatisfiable);
}

#[test]
fn test_conditional_expression() {
	let mut ast = AstPool::new();
	let u = Universe::new(["a", "b"]);
	let r = ast.relation("r", 1);
	let yes = ast.relation("yes", 1);
	let no = ast.relation("no", 1);
	let mut bounds = Bounds::new(u.clone());
	bounds.bound_upper(&r, u.tuples(1, [["a"]]));
	bounds.bound_exactly(&yes, u.tuples(1, [["a"]]));
	bounds.bound_exactly(&no, u.tuples(1, [["b"]]));

	// (if some r then yes else no) = yes holds exactly when r is
	// nonempty.
	let cond = ast.some(&r);
	let chosen = ast.ite_expr(cond, &yes, &no);
	let f = ast.equals(chosen, &yes);
	let models = sorted_models(&Solver::default(), &mut ast, f, &bounds);
	expect![[r#"
        r={[a]}, yes={[a]}, no={[b]}"#]]
	.assert_eq(&models.join("\n"));
}

#[test]
fn test_integer_constant_folding() {
	let mut ast = AstPool::new();
	let u = Universe::new(["a"]);
	let bounds = Bounds::new(u);
	let solver = Solver::new(Options::default().with_bitwidth(8));

	let cases: Vec<(FormulaId, Outcome)> = {
		let mut mk = |a: i32, op: IntBinOp, b: i32, expected: i32| {
			let a = ast.int_const(a);
			let b = ast.int_const(b);
			let e = ast.int_binary(op, a, b);
			let c = ast.int_const(expected);
			ast.int_eq(e, c)
		};
		let sat = [
			mk(2, IntBinOp::Add, 3, 5),
			mk(2, IntBinOp::Sub, 7, -5),
			mk(3, IntBinOp::Mul, -5, -15),
			mk(7, IntBinOp::Div, 2, 3),
			mk(-7, IntBinOp::Rem, 2, -1),
			mk(1, IntBinOp::Shl, 3, 8),
			mk(-8, IntBinOp::Sha, 1, -4),
			mk(-8, IntBinOp::Shr, 2, 62),
			mk(12, IntBinOp::BitAnd, 10, 8),
			mk(12, IntBinOp::BitOr, 10, 14),
			mk(12, IntBinOp::BitXor, 10, 6),
		];
		let unsat = [mk(2, IntBinOp::Add, 2, 5)];
		sat.into_iter()
			.map(|f| (f, Outcome::TriviallySatisfiable))
			.chain(
				unsat
					.into_iter()
					.map(|f| (f, Outcome::TriviallyUnsatisfiable)),
			)
			.collect()
	};
	for (f, expected) in cases {
		let solution = solver.solve(&mut ast, f, &bounds).unwrap();
		assert_eq!(solution.outcome(), expected);
	}
}

#[test]
fn test_cardinality_model_count() {
	let mut ast = AstPool::new();
	let u = Universe::new(["a", "b", "c"]);
	let r = ast.relation("r", 1);
	let mut bounds = Bounds::new(u.clone());
	bounds.bound_upper(&r, u.all(1));

	let card = ast.cardinality(&r);
	let two = ast.int_const(2);
	let f = ast.int_eq(card, two);
	let models = sorted_models(&Solver::default(), &mut ast, f, &bounds);
	assert_eq!(models.len(), 3);
}

#[test]
fn test_integer_atoms() {
	let mut ast = AstPool::new();
	let u = Universe::new(["0", "1", "2"]);
	let a = ast.relation("A", 1);
	let two = ast.relation("two", 1);
	let mut bounds = Bounds::new(u.clone());
	for i in 0..3 {
		bounds.bound_int(i, u.tuples(1, [[format!("{i}")]]));
	}
	bounds.bound_exactly(&a, u.tuples(1, [["1"], ["2"]]));
	bounds.bound_exactly(&two, u.tuples(1, [["2"]]));

	// The integer atoms of A sum to three.
	let total = ast.int_sum_of(&a);
	let three = ast.int_const(3);
	let sums = ast.int_eq(total, three);

	// Casting the constant two back to an expression yields its atom.
	let two_expr = ast.int_const(2);
	let cast = ast.to_expr(two_expr);
	let casts = ast.equals(cast, &two);

	let f = ast.and(sums, casts);
	let solution = Solver::default().solve(&mut ast, f, &bounds).unwrap();
	assert_eq!(solution.outcome(), Outcome::TriviallySatisfiable);
}

#[test]
fn test_trivial_enumeration_blocks_by_witness() {
	let mut ast = AstPool::new();
	let u = Universe::new(["a"]);
	let r = ast.relation("r", 1);
	let mut bounds = Bounds::new(u.clone());
	bounds.bound_upper(&r, u.all(1));

	// The constant-true formula is trivially satisfied by the lower
	// bounds; the witness blocking then finds the one remaining instance.
	let f = ast.no(ExprConst::None);
	let outcomes: Vec<Outcome> = Solver::default()
		.solve_all(&mut ast, f, &bounds)
		.map(|s| s.expect("enumeration succeeds").outcome())
		.collect();
	assert_eq!(
		outcomes,
		[
			Outcome::TriviallySatisfiable,
			Outcome::Satisfiable,
			Outcome::Unsatisfiable
		]
	);
}

#[test]
fn test_interrupt_aborts_translation() {
	let mut ast = AstPool::new();
	let u = Universe::new(["a", "b"]);
	let r = ast.relation("r", 1);
	let mut bounds = Bounds::new(u.clone());
	bounds.bound_upper(&r, u.all(1));

	let flag = Arc::new(AtomicBool::new(false));
	flag.store(true, Ordering::Relaxed);
	let solver = Solver::new(Options::default().with_interrupt(Arc::clone(&flag)));

	let f = ast.some(&r);
	let err = solver.solve(&mut ast, f, &bounds).unwrap_err();
	assert!(matches!(err, SolveError::Aborted));
}

#[test]
fn test_skolem_constants_in_instances() {
	let mut ast = AstPool::new();
	let u = Universe::new(["a", "b"]);
	let r = ast.relation("r", 1);
	let mut bounds = Bounds::new(u.clone());
	bounds.bound_upper(&r, u.all(1));

	let x = ast.variable("x", 1);
	let xe = (&x).into_expr(&mut ast);
	let body = ast.some(xe);
	let d = ast.one_of(&x, &r);
	let ds = ast.decls([d]);
	let f = ast.exists(ds, body);

	// Skolemizing `some x: one r` introduces the constant `$x`, visible
	// in the enumerated instances.
	let models = sorted_models(&Solver::default(), &mut ast, f, &bounds);
	assert!(models.iter().all(|m| m.contains("$x=")));
}
