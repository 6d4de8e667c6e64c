//! Module containing the bounds on the relational variables of a problem and
//! the instances that witness its satisfiability.

use std::{
	collections::{BTreeMap, HashMap},
	fmt::{self, Display, Formatter},
};

use itertools::Itertools;

use crate::{
	ast::{RelId, Relation},
	instance::{TupleSet, Universe},
	IntVal,
};

#[derive(Clone, Debug)]
/// The per-relation lower and upper tuple bounds of a problem, together with
/// the exact singleton bound of each integer atom.
///
/// A relation bound `(L, U)` restricts every instance `I` to
/// `L ⊆ I(r) ⊆ U`. Relations are translated in the order in which they were
/// first bound; primary variable numbering depends on this order.
pub struct Bounds {
	/// The universe over which the bounds range.
	universe: Universe,
	/// The lower bound of each bound relation.
	lowers: HashMap<RelId, TupleSet>,
	/// The upper bound of each bound relation.
	uppers: HashMap<RelId, TupleSet>,
	/// The bound relations, in the order in which they were first bound.
	order: Vec<Relation>,
	/// The singleton unary tuple set that holds each bound integer.
	ints: BTreeMap<IntVal, TupleSet>,
}

#[derive(Clone, Debug)]
/// A total assignment of tuple sets to relations, consistent with the bounds
/// of the problem it was produced from.
pub struct Instance {
	/// The universe over which the instance ranges.
	universe: Universe,
	/// The tuples assigned to each relation.
	tuples: HashMap<RelId, TupleSet>,
	/// The relations of the instance, in insertion order.
	order: Vec<Relation>,
	/// The singleton unary tuple set that holds each bound integer.
	ints: BTreeMap<IntVal, TupleSet>,
}

impl Bounds {
	/// Create bounds over the given universe, with no relations bound.
	pub fn new(universe: Universe) -> Self {
		Bounds {
			universe,
			lowers: HashMap::new(),
			uppers: HashMap::new(),
			order: Vec::new(),
			ints: BTreeMap::new(),
		}
	}

	/// Bound `relation` to contain every tuple of `lower` and no tuple
	/// outside `upper`.
	///
	/// Panics when the bounds are not over this universe, do not match the
	/// arity of the relation, or `lower` is not a subset of `upper`.
	pub fn bound(&mut self, relation: &Relation, lower: TupleSet, upper: TupleSet) {
		assert!(
			lower.universe() == &self.universe && upper.universe() == &self.universe,
			"bounds for `{relation}' must be over the bounding universe"
		);
		assert!(
			lower.arity() == relation.arity() && upper.arity() == relation.arity(),
			"bounds for `{relation}' must match its arity"
		);
		assert!(
			lower.is_subset(&upper),
			"the lower bound of `{relation}' must be contained in its upper bound"
		);
		if !self.lowers.contains_key(&relation.id()) {
			self.order.push(relation.clone());
		}
		let _ = self.lowers.insert(relation.id(), lower);
		let _ = self.uppers.insert(relation.id(), upper);
	}

	/// Bound `relation` to contain exactly the tuples of `tuples`.
	pub fn bound_exactly(&mut self, relation: &Relation, tuples: TupleSet) {
		self.bound(relation, tuples.clone(), tuples);
	}

	/// Associate the integer `value` with the atom held by the singleton
	/// unary tuple set `tuple`.
	pub fn bound_int(&mut self, value: IntVal, tuple: TupleSet) {
		assert!(
			tuple.universe() == &self.universe,
			"the bound of integer {value} must be over the bounding universe"
		);
		assert!(
			tuple.arity() == 1 && tuple.len() == 1,
			"the bound of integer {value} must be a singleton unary tuple set"
		);
		let _ = self.ints.insert(value, tuple);
	}

	/// Bound `relation` to contain no tuple outside `upper`, with an empty
	/// lower bound.
	pub fn bound_upper(&mut self, relation: &Relation, upper: TupleSet) {
		let lower = self.universe.none(relation.arity());
		self.bound(relation, lower, upper);
	}

	/// The exact bound of the integer `value`, if it is bound.
	pub fn int_bound(&self, value: IntVal) -> Option<&TupleSet> {
		self.ints.get(&value)
	}

	/// Iterate over the bound integers and their bounds in increasing order.
	pub fn ints(&self) -> impl Iterator<Item = (IntVal, &TupleSet)> + '_ {
		self.ints.iter().map(|(&i, ts)| (i, ts))
	}

	/// The lower bound of `relation`, if it is bound.
	pub fn lower(&self, relation: &Relation) -> Option<&TupleSet> {
		self.lowers.get(&relation.id())
	}

	/// Iterate over the bound relations in the order they were first bound.
	pub fn relations(&self) -> impl ExactSizeIterator<Item = &Relation> + '_ {
		self.order.iter()
	}

	/// The upper bound of `relation`, if it is bound.
	pub fn upper(&self, relation: &Relation) -> Option<&TupleSet> {
		self.uppers.get(&relation.id())
	}

	/// The universe over which the bounds range.
	pub fn universe(&self) -> &Universe {
		&self.universe
	}
}

impl Instance {
	/// Create an instance over the given universe with no relations assigned.
	pub(crate) fn new(universe: Universe) -> Self {
		Instance {
			universe,
			tuples: HashMap::new(),
			order: Vec::new(),
			ints: BTreeMap::new(),
		}
	}

	/// Assign `tuples` to `relation`, replacing any previous assignment.
	///
	/// Panics when the tuple set is not over this universe or does not match
	/// the arity of the relation.
	pub(crate) fn add(&mut self, relation: &Relation, tuples: TupleSet) {
		assert!(
			tuples.universe() == &self.universe,
			"tuples for `{relation}' must be over the instance universe"
		);
		assert_eq!(
			tuples.arity(),
			relation.arity(),
			"tuples for `{relation}' must match its arity"
		);
		if !self.tuples.contains_key(&relation.id()) {
			self.order.push(relation.clone());
		}
		let _ = self.tuples.insert(relation.id(), tuples);
	}

	/// Record the exact bound of the integer `value`.
	pub(crate) fn add_int(&mut self, value: IntVal, tuple: TupleSet) {
		let _ = self.ints.insert(value, tuple);
	}

	/// Iterate over the bound integers and their atoms in increasing order.
	pub fn ints(&self) -> impl Iterator<Item = (IntVal, &TupleSet)> + '_ {
		self.ints.iter().map(|(&i, ts)| (i, ts))
	}

	/// Iterate over the assigned relations in insertion order.
	pub fn relations(&self) -> impl ExactSizeIterator<Item = &Relation> + '_ {
		self.order.iter()
	}

	/// The tuples assigned to `relation`, if any.
	pub fn tuples(&self, relation: &Relation) -> Option<&TupleSet> {
		self.tuples.get(&relation.id())
	}

	/// The universe over which the instance ranges.
	pub fn universe(&self) -> &Universe {
		&self.universe
	}
}

impl Display for Instance {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}",
			self.order
				.iter()
				.map(|r| format!("{r}={}", &self.tuples[&r.id()]))
				.format(", ")
		)
	}
}

#[cfg(test)]
mod tests {
	use crate::{
		ast::AstPool,
		instance::{bounds::Bounds, Universe},
	};

	#[test]
	fn test_bound_order_and_lookup() {
		let mut ast = AstPool::new();
		let u = Universe::new(["a", "b"]);
		let r = ast.relation("r", 1);
		let s = ast.relation("s", 2);

		let mut b = Bounds::new(u.clone());
		b.bound_upper(&s, u.all(2));
		b.bound_exactly(&r, u.tuples(1, [["a"]]));

		let names: Vec<_> = b.relations().map(|r| r.name().to_owned()).collect();
		assert_eq!(names, ["s", "r"]);
		assert_eq!(b.lower(&r), b.upper(&r));
		assert!(b.lower(&s).unwrap().is_empty());
	}

	#[test]
	fn test_int_bounds() {
		let mut b = Bounds::new(Universe::new(["0", "1"]));
		let u = b.universe().clone();
		b.bound_int(0, u.tuples(1, [["0"]]));
		b.bound_int(1, u.tuples(1, [["1"]]));
		assert_eq!(b.ints().count(), 2);
		assert!(b.int_bound(1).unwrap().contains(&u.tuple(["1"])));
		assert!(b.int_bound(2).is_none());
	}

	#[test]
	#[should_panic(expected = "must be contained in its upper bound")]
	fn test_bound_containment_violation() {
		let mut ast = AstPool::new();
		let u = Universe::new(["a", "b"]);
		let r = ast.relation("r", 1);
		let mut b = Bounds::new(u.clone());
		b.bound(&r, u.all(1), u.tuples(1, [["a"]]));
	}

	#[test]
	#[should_panic(expected = "must match its arity")]
	fn test_bound_arity_violation() {
		let mut ast = AstPool::new();
		let u = Universe::new(["a", "b"]);
		let r = ast.relation("r", 2);
		let mut b = Bounds::new(u.clone());
		b.bound_upper(&r, u.all(1));
	}

	#[test]
	#[should_panic(expected = "over the bounding universe")]
	fn test_bound_universe_violation() {
		let mut ast = AstPool::new();
		let u = Universe::new(["a", "b"]);
		let v = Universe::new(["a", "b"]);
		let r = ast.relation("r", 1);
		let mut b = Bounds::new(u);
		b.bound_upper(&r, v.all(1));
	}
}
