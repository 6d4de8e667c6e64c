//! Module containing the finite universe of discourse and the tuple sets
//! drawn from it.
//!
//! A [`Universe`] is an ordered sequence of distinct atoms. A tuple of arity
//! `n` over a universe of size `s` is represented as an integer in base `s`
//! whose digits are atom indices, with the first column of the tuple as the
//! most significant digit. A [`TupleSet`] is an ordered set of such indices
//! of a fixed arity.

pub mod bounds;

use std::{
	collections::HashMap,
	fmt::{self, Display, Formatter},
	rc::Rc,
};

use itertools::Itertools;

use crate::helpers::{checked_pow, int_set::IntSet};

#[derive(Clone, Debug, PartialEq, Eq)]
/// A tuple of atoms, represented as its index in the row-major enumeration
/// of all tuples of its arity.
pub struct Tuple {
	/// The universe from which the atoms of the tuple are drawn.
	universe: Universe,
	/// The number of atoms in the tuple.
	arity: usize,
	/// The base-`|universe|` index of the tuple.
	index: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// An ordered set of tuples of uniform arity over a single universe.
pub struct TupleSet {
	/// The universe from which the tuples are drawn.
	universe: Universe,
	/// The arity of every tuple in the set.
	arity: usize,
	/// The indices of the member tuples.
	indices: IntSet,
}

#[derive(Clone, Debug)]
/// A finite ordered sequence of distinct atoms.
///
/// Universes are cheap to clone and compare by identity: two universes are
/// equal exactly when they originate from the same [`Universe::new`] call.
pub struct Universe {
	/// The shared storage of the universe.
	inner: Rc<UniverseInner>,
}

#[derive(Debug)]
/// The storage shared by all clones of a [`Universe`].
struct UniverseInner {
	/// The atoms of the universe, in declaration order.
	atoms: Vec<String>,
	/// The inverse mapping from atom to its position in [`Self::atoms`].
	index: HashMap<String, usize>,
}

impl Tuple {
	/// The number of atoms in the tuple.
	pub fn arity(&self) -> usize {
		self.arity
	}

	/// The atom at position `pos` of the tuple.
	pub fn atom(&self, pos: usize) -> &str {
		self.universe.atom(self.atom_index(pos))
	}

	/// The universe index of the atom at position `pos` of the tuple.
	pub fn atom_index(&self, pos: usize) -> usize {
		assert!(pos < self.arity, "tuple position out of range");
		let size = self.universe.size();
		(self.index / checked_pow(size, self.arity - 1 - pos)) % size
	}

	/// The base-`|universe|` index of the tuple.
	pub fn index(&self) -> usize {
		self.index
	}

	/// Create the concatenation of `self` and `other`.
	pub fn product(&self, other: &Tuple) -> Tuple {
		assert!(
			self.universe == other.universe,
			"tuples must share a universe"
		);
		Tuple {
			universe: self.universe.clone(),
			arity: self.arity + other.arity,
			index: self.index * checked_pow(self.universe.size(), other.arity) + other.index,
		}
	}

	/// The universe from which the atoms of the tuple are drawn.
	pub fn universe(&self) -> &Universe {
		&self.universe
	}
}

impl Display for Tuple {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "[{}]", (0..self.arity).map(|i| self.atom(i)).format(", "))
	}
}

impl TupleSet {
	/// The arity of every tuple in the set.
	pub fn arity(&self) -> usize {
		self.arity
	}

	/// Whether `tuple` is a member of the set.
	pub fn contains(&self, tuple: &Tuple) -> bool {
		self.universe == tuple.universe
			&& self.arity == tuple.arity
			&& self.indices.contains(tuple.index)
	}

	/// Whether the set contains the tuple with the given index.
	pub(crate) fn contains_index(&self, index: usize) -> bool {
		self.indices.contains(index)
	}

	/// Compute the set of tuples in `self` but not in `other`.
	pub fn difference(&self, other: &TupleSet) -> TupleSet {
		self.check_compatible(other);
		TupleSet {
			universe: self.universe.clone(),
			arity: self.arity,
			indices: self.indices.difference(&other.indices),
		}
	}

	/// Add `tuple` to the set, returning whether the set changed.
	pub fn insert(&mut self, tuple: &Tuple) -> bool {
		assert!(
			self.universe == tuple.universe && self.arity == tuple.arity,
			"tuple is incompatible with the tuple set"
		);
		self.indices.insert(tuple.index)
	}

	/// Add the tuple with the given index to the set.
	pub(crate) fn insert_index(&mut self, index: usize) {
		assert!(
			index < self.universe.capacity(self.arity),
			"tuple index out of range"
		);
		let _ = self.indices.insert(index);
	}

	/// Compute the set of tuples present in both `self` and `other`.
	pub fn intersection(&self, other: &TupleSet) -> TupleSet {
		self.check_compatible(other);
		TupleSet {
			universe: self.universe.clone(),
			arity: self.arity,
			indices: self.indices.intersection(&other.indices),
		}
	}

	/// Iterate over the tuple indices of the set in increasing order.
	pub(crate) fn indices(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
		self.indices.iter()
	}

	/// Whether the set has no tuples.
	pub fn is_empty(&self) -> bool {
		self.indices.is_empty()
	}

	/// Whether every tuple of `self` is a tuple of `other`.
	pub fn is_subset(&self, other: &TupleSet) -> bool {
		self.check_compatible(other);
		self.indices.is_subset(&other.indices)
	}

	/// Iterate over the tuples of the set in increasing index order.
	pub fn iter(&self) -> impl ExactSizeIterator<Item = Tuple> + '_ {
		self.indices.iter().map(|index| Tuple {
			universe: self.universe.clone(),
			arity: self.arity,
			index,
		})
	}

	/// The number of tuples in the set.
	pub fn len(&self) -> usize {
		self.indices.len()
	}

	/// Compute the cross product of `self` and `other`.
	pub fn product(&self, other: &TupleSet) -> TupleSet {
		assert!(
			self.universe == other.universe,
			"tuple sets must share a universe"
		);
		let stride = self.universe.capacity(other.arity);
		let mut indices = IntSet::new();
		for a in self.indices.iter() {
			for b in other.indices.iter() {
				let _ = indices.insert(a * stride + b);
			}
		}
		TupleSet {
			universe: self.universe.clone(),
			arity: self.arity + other.arity,
			indices,
		}
	}

	/// Compute the set of tuples present in `self`, `other`, or both.
	pub fn union(&self, other: &TupleSet) -> TupleSet {
		self.check_compatible(other);
		TupleSet {
			universe: self.universe.clone(),
			arity: self.arity,
			indices: self.indices.union(&other.indices),
		}
	}

	/// The universe from which the tuples are drawn.
	pub fn universe(&self) -> &Universe {
		&self.universe
	}

	/// Panic unless `other` has the same universe and arity as `self`.
	fn check_compatible(&self, other: &TupleSet) {
		assert!(
			self.universe == other.universe,
			"tuple sets must share a universe"
		);
		assert_eq!(
			self.arity, other.arity,
			"tuple sets must have the same arity"
		);
	}
}

impl Display for TupleSet {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{{{}}}", self.iter().format(", "))
	}
}

impl Universe {
	/// Create a new universe from an ordered sequence of atoms.
	///
	/// Panics when the sequence is empty or contains a duplicate atom.
	pub fn new<I, S>(atoms: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let atoms: Vec<String> = atoms.into_iter().map(Into::into).collect();
		assert!(!atoms.is_empty(), "a universe must contain at least one atom");
		let mut index = HashMap::with_capacity(atoms.len());
		for (i, atom) in atoms.iter().enumerate() {
			let prev = index.insert(atom.clone(), i);
			assert!(prev.is_none(), "duplicate atom `{atom}' in universe");
		}
		Universe {
			inner: Rc::new(UniverseInner { atoms, index }),
		}
	}

	/// Create the tuple set containing every tuple of the given arity.
	pub fn all(&self, arity: usize) -> TupleSet {
		TupleSet {
			universe: self.clone(),
			arity,
			indices: (0..self.capacity(arity)).collect(),
		}
	}

	/// The atom at position `index` of the universe.
	pub fn atom(&self, index: usize) -> &str {
		&self.inner.atoms[index]
	}

	/// The number of tuples of the given arity over this universe.
	///
	/// Panics when the arity is zero or the capacity overflows.
	pub fn capacity(&self, arity: usize) -> usize {
		assert!(arity >= 1, "arity must be at least one");
		checked_pow(self.size(), arity)
	}

	/// The position of `atom` in the universe, if it is a member.
	pub fn index(&self, atom: &str) -> Option<usize> {
		self.inner.index.get(atom).copied()
	}

	/// Create the empty tuple set of the given arity.
	pub fn none(&self, arity: usize) -> TupleSet {
		assert!(arity >= 1, "arity must be at least one");
		TupleSet {
			universe: self.clone(),
			arity,
			indices: IntSet::new(),
		}
	}

	/// The number of atoms in the universe.
	pub fn size(&self) -> usize {
		self.inner.atoms.len()
	}

	/// Create the tuple consisting of the given atoms, in order.
	///
	/// Panics when the sequence is empty or contains an atom that is not a
	/// member of the universe.
	pub fn tuple<I, S>(&self, atoms: I) -> Tuple
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut arity = 0;
		let mut index = 0;
		for atom in atoms {
			let atom = atom.as_ref();
			let i = self
				.index(atom)
				.unwrap_or_else(|| panic!("atom `{atom}' is not in the universe"));
			index = index * self.size() + i;
			arity += 1;
		}
		assert!(arity >= 1, "a tuple must contain at least one atom");
		Tuple {
			universe: self.clone(),
			arity,
			index,
		}
	}

	/// Create a tuple set of the given arity from a sequence of atom rows.
	///
	/// Panics when a row does not contain exactly `arity` atoms.
	pub fn tuples<I, T, S>(&self, arity: usize, rows: I) -> TupleSet
	where
		I: IntoIterator<Item = T>,
		T: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut set = self.none(arity);
		for row in rows {
			let tuple = self.tuple(row);
			assert_eq!(tuple.arity(), arity, "tuple has the wrong arity");
			let _ = set.insert(&tuple);
		}
		set
	}
}

impl PartialEq for Universe {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}
}

impl Eq for Universe {}

#[cfg(test)]
mod tests {
	use crate::instance::Universe;

	#[test]
	fn test_tuple_indexing() {
		let u = Universe::new(["a", "b", "c"]);
		assert_eq!(u.size(), 3);
		assert_eq!(u.capacity(2), 9);

		let t = u.tuple(["b", "c"]);
		assert_eq!(t.index(), 5);
		assert_eq!(t.atom_index(0), 1);
		assert_eq!(t.atom_index(1), 2);
		assert_eq!(t.to_string(), "[b, c]");

		let p = t.product(&u.tuple(["a"]));
		assert_eq!(p.arity(), 3);
		assert_eq!(p.index(), t.index() * 3);
	}

	#[test]
	fn test_tuple_set_algebra() {
		let u = Universe::new(["a", "b", "c"]);
		let s = u.tuples(1, [["a"], ["b"]]);
		let t = u.tuples(1, [["b"], ["c"]]);

		assert_eq!(s.union(&t), u.tuples(1, [["a"], ["b"], ["c"]]));
		assert_eq!(s.intersection(&t), u.tuples(1, [["b"]]));
		assert_eq!(s.difference(&t), u.tuples(1, [["a"]]));
		assert!(s.intersection(&t).is_subset(&s));
		assert_eq!(s.product(&t).len(), 4);
		assert!(s.product(&t).contains(&u.tuple(["a", "c"])));
		assert_eq!(u.all(2).len(), 9);
		assert_eq!(s.to_string(), "{[a], [b]}");
	}

	#[test]
	fn test_universe_identity() {
		let u = Universe::new(["a", "b"]);
		let v = Universe::new(["a", "b"]);
		assert_eq!(u, u.clone());
		assert_ne!(u, v);
	}

	#[test]
	#[should_panic(expected = "duplicate atom")]
	fn test_universe_duplicate_atom() {
		let _ = Universe::new(["a", "a"]);
	}

	#[test]
	#[should_panic(expected = "same arity")]
	fn test_tuple_set_arity_mismatch() {
		let u = Universe::new(["a", "b"]);
		let _ = u.all(1).union(&u.all(2));
	}
}
