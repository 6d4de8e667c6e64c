//! A sparse symbolic matrix of Boolean values indexed by row-major tuple
//! index, supporting the relational algebra of the translation.
//!
//! Absent entries are implicitly the constant false value, and stored
//! entries are never constant false. All operations are defined over
//! matrices of the same universe size; the binary set operations
//! additionally require equal arity.

use std::collections::BTreeMap;

use itertools::{EitherOrBoth, Itertools};

use crate::{
	ast::Multiplicity,
	circuit::{BoolAccumulator, BoolValue, CircuitFactory},
	helpers::checked_pow,
};

#[derive(Clone, Debug)]
/// A sparse matrix of Boolean values over the tuples of a fixed arity.
pub(crate) struct BooleanMatrix {
	/// The arity of the indexed tuples.
	arity: usize,
	/// The number of atoms of the universe.
	size: usize,
	/// The number of indexable tuples, `size^arity`.
	capacity: usize,
	/// The non-false entries of the matrix.
	cells: BTreeMap<usize, BoolValue>,
}

impl BooleanMatrix {
	/// Create an all-false matrix of the given arity over a universe of
	/// `size` atoms.
	pub(crate) fn new(arity: usize, size: usize) -> Self {
		assert!(arity >= 1, "matrix arity must be at least one");
		BooleanMatrix {
			arity,
			size,
			capacity: checked_pow(size, arity),
			cells: BTreeMap::new(),
		}
	}

	/// Create the binary identity matrix over a universe of `size` atoms.
	pub(crate) fn identity(size: usize) -> Self {
		let mut m = BooleanMatrix::new(2, size);
		for a in 0..size {
			m.set(a * size + a, BoolValue::TRUE);
		}
		m
	}

	/// Compute the pointwise conjunction of two matrices.
	pub(crate) fn and(&self, other: &BooleanMatrix, f: &mut CircuitFactory) -> BooleanMatrix {
		self.check_compatible(other);
		let mut out = BooleanMatrix::new(self.arity, self.size);
		for pair in self.merged(other) {
			if let EitherOrBoth::Both((i, a), (_, b)) = pair {
				out.set(i, f.and(a, b));
			}
		}
		out
	}

	/// The arity of the indexed tuples.
	pub(crate) fn arity(&self) -> usize {
		self.arity
	}

	/// Compute the pointwise choice between two matrices under a condition.
	pub(crate) fn choice(
		&self,
		condition: BoolValue,
		other: &BooleanMatrix,
		f: &mut CircuitFactory,
	) -> BooleanMatrix {
		self.check_compatible(other);
		let mut out = BooleanMatrix::new(self.arity, self.size);
		for pair in self.merged(other) {
			match pair {
				EitherOrBoth::Left((i, t)) => out.set(i, f.and(condition, t)),
				EitherOrBoth::Right((i, e)) => {
					let nc = !condition;
					out.set(i, f.and(nc, e));
				},
				EitherOrBoth::Both((i, t), (_, e)) => out.set(i, f.ite(condition, t, e)),
			}
		}
		out
	}

	/// Compute the transitive closure of a binary matrix by square-and-or
	/// iteration; `log2(size)` rounds saturate reachability.
	pub(crate) fn closure(&self, f: &mut CircuitFactory) -> BooleanMatrix {
		assert_eq!(self.arity, 2, "closure requires a binary matrix");
		let mut ret = self.clone();
		let mut reach = 1;
		while reach < self.size {
			let sq = ret.dot(&ret, f);
			ret = ret.or(&sq, f);
			reach *= 2;
		}
		ret
	}

	/// Compute the cross product of two matrices.
	pub(crate) fn cross(&self, other: &BooleanMatrix, f: &mut CircuitFactory) -> BooleanMatrix {
		assert_eq!(self.size, other.size, "matrices must share a universe");
		let mut out = BooleanMatrix::new(self.arity + other.arity, self.size);
		for (i, a) in self.iter() {
			for (j, b) in other.iter() {
				let v = f.and(a, b);
				out.set(i * other.capacity + j, v);
			}
		}
		out
	}

	/// The tuple indices of the non-false entries.
	pub(crate) fn dense_indices(&self) -> impl Iterator<Item = usize> + '_ {
		self.cells.keys().copied()
	}

	/// Compute the pointwise difference `self ∧ ¬other` of two matrices.
	pub(crate) fn difference(&self, other: &BooleanMatrix, f: &mut CircuitFactory) -> BooleanMatrix {
		self.check_compatible(other);
		let mut out = BooleanMatrix::new(self.arity, self.size);
		for pair in self.merged(other) {
			match pair {
				EitherOrBoth::Left((i, a)) => out.set(i, a),
				EitherOrBoth::Both((i, a), (_, b)) => {
					let nb = !b;
					out.set(i, f.and(a, nb));
				},
				EitherOrBoth::Right(_) => {},
			}
		}
		out
	}

	/// Compute the relational join of two matrices, realized as matrix
	/// multiplication over the Boolean semiring.
	pub(crate) fn dot(&self, other: &BooleanMatrix, f: &mut CircuitFactory) -> BooleanMatrix {
		assert_eq!(self.size, other.size, "matrices must share a universe");
		assert!(
			self.arity + other.arity >= 3,
			"join requires a result arity of at least one"
		);
		let stride = checked_pow(self.size, other.arity - 1);
		let mut sums: BTreeMap<usize, BoolAccumulator> = BTreeMap::new();
		for (i, a) in self.iter() {
			let (row, k) = (i / self.size, i % self.size);
			for (j, b) in other.cells.range(k * stride..(k + 1) * stride) {
				let v = f.and(a, *b);
				if v == BoolValue::FALSE {
					continue;
				}
				sums.entry(row * stride + (j % stride))
					.or_insert_with(BoolAccumulator::or)
					.add(v);
			}
		}
		let mut out = BooleanMatrix::new(self.arity + other.arity - 2, self.size);
		for (i, acc) in sums {
			let v = f.accumulate(acc);
			out.set(i, v);
		}
		out
	}

	/// Compute the formula stating that two matrices hold the same tuples.
	pub(crate) fn eq_to(&self, other: &BooleanMatrix, f: &mut CircuitFactory) -> BoolValue {
		self.check_compatible(other);
		let mut acc = BoolAccumulator::and();
		for pair in self.merged(other) {
			match pair {
				EitherOrBoth::Left((_, a)) => acc.add(!a),
				EitherOrBoth::Right((_, b)) => acc.add(!b),
				EitherOrBoth::Both((_, a), (_, b)) => acc.add(f.iff(a, b)),
			}
		}
		f.accumulate(acc)
	}

	/// The value at the given tuple index.
	pub(crate) fn get(&self, index: usize) -> BoolValue {
		assert!(index < self.capacity, "tuple index out of range");
		self.cells.get(&index).copied().unwrap_or(BoolValue::FALSE)
	}

	/// Iterate over the non-false entries in ascending index order.
	pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, BoolValue)> + '_ {
		self.cells.iter().map(|(&i, &v)| (i, v))
	}

	/// Compute the formula testing the given multiplicity of the matrix.
	///
	/// `some` and `no` are a disjunction over the entries and its negation;
	/// `one` and `lone` are encoded with a linear ladder of partial
	/// disjunctions.
	pub(crate) fn multiplicity(&self, m: Multiplicity, f: &mut CircuitFactory) -> BoolValue {
		match m {
			Multiplicity::Some | Multiplicity::No => {
				let mut acc = BoolAccumulator::or();
				for (_, v) in self.iter() {
					acc.add(v);
				}
				let some = f.accumulate(acc);
				if m == Multiplicity::Some {
					some
				} else {
					!some
				}
			},
			Multiplicity::One | Multiplicity::Lone => {
				let mut seen = BoolValue::FALSE;
				let mut pairwise = BoolAccumulator::and();
				for (_, v) in self.iter() {
					let both = f.and(v, seen);
					pairwise.add(!both);
					seen = f.or(seen, v);
				}
				let lone = f.accumulate(pairwise);
				if m == Multiplicity::Lone {
					lone
				} else {
					f.and(lone, seen)
				}
			},
			Multiplicity::Set => unreachable!("`set' is not a multiplicity test"),
		}
	}

	/// Compute the pointwise disjunction of two matrices.
	pub(crate) fn or(&self, other: &BooleanMatrix, f: &mut CircuitFactory) -> BooleanMatrix {
		self.check_compatible(other);
		let mut out = BooleanMatrix::new(self.arity, self.size);
		for pair in self.merged(other) {
			match pair {
				EitherOrBoth::Left((i, a)) => out.set(i, a),
				EitherOrBoth::Right((i, b)) => out.set(i, b),
				EitherOrBoth::Both((i, a), (_, b)) => out.set(i, f.or(a, b)),
			}
		}
		out
	}

	/// Compute the relational override `self ++ other`: the entries of
	/// `other`, plus the entries of `self` whose row holds no tuple of
	/// `other`.
	pub(crate) fn override_with(
		&self,
		other: &BooleanMatrix,
		f: &mut CircuitFactory,
	) -> BooleanMatrix {
		self.check_compatible(other);
		let stride = self.capacity / self.size;
		let mut rows: BTreeMap<usize, BoolAccumulator> = BTreeMap::new();
		for (i, b) in other.iter() {
			rows.entry(i / stride).or_insert_with(BoolAccumulator::or).add(b);
		}
		let row_masks: BTreeMap<usize, BoolValue> = rows
			.into_iter()
			.map(|(r, acc)| (r, f.accumulate(acc)))
			.collect();
		let mut out = other.clone();
		for (i, a) in self.iter() {
			let mask = row_masks.get(&(i / stride)).copied().unwrap_or(BoolValue::FALSE);
			let nm = !mask;
			let kept = f.and(a, nm);
			if kept == BoolValue::FALSE {
				continue;
			}
			let prev = out.get(i);
			out.set(i, f.or(prev, kept));
		}
		out
	}

	/// Set the value at the given tuple index; false values clear the entry.
	pub(crate) fn set(&mut self, index: usize, value: BoolValue) {
		assert!(index < self.capacity, "tuple index out of range");
		if value == BoolValue::FALSE {
			let _ = self.cells.remove(&index);
		} else {
			let _ = self.cells.insert(index, value);
		}
	}

	/// Compute the formula stating that every tuple of `self` is a tuple of
	/// `other`.
	pub(crate) fn subset_of(&self, other: &BooleanMatrix, f: &mut CircuitFactory) -> BoolValue {
		self.check_compatible(other);
		let mut acc = BoolAccumulator::and();
		for (i, a) in self.iter() {
			let b = other.get(i);
			acc.add(f.implies(a, b));
		}
		f.accumulate(acc)
	}

	/// Compute the transpose of a binary matrix.
	pub(crate) fn transpose(&self) -> BooleanMatrix {
		assert_eq!(self.arity, 2, "transposition requires a binary matrix");
		let mut out = BooleanMatrix::new(2, self.size);
		for (i, v) in self.iter() {
			out.set((i % self.size) * self.size + i / self.size, v);
		}
		out
	}

	/// Panic unless `other` has the same arity and universe size as `self`.
	fn check_compatible(&self, other: &BooleanMatrix) {
		assert_eq!(self.size, other.size, "matrices must share a universe");
		assert_eq!(self.arity, other.arity, "matrices must have the same arity");
	}

	/// Merge the entries of two matrices in ascending index order.
	fn merged<'a>(
		&'a self,
		other: &'a BooleanMatrix,
	) -> impl Iterator<Item = EitherOrBoth<(usize, BoolValue), (usize, BoolValue)>> + 'a {
		self.iter()
			.merge_join_by(other.iter(), |(i, _), (j, _)| i.cmp(j))
	}
}

#[cfg(test)]
mod tests {
	use crate::{
		ast::Multiplicity,
		circuit::{matrix::BooleanMatrix, BoolValue, CircuitFactory},
	};

	/// A 2-atom universe matrix with true entries at the given indices.
	fn constant(arity: usize, indices: &[usize]) -> BooleanMatrix {
		let mut m = BooleanMatrix::new(arity, 2);
		for &i in indices {
			m.set(i, BoolValue::TRUE);
		}
		m
	}

	#[test]
	fn test_join_on_constants() {
		let mut f = CircuitFactory::new(0, 3);
		// s = {a}; r = {(a, b)}; s.r = {b}
		let s = constant(1, &[0]);
		let r = constant(2, &[1]);
		let j = s.dot(&r, &mut f);
		assert_eq!(j.arity(), 1);
		assert_eq!(j.get(1), BoolValue::TRUE);
		assert_eq!(j.get(0), BoolValue::FALSE);
	}

	#[test]
	fn test_transpose_and_identity() {
		let r = constant(2, &[1]); // {(a, b)}
		let t = r.transpose();
		assert_eq!(t.get(2), BoolValue::TRUE); // {(b, a)}
		assert_eq!(t.get(1), BoolValue::FALSE);

		let iden = BooleanMatrix::identity(2);
		assert_eq!(iden.get(0), BoolValue::TRUE);
		assert_eq!(iden.get(3), BoolValue::TRUE);
		assert_eq!(iden.get(1), BoolValue::FALSE);
	}

	#[test]
	fn test_closure_reaches_saturation() {
		let mut f = CircuitFactory::new(0, 3);
		// r = {(a, b), (b, a)}; ^r covers all four pairs.
		let r = constant(2, &[1, 2]);
		let c = r.closure(&mut f);
		for i in 0..4 {
			assert_eq!(c.get(i), BoolValue::TRUE);
		}
	}

	#[test]
	fn test_override_on_constants() {
		let mut f = CircuitFactory::new(0, 3);
		// a = {(a, a), (b, a)}; b = {(a, b)}; a ++ b = {(a, b), (b, a)}
		let a = constant(2, &[0, 2]);
		let b = constant(2, &[1]);
		let o = a.override_with(&b, &mut f);
		assert_eq!(o.get(1), BoolValue::TRUE);
		assert_eq!(o.get(2), BoolValue::TRUE);
		assert_eq!(o.get(0), BoolValue::FALSE);
	}

	#[test]
	fn test_multiplicity_on_constants() {
		let mut f = CircuitFactory::new(0, 3);
		let none = constant(1, &[]);
		let one = constant(1, &[1]);
		let two = constant(1, &[0, 1]);

		assert_eq!(none.multiplicity(Multiplicity::No, &mut f), BoolValue::TRUE);
		assert_eq!(none.multiplicity(Multiplicity::Lone, &mut f), BoolValue::TRUE);
		assert_eq!(one.multiplicity(Multiplicity::One, &mut f), BoolValue::TRUE);
		assert_eq!(one.multiplicity(Multiplicity::Some, &mut f), BoolValue::TRUE);
		assert_eq!(two.multiplicity(Multiplicity::One, &mut f), BoolValue::FALSE);
		assert_eq!(two.multiplicity(Multiplicity::Lone, &mut f), BoolValue::FALSE);
		assert_eq!(two.multiplicity(Multiplicity::Some, &mut f), BoolValue::TRUE);
	}

	#[test]
	fn test_comparisons_on_constants() {
		let mut f = CircuitFactory::new(0, 3);
		let s = constant(1, &[0]);
		let t = constant(1, &[0, 1]);
		assert_eq!(s.subset_of(&t, &mut f), BoolValue::TRUE);
		assert_eq!(t.subset_of(&s, &mut f), BoolValue::FALSE);
		assert_eq!(s.eq_to(&s.clone(), &mut f), BoolValue::TRUE);
		assert_eq!(s.eq_to(&t, &mut f), BoolValue::FALSE);
	}
}
