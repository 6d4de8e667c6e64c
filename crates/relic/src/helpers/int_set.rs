//! An ordered set of machine integers with merge-based set algebra.

use itertools::{EitherOrBoth, Itertools};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
/// An ordered set of `usize` values backed by a sorted vector.
///
/// The set is optimized for the access pattern of tuple sets and Boolean
/// matrices: bulk construction, ordered iteration, and merge-based set
/// algebra. Membership tests are `O(log n)`; insertion and removal shift the
/// tail of the vector.
pub(crate) struct IntSet {
	/// The elements of the set, in strictly increasing order.
	items: Vec<usize>,
}

impl IntSet {
	/// Create an empty set.
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Whether `value` is an element of the set.
	pub(crate) fn contains(&self, value: usize) -> bool {
		self.items.binary_search(&value).is_ok()
	}

	/// Compute the set of elements in `self` but not in `other`.
	pub(crate) fn difference(&self, other: &IntSet) -> IntSet {
		IntSet {
			items: self
				.items
				.iter()
				.merge_join_by(other.items.iter(), |a: &&usize, b: &&usize| usize::cmp(a, b))
				.filter_map(|pair| match pair {
					EitherOrBoth::Left(&x) => Some(x),
					_ => None,
				})
				.collect(),
		}
	}

	/// Add `value` to the set, returning whether the set changed.
	pub(crate) fn insert(&mut self, value: usize) -> bool {
		match self.items.binary_search(&value) {
			Ok(_) => false,
			Err(at) => {
				self.items.insert(at, value);
				true
			},
		}
	}

	/// Compute the set of elements present in both `self` and `other`.
	pub(crate) fn intersection(&self, other: &IntSet) -> IntSet {
		IntSet {
			items: self
				.items
				.iter()
				.merge_join_by(other.items.iter(), |a: &&usize, b: &&usize| usize::cmp(a, b))
				.filter_map(|pair| match pair {
					EitherOrBoth::Both(&x, _) => Some(x),
					_ => None,
				})
				.collect(),
		}
	}

	/// Whether the set has no elements.
	pub(crate) fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Whether every element of `self` is an element of `other`.
	pub(crate) fn is_subset(&self, other: &IntSet) -> bool {
		self.items
			.iter()
			.merge_join_by(other.items.iter(), |a: &&usize, b: &&usize| usize::cmp(a, b))
			.all(|pair| !matches!(pair, EitherOrBoth::Left(_)))
	}

	/// Iterate over the elements of the set in increasing order.
	pub(crate) fn iter(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
		self.items.iter().copied()
	}

	/// The number of elements in the set.
	pub(crate) fn len(&self) -> usize {
		self.items.len()
	}

	/// Compute the set of elements present in `self`, `other`, or both.
	pub(crate) fn union(&self, other: &IntSet) -> IntSet {
		IntSet {
			items: self
				.items
				.iter()
				.merge_join_by(other.items.iter(), |a: &&usize, b: &&usize| usize::cmp(a, b))
				.map(|pair| match pair {
					EitherOrBoth::Left(&x)
					| EitherOrBoth::Right(&x)
					| EitherOrBoth::Both(&x, _) => x,
				})
				.collect(),
		}
	}
}

impl FromIterator<usize> for IntSet {
	fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
		let mut items: Vec<usize> = iter.into_iter().collect();
		items.sort_unstable();
		items.dedup();
		IntSet { items }
	}
}

#[cfg(test)]
mod tests {
	use crate::helpers::int_set::IntSet;

	#[test]
	fn test_int_set_algebra() {
		let a: IntSet = [5, 1, 3, 1].into_iter().collect();
		let b: IntSet = [2, 3, 4].into_iter().collect();

		assert_eq!(a.len(), 3);
		assert_eq!(a.union(&b).iter().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
		assert_eq!(a.intersection(&b).iter().collect::<Vec<_>>(), vec![3]);
		assert_eq!(a.difference(&b).iter().collect::<Vec<_>>(), vec![1, 5]);
		assert!(a.intersection(&b).is_subset(&a));
		assert!(!a.is_subset(&b));
	}

	#[test]
	fn test_int_set_mutation() {
		let mut s = IntSet::new();
		assert!(s.is_empty());
		assert!(s.insert(7));
		assert!(s.insert(2));
		assert!(!s.insert(7));
		assert!(s.contains(2));
		assert_eq!(s.iter().collect::<Vec<_>>(), vec![2, 7]);
	}
}
