//! Module containing the Boolean circuit layer: an interned DAG of
//! variables, AND/OR multi-gates, and ITE gates, with constant folding and
//! subsumption applied at construction time.
//!
//! Values are identified by integer labels. The constants use the extreme
//! labels, variables are labeled `1..=n`, gates are labeled above the last
//! variable in creation order, and negation wraps a value by flipping the
//! sign of its label. A gate's label therefore always has a greater absolute
//! value than the labels of its inputs, which the CNF translation relies on.

pub(crate) mod int;
pub(crate) mod matrix;

use std::{
	collections::{BTreeSet, HashMap},
	ops::Not,
};

#[derive(Clone, Debug)]
/// An accumulator for the inputs of a many-input AND or OR gate.
///
/// Inputs are deduplicated and kept in label order; adding the complement of
/// an existing input short-circuits the accumulator to the dominating
/// constant of the operator.
pub(crate) struct BoolAccumulator {
	/// The operator of the accumulated gate.
	op: MultiOp,
	/// The labels of the accumulated inputs.
	inputs: BTreeSet<i32>,
	/// Whether the accumulator has short-circuited to the dominating
	/// constant.
	saturated: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// A Boolean value owned by a [`CircuitFactory`]: a constant, a variable, a
/// gate, or the negation of one of these.
pub(crate) struct BoolValue(i32);

#[derive(Clone, Debug)]
/// The factory that owns and interns the gates of one translation.
pub(crate) struct CircuitFactory {
	/// The number of variables of the circuit, labeled `1..=num_vars`.
	num_vars: usize,
	/// The gates of the circuit; the gate at position `i` has label
	/// `num_vars + 1 + i`.
	gates: Vec<Gate>,
	/// The interning table from canonical gate shape to existing gate.
	interned: HashMap<Gate, BoolValue>,
	/// The depth to which gate inputs are inspected for subsumption;
	/// absorption rules apply from depth two upward.
	sharing: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// The shape of a gate, used both as storage and as interning key.
pub(crate) enum Gate {
	/// A many-input conjunction; inputs are sorted by label.
	And(Vec<BoolValue>),
	/// An if-then-else choice; the condition is always a positive label.
	Ite(BoolValue, BoolValue, BoolValue),
	/// A many-input disjunction; inputs are sorted by label.
	Or(Vec<BoolValue>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The operator of a many-input gate.
enum MultiOp {
	/// Conjunction.
	And,
	/// Disjunction.
	Or,
}

impl BoolAccumulator {
	/// Create an accumulator for a many-input conjunction.
	pub(crate) fn and() -> Self {
		BoolAccumulator {
			op: MultiOp::And,
			inputs: BTreeSet::new(),
			saturated: false,
		}
	}

	/// Create an accumulator for a many-input disjunction.
	pub(crate) fn or() -> Self {
		BoolAccumulator {
			op: MultiOp::Or,
			inputs: BTreeSet::new(),
			saturated: false,
		}
	}

	/// Add an input to the accumulated gate.
	pub(crate) fn add(&mut self, value: BoolValue) {
		if self.saturated {
			return;
		}
		let (identity, zero) = match self.op {
			MultiOp::And => (BoolValue::TRUE, BoolValue::FALSE),
			MultiOp::Or => (BoolValue::FALSE, BoolValue::TRUE),
		};
		if value == identity {
			return;
		}
		if value == zero || self.inputs.contains(&(-value.0)) {
			self.saturated = true;
			return;
		}
		let _ = self.inputs.insert(value.0);
	}
}

impl BoolValue {
	/// The constant false value.
	pub(crate) const FALSE: BoolValue = BoolValue(-i32::MAX);
	/// The constant true value.
	pub(crate) const TRUE: BoolValue = BoolValue(i32::MAX);

	/// Whether the value is one of the constants.
	pub(crate) fn is_constant(self) -> bool {
		self == BoolValue::TRUE || self == BoolValue::FALSE
	}

	/// The label of the value.
	pub(crate) fn label(self) -> i32 {
		self.0
	}

	/// The variable with the given label.
	pub(crate) fn variable(label: usize) -> BoolValue {
		assert!(label >= 1, "variables are labeled from one");
		BoolValue(i32::try_from(label).expect("variable label out of range"))
	}
}

impl Not for BoolValue {
	type Output = BoolValue;

	fn not(self) -> Self::Output {
		BoolValue(-self.0)
	}
}

impl CircuitFactory {
	/// Create a factory over `num_vars` variables.
	///
	/// Subsumption checks beyond constant folding are enabled when `sharing`
	/// is at least two.
	pub(crate) fn new(num_vars: usize, sharing: u32) -> Self {
		assert!(
			i32::try_from(num_vars).is_ok(),
			"variable count out of range"
		);
		CircuitFactory {
			num_vars,
			gates: Vec::new(),
			interned: HashMap::new(),
			sharing,
		}
	}

	/// Finish an accumulator into a value: the identity constant when empty,
	/// the single input when unary, and an interned multi-gate otherwise.
	pub(crate) fn accumulate(&mut self, acc: BoolAccumulator) -> BoolValue {
		let (identity, zero) = match acc.op {
			MultiOp::And => (BoolValue::TRUE, BoolValue::FALSE),
			MultiOp::Or => (BoolValue::FALSE, BoolValue::TRUE),
		};
		if acc.saturated {
			return zero;
		}
		match acc.inputs.len() {
			0 => identity,
			1 => BoolValue(*acc.inputs.iter().next().expect("len is one")),
			_ => {
				let inputs: Vec<BoolValue> = acc.inputs.iter().map(|&l| BoolValue(l)).collect();
				let gate = match acc.op {
					MultiOp::And => Gate::And(inputs),
					MultiOp::Or => Gate::Or(inputs),
				};
				self.intern(gate)
			},
		}
	}

	/// Create the conjunction of two values.
	pub(crate) fn and(&mut self, a: BoolValue, b: BoolValue) -> BoolValue {
		if a == BoolValue::FALSE || b == BoolValue::FALSE || a == !b {
			return BoolValue::FALSE;
		}
		if a == BoolValue::TRUE || a == b {
			return b;
		}
		if b == BoolValue::TRUE {
			return a;
		}
		if self.sharing >= 2 {
			if let Some(v) = self.absorb_and(a, b).or_else(|| self.absorb_and(b, a)) {
				return v;
			}
		}
		let mut inputs = vec![a, b];
		inputs.sort_unstable();
		self.intern(Gate::And(inputs))
	}

	/// Iterate over the gates of the circuit in ascending label order.
	pub(crate) fn gates(&self) -> impl Iterator<Item = (i32, &Gate)> + '_ {
		let first = self.num_vars as i32 + 1;
		self.gates.iter().enumerate().map(move |(i, g)| (first + i as i32, g))
	}

	/// The gate with the given positive label, or `None` when the label
	/// names a variable.
	pub(crate) fn gate(&self, label: i32) -> Option<&Gate> {
		assert!(label > 0 && !BoolValue(label).is_constant(), "not a gate label");
		let first = self.num_vars as i32 + 1;
		if label < first {
			None
		} else {
			Some(&self.gates[(label - first) as usize])
		}
	}

	/// Create the equivalence of two values.
	pub(crate) fn iff(&mut self, a: BoolValue, b: BoolValue) -> BoolValue {
		self.ite(a, b, !b)
	}

	/// Create the implication of two values.
	pub(crate) fn implies(&mut self, a: BoolValue, b: BoolValue) -> BoolValue {
		self.or(!a, b)
	}

	/// Create the choice `if condition then t else e`.
	pub(crate) fn ite(&mut self, condition: BoolValue, t: BoolValue, e: BoolValue) -> BoolValue {
		if condition == BoolValue::TRUE || t == e {
			return t;
		}
		if condition == BoolValue::FALSE {
			return e;
		}
		if t == BoolValue::TRUE || t == condition {
			return self.or(condition, e);
		}
		if t == BoolValue::FALSE || t == !condition {
			let nc = !condition;
			return self.and(nc, e);
		}
		if e == BoolValue::TRUE || e == !condition {
			let nc = !condition;
			return self.or(nc, t);
		}
		if e == BoolValue::FALSE || e == condition {
			return self.and(condition, t);
		}
		if condition.label() < 0 {
			return self.ite(!condition, e, t);
		}
		self.intern(Gate::Ite(condition, t, e))
	}

	/// The largest label of the circuit.
	pub(crate) fn max_label(&self) -> i32 {
		(self.num_vars + self.gates.len()) as i32
	}

	/// The number of variables of the circuit.
	pub(crate) fn num_variables(&self) -> usize {
		self.num_vars
	}

	/// Create the disjunction of two values.
	pub(crate) fn or(&mut self, a: BoolValue, b: BoolValue) -> BoolValue {
		if a == BoolValue::TRUE || b == BoolValue::TRUE || a == !b {
			return BoolValue::TRUE;
		}
		if a == BoolValue::FALSE || a == b {
			return b;
		}
		if b == BoolValue::FALSE {
			return a;
		}
		if self.sharing >= 2 {
			if let Some(v) = self.absorb_or(a, b).or_else(|| self.absorb_or(b, a)) {
				return v;
			}
		}
		let mut inputs = vec![a, b];
		inputs.sort_unstable();
		self.intern(Gate::Or(inputs))
	}

	/// The variable with the given label.
	pub(crate) fn variable(&self, label: usize) -> BoolValue {
		assert!(
			label >= 1 && label <= self.num_vars,
			"variable label out of range"
		);
		BoolValue::variable(label)
	}

	/// Create the exclusive disjunction of two values.
	pub(crate) fn xor(&mut self, a: BoolValue, b: BoolValue) -> BoolValue {
		let nb = !b;
		self.ite(a, nb, b)
	}

	/// The absorption rules for `and(a, b)` that inspect the direct inputs
	/// of `b`.
	fn absorb_and(&self, a: BoolValue, b: BoolValue) -> Option<BoolValue> {
		if b.label() <= 0 {
			return None;
		}
		match self.gate(b.label()) {
			Some(Gate::And(inputs)) if inputs.binary_search(&a).is_ok() => Some(b),
			Some(Gate::And(inputs)) if inputs.binary_search(&!a).is_ok() => {
				Some(BoolValue::FALSE)
			},
			Some(Gate::Or(inputs)) if inputs.binary_search(&a).is_ok() => Some(a),
			_ => None,
		}
	}

	/// The absorption rules for `or(a, b)` that inspect the direct inputs
	/// of `b`.
	fn absorb_or(&self, a: BoolValue, b: BoolValue) -> Option<BoolValue> {
		if b.label() <= 0 {
			return None;
		}
		match self.gate(b.label()) {
			Some(Gate::Or(inputs)) if inputs.binary_search(&a).is_ok() => Some(b),
			Some(Gate::Or(inputs)) if inputs.binary_search(&!a).is_ok() => Some(BoolValue::TRUE),
			Some(Gate::And(inputs)) if inputs.binary_search(&a).is_ok() => Some(a),
			_ => None,
		}
	}

	/// Look up or create the gate with the given canonical shape.
	fn intern(&mut self, gate: Gate) -> BoolValue {
		if let Some(&v) = self.interned.get(&gate) {
			return v;
		}
		self.gates.push(gate.clone());
		let label = (self.num_vars + self.gates.len()) as i32;
		assert!(
			!BoolValue(label).is_constant(),
			"circuit label space exhausted"
		);
		let value = BoolValue(label);
		let _ = self.interned.insert(gate, value);
		value
	}
}

#[cfg(test)]
mod tests {
	use crate::circuit::{BoolAccumulator, BoolValue, CircuitFactory};

	#[test]
	fn test_constant_folding() {
		let mut f = CircuitFactory::new(2, 3);
		let a = f.variable(1);
		let b = f.variable(2);

		assert_eq!(f.and(a, BoolValue::TRUE), a);
		assert_eq!(f.and(a, BoolValue::FALSE), BoolValue::FALSE);
		assert_eq!(f.and(a, !a), BoolValue::FALSE);
		assert_eq!(f.or(a, !a), BoolValue::TRUE);
		assert_eq!(f.or(a, a), a);
		assert_eq!(f.ite(BoolValue::TRUE, a, b), a);
		assert_eq!(f.ite(BoolValue::FALSE, a, b), b);
		assert_eq!(f.iff(a, a), BoolValue::TRUE);
		assert_eq!(f.xor(a, a), BoolValue::FALSE);
		assert_eq!(f.implies(BoolValue::FALSE, b), BoolValue::TRUE);
	}

	#[test]
	fn test_interning() {
		let mut f = CircuitFactory::new(2, 3);
		let a = f.variable(1);
		let b = f.variable(2);

		let g1 = f.and(a, b);
		let g2 = f.and(b, a);
		assert_eq!(g1, g2);
		assert!(g1.label() > 2);

		let g3 = f.or(a, b);
		assert_ne!(g1, g3);
		assert_eq!(f.max_label(), 4);
	}

	#[test]
	fn test_absorption() {
		let mut f = CircuitFactory::new(2, 3);
		let a = f.variable(1);
		let b = f.variable(2);

		let ab = f.or(a, b);
		// a ∧ (a ∨ b) = a
		assert_eq!(f.and(a, ab), a);
		// a ∨ (a ∨ b) = a ∨ b
		assert_eq!(f.or(a, ab), ab);
		// ¬a ∨ (a ∨ b) = true
		assert_eq!(f.or(!a, ab), BoolValue::TRUE);
		let and_ab = f.and(a, b);
		// ¬a ∧ (a ∧ b) = false
		assert_eq!(f.and(!a, and_ab), BoolValue::FALSE);
	}

	#[test]
	fn test_accumulator() {
		let mut f = CircuitFactory::new(3, 3);
		let a = f.variable(1);
		let b = f.variable(2);

		let mut acc = BoolAccumulator::or();
		acc.add(BoolValue::FALSE);
		assert_eq!(f.accumulate(acc), BoolValue::FALSE);

		let mut acc = BoolAccumulator::or();
		acc.add(a);
		acc.add(a);
		assert_eq!(f.accumulate(acc), a);

		let mut acc = BoolAccumulator::or();
		acc.add(a);
		acc.add(!a);
		assert_eq!(f.accumulate(acc), BoolValue::TRUE);

		let mut acc = BoolAccumulator::and();
		acc.add(a);
		acc.add(b);
		let g = f.accumulate(acc);
		assert_eq!(g, f.and(a, b));
	}
}
