//! Two's-complement bit-blasted integers over a Boolean circuit.
//!
//! Every value is a little-endian vector of exactly `bitwidth` Boolean
//! values; arithmetic wraps modulo `2^bitwidth`. Division truncates towards
//! zero and the remainder takes the sign of the dividend; division by zero
//! yields an unspecified value. Shift amounts that are negative or at least
//! the bit width saturate the result.

use crate::{
	circuit::{BoolAccumulator, BoolValue, CircuitFactory},
	IntVal,
};

#[derive(Clone, Debug)]
/// A two's-complement integer represented by symbolic bits.
pub(crate) struct IntCircuit {
	/// The bits of the value, least significant first.
	bits: Vec<BoolValue>,
}

impl IntCircuit {
	/// Encode a constant, wrapping it to the given width.
	pub(crate) fn constant(value: IntVal, width: u32) -> Self {
		IntCircuit {
			bits: (0..width)
				.map(|i| {
					if (value >> i) & 1 == 1 {
						BoolValue::TRUE
					} else {
						BoolValue::FALSE
					}
				})
				.collect(),
		}
	}

	/// Create a value from raw bits.
	pub(crate) fn from_bits(bits: Vec<BoolValue>) -> Self {
		assert!(!bits.is_empty(), "an integer must have at least one bit");
		IntCircuit { bits }
	}

	/// The all-zero value of the given width.
	pub(crate) fn zero(width: u32) -> Self {
		IntCircuit {
			bits: vec![BoolValue::FALSE; width as usize],
		}
	}

	/// Compute the absolute value.
	pub(crate) fn abs(&self, f: &mut CircuitFactory) -> Self {
		let negated = self.negated(f);
		Self::choose(self.sign(), &negated, self, f)
	}

	/// Compute the pointwise conjunction of the bits of two values.
	pub(crate) fn bit_and(&self, other: &Self, f: &mut CircuitFactory) -> Self {
		self.pointwise(other, |f, a, b| f.and(a, b), f)
	}

	/// Compute the pointwise disjunction of the bits of two values.
	pub(crate) fn bit_or(&self, other: &Self, f: &mut CircuitFactory) -> Self {
		self.pointwise(other, |f, a, b| f.or(a, b), f)
	}

	/// Compute the pointwise exclusive disjunction of the bits of two
	/// values.
	pub(crate) fn bit_xor(&self, other: &Self, f: &mut CircuitFactory) -> Self {
		self.pointwise(other, |f, a, b| f.xor(a, b), f)
	}

	/// The bits of the value, least significant first.
	pub(crate) fn bits(&self) -> &[BoolValue] {
		&self.bits
	}

	/// Choose between two values of equal width under a condition.
	pub(crate) fn choose(
		condition: BoolValue,
		t: &Self,
		e: &Self,
		f: &mut CircuitFactory,
	) -> Self {
		assert_eq!(t.width(), e.width(), "widths must match");
		IntCircuit {
			bits: t
				.bits
				.iter()
				.zip(e.bits.iter())
				.map(|(&a, &b)| f.ite(condition, a, b))
				.collect(),
		}
	}

	/// Sum a sequence of membership bits into an integer of the given width.
	pub(crate) fn count<I: IntoIterator<Item = BoolValue>>(
		bits: I,
		width: u32,
		f: &mut CircuitFactory,
	) -> Self {
		let terms: Vec<IntCircuit> = bits
			.into_iter()
			.map(|b| {
				let mut unit = Self::zero(width);
				unit.bits[0] = b;
				unit
			})
			.collect();
		Self::sum_all(terms, width, f)
	}

	/// Compute the quotient of truncating division.
	pub(crate) fn div(&self, other: &Self, f: &mut CircuitFactory) -> Self {
		self.div_rem(other, f).0
	}

	/// Compute the formula stating that two values are equal.
	pub(crate) fn equals(&self, other: &Self, f: &mut CircuitFactory) -> BoolValue {
		assert_eq!(self.width(), other.width(), "widths must match");
		let mut acc = BoolAccumulator::and();
		for (&a, &b) in self.bits.iter().zip(other.bits.iter()) {
			let eq = f.iff(a, b);
			acc.add(eq);
		}
		f.accumulate(acc)
	}

	/// Compute the formula stating that `self > other`.
	pub(crate) fn gt(&self, other: &Self, f: &mut CircuitFactory) -> BoolValue {
		other.lt(self, f)
	}

	/// Compute the formula stating that `self >= other`.
	pub(crate) fn gte(&self, other: &Self, f: &mut CircuitFactory) -> BoolValue {
		!self.lt(other, f)
	}

	/// Compute the formula stating that `self < other`, signed.
	pub(crate) fn lt(&self, other: &Self, f: &mut CircuitFactory) -> BoolValue {
		assert_eq!(self.width(), other.width(), "widths must match");
		let w = self.width();
		let mut lt = BoolValue::FALSE;
		for i in 0..w {
			let (a, b) = (self.bits[i], other.bits[i]);
			// At the sign position the roles reverse: a set sign bit is the
			// smaller value.
			let wins = if i == w - 1 {
				let nb = !b;
				f.and(a, nb)
			} else {
				let na = !a;
				f.and(na, b)
			};
			let eq = f.iff(a, b);
			lt = f.ite(eq, lt, wins);
		}
		lt
	}

	/// Compute the formula stating that `self <= other`.
	pub(crate) fn lte(&self, other: &Self, f: &mut CircuitFactory) -> BoolValue {
		!other.lt(self, f)
	}

	/// Zero the value unless the condition holds.
	pub(crate) fn masked(&self, condition: BoolValue, f: &mut CircuitFactory) -> Self {
		IntCircuit {
			bits: self.bits.iter().map(|&b| f.and(condition, b)).collect(),
		}
	}

	/// Compute the wrapping difference of two values.
	pub(crate) fn minus(&self, other: &Self, f: &mut CircuitFactory) -> Self {
		assert_eq!(self.width(), other.width(), "widths must match");
		let nb: Vec<BoolValue> = other.bits.iter().map(|&b| !b).collect();
		IntCircuit {
			bits: add_slices(&self.bits, &nb, BoolValue::TRUE, f),
		}
	}

	/// Compute the wrapping negation of the value.
	pub(crate) fn negated(&self, f: &mut CircuitFactory) -> Self {
		Self::zero(self.width() as u32).minus(self, f)
	}

	/// Compute the wrapping sum of two values.
	pub(crate) fn plus(&self, other: &Self, f: &mut CircuitFactory) -> Self {
		assert_eq!(self.width(), other.width(), "widths must match");
		IntCircuit {
			bits: add_slices(&self.bits, &other.bits, BoolValue::FALSE, f),
		}
	}

	/// Compute the remainder of truncating division; it takes the sign of
	/// the dividend.
	pub(crate) fn rem(&self, other: &Self, f: &mut CircuitFactory) -> Self {
		self.div_rem(other, f).1
	}

	/// Compute the sign-extending right shift of the value.
	pub(crate) fn sha(&self, amount: &Self, f: &mut CircuitFactory) -> Self {
		let sign = self.sign();
		self.shift(amount, f, |bits, i, by, w| {
			if i + by < w {
				bits[i + by]
			} else {
				bits[w - 1]
			}
		})
		.saturate(amount, sign, f)
	}

	/// Compute the left shift of the value.
	pub(crate) fn shl(&self, amount: &Self, f: &mut CircuitFactory) -> Self {
		self.shift(amount, f, |bits, i, by, _| {
			if i >= by {
				bits[i - by]
			} else {
				BoolValue::FALSE
			}
		})
		.saturate(amount, BoolValue::FALSE, f)
	}

	/// Compute the zero-extending right shift of the value.
	pub(crate) fn shr(&self, amount: &Self, f: &mut CircuitFactory) -> Self {
		self.shift(amount, f, |bits, i, by, w| {
			if i + by < w {
				bits[i + by]
			} else {
				BoolValue::FALSE
			}
		})
		.saturate(amount, BoolValue::FALSE, f)
	}

	/// Compute the sign of the value: `-1`, `0`, or `1`.
	pub(crate) fn sgn(&self, f: &mut CircuitFactory) -> Self {
		let mut acc = BoolAccumulator::or();
		for &b in &self.bits {
			acc.add(b);
		}
		let nonzero = f.accumulate(acc);
		let sign = self.sign();
		let mut bits = vec![sign; self.width()];
		bits[0] = nonzero;
		IntCircuit { bits }
	}

	/// Sum a sequence of values of equal width with a balanced adder tree.
	pub(crate) fn sum_all(
		mut terms: Vec<IntCircuit>,
		width: u32,
		f: &mut CircuitFactory,
	) -> Self {
		if terms.is_empty() {
			return Self::zero(width);
		}
		while terms.len() > 1 {
			terms = terms
				.chunks(2)
				.map(|pair| {
					if pair.len() == 2 {
						pair[0].plus(&pair[1], f)
					} else {
						pair[0].clone()
					}
				})
				.collect();
		}
		terms.pop().expect("at least one term remains")
	}

	/// Compute the wrapping product of two values by shift-and-add.
	pub(crate) fn times(&self, other: &Self, f: &mut CircuitFactory) -> Self {
		assert_eq!(self.width(), other.width(), "widths must match");
		let w = self.width();
		let mut acc = Self::zero(w as u32);
		for i in 0..w {
			if other.bits[i] == BoolValue::FALSE {
				continue;
			}
			let partial = IntCircuit {
				bits: (0..w)
					.map(|j| {
						if j >= i {
							f.and(self.bits[j - i], other.bits[i])
						} else {
							BoolValue::FALSE
						}
					})
					.collect(),
			};
			acc = acc.plus(&partial, f);
		}
		acc
	}

	/// The number of bits of the value.
	pub(crate) fn width(&self) -> usize {
		self.bits.len()
	}

	/// Compute quotient and remainder by restoring division on magnitudes,
	/// then fix up the signs.
	fn div_rem(&self, other: &Self, f: &mut CircuitFactory) -> (Self, Self) {
		assert_eq!(self.width(), other.width(), "widths must match");
		let w = self.width();
		let (sa, sb) = (self.sign(), other.sign());
		let ma = self.abs(f);
		let mb = other.abs(f);

		// One extra register bit so the comparison after the shift-in step
		// cannot overflow.
		let divisor: Vec<BoolValue> = mb
			.bits
			.iter()
			.copied()
			.chain([BoolValue::FALSE])
			.collect();
		let mut remainder = vec![BoolValue::FALSE; w + 1];
		let mut quotient = vec![BoolValue::FALSE; w];
		for i in (0..w).rev() {
			let mut shifted = Vec::with_capacity(w + 1);
			shifted.push(ma.bits[i]);
			shifted.extend_from_slice(&remainder[0..w]);
			let ge = gte_unsigned(&shifted, &divisor, f);
			let nb: Vec<BoolValue> = divisor.iter().map(|&b| !b).collect();
			let diff = add_slices(&shifted, &nb, BoolValue::TRUE, f);
			remainder = shifted
				.iter()
				.zip(diff.iter())
				.map(|(&kept, &sub)| f.ite(ge, sub, kept))
				.collect();
			quotient[i] = ge;
		}

		let mag_q = IntCircuit { bits: quotient };
		let mag_r = IntCircuit {
			bits: remainder[0..w].to_vec(),
		};
		let q_negative = f.xor(sa, sb);
		let neg_q = mag_q.negated(f);
		let neg_r = mag_r.negated(f);
		(
			Self::choose(q_negative, &neg_q, &mag_q, f),
			Self::choose(sa, &neg_r, &mag_r, f),
		)
	}

	/// Apply a binary operation to the bits of two values pointwise.
	fn pointwise(
		&self,
		other: &Self,
		op: impl Fn(&mut CircuitFactory, BoolValue, BoolValue) -> BoolValue,
		f: &mut CircuitFactory,
	) -> Self {
		assert_eq!(self.width(), other.width(), "widths must match");
		IntCircuit {
			bits: self
				.bits
				.iter()
				.zip(other.bits.iter())
				.map(|(&a, &b)| op(f, a, b))
				.collect(),
		}
	}

	/// Zero or sign-fill the value when the shift amount has a bit set
	/// beyond the barrel stages, including a negative amount's sign bit.
	fn saturate(self, amount: &Self, fill: BoolValue, f: &mut CircuitFactory) -> Self {
		let stages = stage_count(self.width());
		let mut acc = BoolAccumulator::or();
		for &b in &amount.bits[stages..] {
			acc.add(b);
		}
		let overflow = f.accumulate(acc);
		IntCircuit {
			bits: self.bits.iter().map(|&b| f.ite(overflow, fill, b)).collect(),
		}
	}

	/// Run the barrel stages of a shift, selecting each stage with one bit
	/// of the shift amount.
	fn shift(
		&self,
		amount: &Self,
		f: &mut CircuitFactory,
		pick: impl Fn(&[BoolValue], usize, usize, usize) -> BoolValue,
	) -> Self {
		assert_eq!(self.width(), amount.width(), "widths must match");
		let w = self.width();
		let mut bits = self.bits.clone();
		for stage in 0..stage_count(w) {
			let by = 1usize << stage;
			let ctrl = amount.bits[stage];
			bits = (0..w)
				.map(|i| {
					let moved = pick(&bits, i, by, w);
					f.ite(ctrl, moved, bits[i])
				})
				.collect();
		}
		IntCircuit { bits }
	}

	/// The sign bit of the value.
	fn sign(&self) -> BoolValue {
		self.bits[self.width() - 1]
	}
}

/// Add two equal-length bit slices with the given carry-in, dropping the
/// final carry.
fn add_slices(
	a: &[BoolValue],
	b: &[BoolValue],
	mut carry: BoolValue,
	f: &mut CircuitFactory,
) -> Vec<BoolValue> {
	assert_eq!(a.len(), b.len(), "widths must match");
	let mut out = Vec::with_capacity(a.len());
	for (&x, &y) in a.iter().zip(b.iter()) {
		let xy = f.xor(x, y);
		out.push(f.xor(xy, carry));
		let gen = f.and(x, y);
		let prop = f.and(carry, xy);
		carry = f.or(gen, prop);
	}
	out
}

/// Compare two equal-length bit slices as unsigned numbers.
fn gte_unsigned(a: &[BoolValue], b: &[BoolValue], f: &mut CircuitFactory) -> BoolValue {
	assert_eq!(a.len(), b.len(), "widths must match");
	let mut gte = BoolValue::TRUE;
	for (&x, &y) in a.iter().zip(b.iter()) {
		let eq = f.iff(x, y);
		let ny = !y;
		let wins = f.and(x, ny);
		gte = f.ite(eq, gte, wins);
	}
	gte
}

/// The number of barrel stages needed for a shift over `width` bits.
fn stage_count(width: usize) -> usize {
	let mut stages = 0;
	while (1usize << stages) < width {
		stages += 1;
	}
	stages
}

#[cfg(test)]
mod tests {
	use crate::circuit::{int::IntCircuit, BoolValue, CircuitFactory};

	/// Evaluate a constant circuit back to an integer.
	fn value_of(x: &IntCircuit) -> i64 {
		let w = x.width();
		let mut v: i64 = 0;
		for (i, &b) in x.bits().iter().enumerate() {
			assert!(b.is_constant(), "bit {i} is not constant");
			if b == BoolValue::TRUE {
				v |= 1 << i;
			}
		}
		// Sign-extend from the top bit.
		if v & (1 << (w - 1)) != 0 {
			v -= 1 << w;
		}
		v
	}

	/// Run a binary operation on two constants of the given width.
	fn binop(
		a: i32,
		b: i32,
		width: u32,
		op: impl Fn(&IntCircuit, &IntCircuit, &mut CircuitFactory) -> IntCircuit,
	) -> i64 {
		let mut f = CircuitFactory::new(0, 3);
		let x = IntCircuit::constant(a, width);
		let y = IntCircuit::constant(b, width);
		value_of(&op(&x, &y, &mut f))
	}

	#[test]
	fn test_constant_arithmetic() {
		assert_eq!(binop(2, 3, 8, IntCircuit::plus), 5);
		assert_eq!(binop(2, 3, 8, IntCircuit::minus), -1);
		assert_eq!(binop(-4, 6, 8, IntCircuit::plus), 2);
		assert_eq!(binop(3, 5, 8, IntCircuit::times), 15);
		assert_eq!(binop(-3, 5, 8, IntCircuit::times), -15);
		// Wrapping at the width.
		assert_eq!(binop(100, 100, 8, IntCircuit::plus), -56);
	}

	#[test]
	fn test_constant_division() {
		assert_eq!(binop(7, 2, 8, IntCircuit::div), 3);
		assert_eq!(binop(7, 2, 8, IntCircuit::rem), 1);
		assert_eq!(binop(-7, 2, 8, IntCircuit::div), -3);
		assert_eq!(binop(-7, 2, 8, IntCircuit::rem), -1);
		assert_eq!(binop(7, -2, 8, IntCircuit::div), -3);
		assert_eq!(binop(7, -2, 8, IntCircuit::rem), 1);
		assert_eq!(binop(6, 3, 8, IntCircuit::div), 2);
		assert_eq!(binop(6, 3, 8, IntCircuit::rem), 0);
	}

	#[test]
	fn test_constant_shifts() {
		assert_eq!(binop(1, 3, 8, IntCircuit::shl), 8);
		assert_eq!(binop(-8, 1, 8, IntCircuit::sha), -4);
		assert_eq!(binop(-8, 2, 8, IntCircuit::shr), 62);
		// Out-of-range and negative amounts saturate.
		assert_eq!(binop(3, 9, 8, IntCircuit::shl), 0);
		assert_eq!(binop(-3, -1, 8, IntCircuit::sha), -1);
		assert_eq!(binop(3, -1, 8, IntCircuit::shr), 0);
	}

	#[test]
	fn test_constant_unary() {
		let mut f = CircuitFactory::new(0, 3);
		let x = IntCircuit::constant(-5, 8);
		assert_eq!(value_of(&x.negated(&mut f)), 5);
		assert_eq!(value_of(&x.abs(&mut f)), 5);
		assert_eq!(value_of(&x.sgn(&mut f)), -1);
		let z = IntCircuit::constant(0, 8);
		assert_eq!(value_of(&z.sgn(&mut f)), 0);
		let p = IntCircuit::constant(9, 8);
		assert_eq!(value_of(&p.sgn(&mut f)), 1);
	}

	#[test]
	fn test_constant_comparisons() {
		let mut f = CircuitFactory::new(0, 3);
		let a = IntCircuit::constant(-3, 4);
		let b = IntCircuit::constant(2, 4);
		assert_eq!(a.lt(&b, &mut f), BoolValue::TRUE);
		assert_eq!(b.lt(&a, &mut f), BoolValue::FALSE);
		assert_eq!(a.lte(&a.clone(), &mut f), BoolValue::TRUE);
		assert_eq!(b.gt(&a, &mut f), BoolValue::TRUE);
		assert_eq!(a.equals(&a.clone(), &mut f), BoolValue::TRUE);
		assert_eq!(a.equals(&b, &mut f), BoolValue::FALSE);
	}

	#[test]
	fn test_count() {
		let mut f = CircuitFactory::new(0, 3);
		let c = IntCircuit::count(
			[BoolValue::TRUE, BoolValue::TRUE, BoolValue::TRUE],
			4,
			&mut f,
		);
		assert_eq!(value_of(&c), 3);
	}
}
