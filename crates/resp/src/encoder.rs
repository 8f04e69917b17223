//! The encoder trait and its combinators.
//!
//! An [`Encoder`] turns a value into a [`ByteExpr`] without touching the
//! transport. Encoders are plain values: they can be stored, copied and
//! composed once, then applied to any number of inputs.

use crate::error::EncodeError;
use crate::expr::ByteExpr;

/// Converts a `T` into the bytes that represent it on the wire.
///
/// The lifetime `'a` is how long the produced expression may borrow from
/// the input (a `&'a str` payload is written straight from the caller's
/// memory). Encoding is referentially transparent: the same input always
/// yields the same bytes.
pub trait Encoder<'a, T> {
	fn encode(&self, value: T) -> Result<ByteExpr<'a>, EncodeError>;
}

/// Chaining combinators, available on every value.
///
/// They are kept off [`Encoder`] so that building a chain does not have to
/// name the input type: it is inferred when the chain is finally applied.
pub trait EncoderExt: Sized {
	/// Adapt the input type: `f` runs first, then this encoder.
	fn map_input<F>(self, f: F) -> Map<Self, F> {
		Map { inner: self, f }
	}

	/// Follow every output with a constant span.
	fn append(self, tail: &'static [u8]) -> Append<Self> {
		Append { inner: self, tail }
	}

	/// Run `other` on the same input and write its output after this one.
	fn zip_with<E>(self, other: E) -> Zip<Self, E> {
		Zip {
			first: self,
			second: other,
		}
	}

	/// Compact every produced expression.
	fn compacted(self) -> Compacted<Self> {
		Compacted { inner: self }
	}
}

impl<E> EncoderExt for E {}

impl<'a, T, E> Encoder<'a, T> for &E
where
	E: Encoder<'a, T> + ?Sized,
{
	fn encode(&self, value: T) -> Result<ByteExpr<'a>, EncodeError> {
		(**self).encode(value)
	}
}

#[derive(Debug, Clone, Copy)]
pub struct Map<E, F> {
	inner: E,
	f: F,
}

impl<'a, S, T, E, F> Encoder<'a, S> for Map<E, F>
where
	E: Encoder<'a, T>,
	F: Fn(S) -> T,
{
	fn encode(&self, value: S) -> Result<ByteExpr<'a>, EncodeError> {
		self.inner.encode((self.f)(value))
	}
}

#[derive(Debug, Clone, Copy)]
pub struct Append<E> {
	inner: E,
	tail: &'static [u8],
}

impl<'a, T, E> Encoder<'a, T> for Append<E>
where
	E: Encoder<'a, T>,
{
	fn encode(&self, value: T) -> Result<ByteExpr<'a>, EncodeError> {
		Ok(self.inner.encode(value)?.append_const(self.tail))
	}
}

#[derive(Debug, Clone, Copy)]
pub struct Prefix<E> {
	head: &'static [u8],
	inner: E,
}

impl<'a, T, E> Encoder<'a, T> for Prefix<E>
where
	E: Encoder<'a, T>,
{
	fn encode(&self, value: T) -> Result<ByteExpr<'a>, EncodeError> {
		Ok(ByteExpr::constant(self.head).append(self.inner.encode(value)?))
	}
}

/// Opens a bulk string: writes `$` and counts one argument.
#[derive(Debug, Clone, Copy)]
pub struct Argument<E> {
	inner: E,
}

impl<'a, T, E> Encoder<'a, T> for Argument<E>
where
	E: Encoder<'a, T>,
{
	fn encode(&self, value: T) -> Result<ByteExpr<'a>, EncodeError> {
		Ok(ByteExpr::arg_marker().append(self.inner.encode(value)?))
	}
}

#[derive(Debug, Clone, Copy)]
pub struct Zip<A, B> {
	first: A,
	second: B,
}

impl<'a, T, A, B> Encoder<'a, T> for Zip<A, B>
where
	T: Copy,
	A: Encoder<'a, T>,
	B: Encoder<'a, T>,
{
	fn encode(&self, value: T) -> Result<ByteExpr<'a>, EncodeError> {
		Ok(self.first.encode(value)?.append(self.second.encode(value)?))
	}
}

#[derive(Debug, Clone, Copy)]
pub struct Pair<A, B> {
	first: A,
	second: B,
}

impl<'a, T, U, A, B> Encoder<'a, (T, U)> for Pair<A, B>
where
	A: Encoder<'a, T>,
	B: Encoder<'a, U>,
{
	fn encode(&self, (left, right): (T, U)) -> Result<ByteExpr<'a>, EncodeError> {
		Ok(self.first.encode(left)?.append(self.second.encode(right)?))
	}
}

#[derive(Debug, Clone, Copy)]
pub struct Choice<P, A, B> {
	predicate: P,
	then: A,
	otherwise: B,
}

impl<'a, T, P, A, B> Encoder<'a, T> for Choice<P, A, B>
where
	P: Fn(&T) -> bool,
	A: Encoder<'a, T>,
	B: Encoder<'a, T>,
{
	fn encode(&self, value: T) -> Result<ByteExpr<'a>, EncodeError> {
		if (self.predicate)(&value) {
			self.then.encode(value)
		} else {
			self.otherwise.encode(value)
		}
	}
}

#[derive(Debug, Clone, Copy)]
pub struct ChoiceConst<P, B> {
	predicate: P,
	then: &'static [u8],
	otherwise: B,
}

impl<'a, T, P, B> Encoder<'a, T> for ChoiceConst<P, B>
where
	P: Fn(&T) -> bool,
	B: Encoder<'a, T>,
{
	fn encode(&self, value: T) -> Result<ByteExpr<'a>, EncodeError> {
		if (self.predicate)(&value) {
			Ok(ByteExpr::constant(self.then))
		} else {
			self.otherwise.encode(value)
		}
	}
}

#[derive(Debug, Clone, Copy)]
pub struct Compacted<E> {
	inner: E,
}

impl<'a, T, E> Encoder<'a, T> for Compacted<E>
where
	E: Encoder<'a, T>,
{
	fn encode(&self, value: T) -> Result<ByteExpr<'a>, EncodeError> {
		Ok(self.inner.encode(value)?.compact())
	}
}

/// Ignores its input and emits a constant span.
#[derive(Debug, Clone, Copy)]
pub struct Constant(&'static [u8]);

impl<'a, T> Encoder<'a, T> for Constant {
	fn encode(&self, _value: T) -> Result<ByteExpr<'a>, EncodeError> {
		Ok(ByteExpr::constant(self.0))
	}
}

/// Writes the input bytes as they are, borrowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Borrowed;

impl<'a> Encoder<'a, &'a [u8]> for Borrowed {
	fn encode(&self, value: &'a [u8]) -> Result<ByteExpr<'a>, EncodeError> {
		Ok(ByteExpr::borrowed(value))
	}
}

impl<'a> Encoder<'a, &'a str> for Borrowed {
	fn encode(&self, value: &'a str) -> Result<ByteExpr<'a>, EncodeError> {
		Ok(ByteExpr::borrowed(value.as_bytes()))
	}
}

/// Encodes every element of an iterable in iteration order.
///
/// The result's [`ByteExpr::arg_count`] is the sum over the elements, so
/// with one bulk string per element it is the element count.
#[derive(Debug, Clone, Copy)]
pub struct Collection<E> {
	element: E,
}

impl<'a, I, E> Encoder<'a, I> for Collection<E>
where
	I: IntoIterator,
	E: Encoder<'a, I::Item>,
{
	fn encode(&self, values: I) -> Result<ByteExpr<'a>, EncodeError> {
		values
			.into_iter()
			.map(|value| self.element.encode(value))
			.collect()
	}
}

pub fn constant(bytes: &'static [u8]) -> Constant {
	Constant(bytes)
}

pub fn borrowed() -> Borrowed {
	Borrowed
}

pub fn prefix<E>(head: &'static [u8], inner: E) -> Prefix<E> {
	Prefix { head, inner }
}

pub fn argument<E>(inner: E) -> Argument<E> {
	Argument { inner }
}

pub fn pair<A, B>(first: A, second: B) -> Pair<A, B> {
	Pair { first, second }
}

/// Evaluates `predicate` against every input and picks `then` or
/// `otherwise`.
pub fn choice<P, A, B>(predicate: P, then: A, otherwise: B) -> Choice<P, A, B> {
	Choice {
		predicate,
		then,
		otherwise,
	}
}

/// Like [`choice`], with a constant output when the predicate holds.
pub fn choice_const<P, B>(predicate: P, then: &'static [u8], otherwise: B) -> ChoiceConst<P, B> {
	ChoiceConst {
		predicate,
		then,
		otherwise,
	}
}

pub fn collection<E>(element: E) -> Collection<E> {
	Collection { element }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::numeric::decimal;
	use crate::numeric::long_bulk_string;

	#[test]
	fn test_map_precomposes() {
		let encoder = long_bulk_string().map_input(|s: &str| s.len() as i64);
		let expr = encoder.encode("hello").unwrap();
		assert_eq!(expr.to_bytes(), &b"$1\r\n5\r\n"[..]);
	}

	#[test]
	fn test_zip_and_append_order() {
		let encoder = prefix(b"<", borrowed()).zip_with(borrowed()).append(b">");
		let expr = encoder.encode(&b"ab"[..]).unwrap();
		assert_eq!(expr.to_bytes(), &b"<abab>"[..]);
	}

	#[test]
	fn test_pair_encodes_both_halves() {
		let encoder = pair(long_bulk_string(), borrowed());
		let expr = encoder.encode((7, &b"x"[..])).unwrap();
		assert_eq!(expr.to_bytes(), &b"$1\r\n7\r\nx"[..]);
		assert_eq!(expr.arg_count(), 1);
	}

	#[test]
	fn test_choice_is_evaluated_per_call() {
		let encoder = choice(
			|n: &i64| *n < 0,
			constant(b"negative"),
			prefix(b"+", decimal()),
		);
		assert_eq!(encoder.encode(-3).unwrap().to_bytes(), &b"negative"[..]);
		assert_eq!(encoder.encode(12).unwrap().to_bytes(), &b"+12"[..]);
		assert_eq!(encoder.encode(-1).unwrap().to_bytes(), &b"negative"[..]);
	}

	#[test]
	fn test_choice_const() {
		let encoder = choice_const(|s: &&str| s.is_empty(), b"(empty)", borrowed());
		assert_eq!(encoder.encode("").unwrap().to_bytes(), &b"(empty)"[..]);
		assert_eq!(encoder.encode("abc").unwrap().to_bytes(), &b"abc"[..]);
	}

	#[test]
	fn test_argument_counts_one() {
		let encoder = argument(borrowed());
		let expr = encoder.encode("k").unwrap();
		assert_eq!(expr.arg_count(), 1);
		assert_eq!(expr.to_bytes(), &b"$k"[..]);
	}

	#[test]
	fn test_collection_preserves_order_and_count() {
		let values = [1i64, 22, -3];
		let expr = collection(long_bulk_string())
			.encode(values.iter().copied())
			.unwrap();
		assert_eq!(expr.arg_count(), 3);
		assert_eq!(
			expr.to_bytes(),
			&b"$1\r\n1\r\n$2\r\n22\r\n$2\r\n-3\r\n"[..]
		);
	}

	#[test]
	fn test_compacted() {
		let expr = long_bulk_string().compacted().encode(42).unwrap();
		assert_eq!(expr.span_count(), 1);
		assert_eq!(expr.to_bytes(), &b"$2\r\n42\r\n"[..]);
	}
}
