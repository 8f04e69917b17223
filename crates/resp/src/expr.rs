//! Lazily composed byte expressions.
//!
//! Encoders never write to the transport directly. They return a
//! [`ByteExpr`]: an ordered list of spans that either point at constant
//! tables, at the caller's own data, or at small owned buffers. Nothing is
//! copied until the expression is written out, and [`ByteExpr::compact`] can
//! merge runs of small spans so the transport sees fewer discrete writes.

use std::io::IoSlice;

use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;
use smallvec::SmallVec;

use crate::numeric::AsciiDecimal;
use crate::utils::BULK_STRING;

/// Spans up to this many bytes are merged by [`ByteExpr::compact`].
pub const COMPACT_SPAN_LIMIT: usize = 64;

const ARG_MARKER: &[u8] = &[BULK_STRING];

type Spans<'a> = SmallVec<[Span<'a>; 4]>;

#[derive(Debug, Clone)]
enum Span<'a> {
	/// Compile-time constant, shared by every expression that uses it.
	Static(&'static [u8]),
	/// Decimal digits rendered inline.
	Digits(AsciiDecimal),
	/// Reference-counted buffer (transcoded payloads, compacted runs).
	Shared(Bytes),
	/// View into caller data.
	Borrowed(&'a [u8]),
}

impl Span<'_> {
	#[inline]
	fn as_slice(&self) -> &[u8] {
		match self {
			Span::Static(bytes) => &bytes[..],
			Span::Digits(digits) => digits.as_bytes(),
			Span::Shared(bytes) => &bytes[..],
			Span::Borrowed(bytes) => &bytes[..],
		}
	}

	#[inline]
	fn len(&self) -> usize {
		self.as_slice().len()
	}
}

/// An immutable sequence of byte spans, in write order.
///
/// Besides the bytes themselves an expression tracks how many dynamic
/// arguments (bulk strings) it contains, so a caller can emit the array
/// header that must precede them after the arguments have been encoded.
#[derive(Debug, Clone, Default)]
pub struct ByteExpr<'a> {
	spans: Spans<'a>,
	args: usize,
}

impl<'a> ByteExpr<'a> {
	pub fn empty() -> Self {
		Self::default()
	}

	/// A constant span.
	pub fn constant(bytes: &'static [u8]) -> Self {
		Self::from_span(Span::Static(bytes))
	}

	/// A span borrowed from the caller, valid for as long as the value is.
	pub fn borrowed(bytes: &'a [u8]) -> Self {
		Self::from_span(Span::Borrowed(bytes))
	}

	/// A span backed by a reference-counted buffer.
	pub fn shared(bytes: Bytes) -> Self {
		Self::from_span(Span::Shared(bytes))
	}

	pub(crate) fn digits(digits: AsciiDecimal) -> Self {
		Self::from_span(Span::Digits(digits))
	}

	/// The `$` that opens a bulk string. It is the only span counted as an
	/// argument.
	pub fn arg_marker() -> Self {
		Self {
			args: 1,
			..Self::constant(ARG_MARKER)
		}
	}

	fn from_span(span: Span<'a>) -> Self {
		let mut spans = Spans::new();
		spans.push(span);
		Self { spans, args: 0 }
	}

	/// Concatenate `other` after `self`. Only span handles move; payload bytes
	/// are not copied.
	pub fn append(mut self, other: ByteExpr<'a>) -> Self {
		self.spans.extend(other.spans);
		self.args += other.args;
		self
	}

	/// Append a constant span.
	pub fn append_const(mut self, bytes: &'static [u8]) -> Self {
		self.spans.push(Span::Static(bytes));
		self
	}

	/// Number of dynamic arguments (bulk strings) in this expression.
	pub fn arg_count(&self) -> usize {
		self.args
	}

	/// Total number of bytes the expression writes.
	pub fn len(&self) -> usize {
		self.spans.iter().map(Span::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.spans.iter().all(|span| span.len() == 0)
	}

	/// Number of discrete spans a vectored write would issue.
	pub fn span_count(&self) -> usize {
		self.spans.len()
	}

	pub fn spans(&self) -> impl Iterator<Item = &[u8]> {
		self.spans.iter().map(Span::as_slice)
	}

	/// Merge every run of adjacent spans no longer than
	/// [`COMPACT_SPAN_LIMIT`] into one buffer.
	///
	/// Byte content, order and argument count are unchanged. Spans above the
	/// limit are kept as they are, so large payloads are never copied.
	pub fn compact(self) -> Self {
		let ByteExpr { spans: input, args } = self;
		if input.len() < 2 {
			return ByteExpr { spans: input, args };
		}

		let mut spans = Spans::new();
		let mut run = Spans::new();
		for span in input {
			if span.len() <= COMPACT_SPAN_LIMIT {
				run.push(span);
			} else {
				flush_run(&mut run, &mut spans);
				spans.push(span);
			}
		}
		flush_run(&mut run, &mut spans);

		ByteExpr { spans, args }
	}

	/// Write every span, in order, into `buf`.
	pub fn write_to<B: BufMut>(&self, buf: &mut B) {
		for span in &self.spans {
			buf.put_slice(span.as_slice());
		}
	}

	/// Materialise the expression into one contiguous buffer.
	pub fn to_bytes(&self) -> Bytes {
		let mut buf = BytesMut::with_capacity(self.len());
		self.write_to(&mut buf);
		buf.freeze()
	}

	/// The spans as `IoSlice`s, for a single vectored write.
	pub fn io_slices(&self) -> Vec<IoSlice<'_>> {
		self.spans.iter().map(|span| IoSlice::new(span.as_slice())).collect()
	}
}

fn flush_run<'a>(run: &mut Spans<'a>, out: &mut Spans<'a>) {
	match run.len() {
		0 => {}
		1 => out.extend(run.drain(..)),
		_ => {
			let total = run.iter().map(Span::len).sum();
			let mut merged = BytesMut::with_capacity(total);
			for span in run.drain(..) {
				merged.extend_from_slice(span.as_slice());
			}
			out.push(Span::Shared(merged.freeze()));
		}
	}
}

impl<'a> Extend<ByteExpr<'a>> for ByteExpr<'a> {
	fn extend<I: IntoIterator<Item = ByteExpr<'a>>>(&mut self, iter: I) {
		for expr in iter {
			self.spans.extend(expr.spans);
			self.args += expr.args;
		}
	}
}

impl<'a> FromIterator<ByteExpr<'a>> for ByteExpr<'a> {
	fn from_iter<I: IntoIterator<Item = ByteExpr<'a>>>(iter: I) -> Self {
		let mut expr = ByteExpr::empty();
		expr.extend(iter);
		expr
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_append_keeps_write_order() {
		let payload = b"payload".to_vec();
		let expr = ByteExpr::constant(b"head:")
			.append(ByteExpr::borrowed(&payload))
			.append_const(b":tail");
		assert_eq!(expr.to_bytes(), &b"head:payload:tail"[..]);
		assert_eq!(expr.span_count(), 3);
		assert_eq!(expr.len(), 17);
	}

	#[test]
	fn test_arg_marker_is_counted() {
		let expr = ByteExpr::arg_marker()
			.append_const(b"1\r\n7\r\n")
			.append(ByteExpr::arg_marker().append_const(b"1\r\n8\r\n"));
		assert_eq!(expr.arg_count(), 2);
		assert_eq!(expr.to_bytes(), &b"$1\r\n7\r\n$1\r\n8\r\n"[..]);
	}

	#[test]
	fn test_constants_are_not_arguments() {
		let expr = ByteExpr::constant(b"*3").append_const(b"\r\n");
		assert_eq!(expr.arg_count(), 0);
	}

	#[test]
	fn test_compact_merges_small_spans() {
		let value = b"v".to_vec();
		let expr = ByteExpr::arg_marker()
			.append_const(b"1")
			.append_const(b"\r\n")
			.append(ByteExpr::borrowed(&value))
			.append_const(b"\r\n");
		let compacted = expr.clone().compact();
		assert_eq!(compacted.span_count(), 1);
		assert_eq!(compacted.arg_count(), 1);
		assert_eq!(compacted.to_bytes(), expr.to_bytes());
	}

	#[test]
	fn test_compact_leaves_large_spans_alone() {
		let big = vec![b'x'; COMPACT_SPAN_LIMIT + 1];
		let expr = ByteExpr::constant(b"$")
			.append_const(b"65\r\n")
			.append(ByteExpr::borrowed(&big))
			.append_const(b"\r\n");
		let compacted = expr.clone().compact();
		assert_eq!(compacted.span_count(), 3);
		assert_eq!(compacted.to_bytes(), expr.to_bytes());
	}

	#[test]
	fn test_io_slices_match_spans() {
		let expr = ByteExpr::constant(b"ab").append_const(b"cd");
		let slices = expr.io_slices();
		assert_eq!(slices.len(), 2);
		assert_eq!(&*slices[0], b"ab");
		assert_eq!(&*slices[1], b"cd");
	}

	#[test]
	fn test_collect_sums_arguments() {
		let expr: ByteExpr<'_> = (0..3).map(|_| ByteExpr::arg_marker()).collect();
		assert_eq!(expr.arg_count(), 3);
		assert_eq!(expr.to_bytes(), &b"$$$"[..]);
		assert!(ByteExpr::empty().is_empty());
	}
}
