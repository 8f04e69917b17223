//! Decimal rendering of integers with lookup-table fast paths.
//!
//! Values 0..=99 and `i64::MIN` never run the digit loop: they resolve to
//! slices of constant tables. Everything else is rendered right to left into
//! an inline 20-byte buffer sized by a threshold table.

use crate::encoder::Encoder;
use crate::error::EncodeError;
use crate::error::ParseError;
use crate::expr::ByteExpr;
use crate::utils::CRLF;

static DIGITS: [u8; 10] = *b"0123456789";

/// ASCII renderings of 10..=99, indexed by `n - 10`.
static TWO_DIGITS: [[u8; 2]; 90] = {
	let mut table = [[0u8; 2]; 90];
	let mut i = 0;
	while i < 90 {
		let n = i + 10;
		table[i] = [b'0' + (n / 10) as u8, b'0' + (n % 10) as u8];
		i += 1;
	}
	table
};

/// `SIZE_TABLE[i]` is the largest value with `i + 1` decimal digits.
const SIZE_TABLE: [u64; 19] = {
	let mut table = [0u64; 19];
	let mut limit: u64 = 10;
	let mut i = 0;
	while i < 19 {
		table[i] = limit - 1;
		if i < 18 {
			limit *= 10;
		}
		i += 1;
	}
	table
};

const MIN_LONG: &[u8] = b"-9223372036854775808";
const MIN_LONG_BULK: &[u8] = b"20\r\n-9223372036854775808\r\n";
const ONE_DIGIT_HEADER: &[u8] = b"1\r\n";
const TWO_DIGIT_HEADER: &[u8] = b"2\r\n";
const ARRAY_MARKER: &[u8] = b"*";

/// Longest rendering: `u64::MAX` and `i64::MIN` are both 20 bytes.
const MAX_DIGITS: usize = 20;

/// A decimal number rendered into an inline buffer.
#[derive(Clone, Copy)]
pub struct AsciiDecimal {
	buf: [u8; MAX_DIGITS],
	len: u8,
}

impl AsciiDecimal {
	fn from_magnitude(magnitude: u64, negative: bool) -> Self {
		let size = digit_count(magnitude) + usize::from(negative);
		debug_assert!(size <= MAX_DIGITS);

		let mut buf = [0u8; MAX_DIGITS];
		let mut n = magnitude;
		let mut i = size;
		loop {
			i -= 1;
			buf[i] = b'0' + (n % 10) as u8;
			n /= 10;
			if n == 0 {
				break;
			}
		}
		if negative {
			buf[0] = b'-';
		}

		Self {
			buf,
			len: size as u8,
		}
	}

	pub fn from_u64(n: u64) -> Self {
		Self::from_magnitude(n, false)
	}

	pub fn from_i64(n: i64) -> Self {
		if n == i64::MIN {
			let mut buf = [0u8; MAX_DIGITS];
			buf.copy_from_slice(MIN_LONG);
			return Self {
				buf,
				len: MIN_LONG.len() as u8,
			};
		}
		if n < 0 {
			Self::from_magnitude((-n) as u64, true)
		} else {
			Self::from_magnitude(n as u64, false)
		}
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.buf[..usize::from(self.len)]
	}

	pub fn len(&self) -> usize {
		usize::from(self.len)
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}
}

impl std::fmt::Debug for AsciiDecimal {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("AsciiDecimal")
			.field(&String::from_utf8_lossy(self.as_bytes()))
			.finish()
	}
}

/// Number of decimal digits of `x`.
#[inline]
fn digit_count(x: u64) -> usize {
	SIZE_TABLE
		.iter()
		.position(|&limit| x <= limit)
		.map_or(MAX_DIGITS, |i| i + 1)
}

/// Render `n` with the generic digit loop, the way every slow path does.
pub fn to_ascii(n: i64) -> AsciiDecimal {
	AsciiDecimal::from_i64(n)
}

fn unsigned_expr<'a>(n: u64) -> ByteExpr<'a> {
	match n {
		0..=9 => {
			let i = n as usize;
			ByteExpr::constant(&DIGITS[i..i + 1])
		}
		10..=99 => ByteExpr::constant(&TWO_DIGITS[(n - 10) as usize]),
		_ => ByteExpr::digits(AsciiDecimal::from_u64(n)),
	}
}

fn signed_expr<'a>(n: i64) -> ByteExpr<'a> {
	match n {
		0.. => unsigned_expr(n as u64),
		i64::MIN => ByteExpr::constant(MIN_LONG),
		_ => ByteExpr::digits(AsciiDecimal::from_i64(n)),
	}
}

/// Bulk string body (without the `$` marker) for a 64-bit value.
fn long_bulk_body<'a>(n: i64) -> ByteExpr<'a> {
	match n {
		0..=9 => ByteExpr::constant(ONE_DIGIT_HEADER)
			.append(unsigned_expr(n as u64))
			.append_const(CRLF),
		10..=99 => ByteExpr::constant(TWO_DIGIT_HEADER)
			.append(unsigned_expr(n as u64))
			.append_const(CRLF),
		i64::MIN => ByteExpr::constant(MIN_LONG_BULK),
		_ => {
			let digits = AsciiDecimal::from_i64(n);
			unsigned_expr(digits.len() as u64)
				.append_const(CRLF)
				.append(ByteExpr::digits(digits))
				.append_const(CRLF)
		}
	}
}

/// Reads a signed decimal one byte at a time.
///
/// Digits accumulate in the direction of the sign with checked arithmetic,
/// so `i64::MIN` is read without ever holding its positive magnitude.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DecimalAccumulator {
	negative: bool,
	value: i64,
	digits: usize,
}

impl DecimalAccumulator {
	pub(crate) fn push(&mut self, byte: u8) -> Result<(), ParseError> {
		match byte {
			b'-' if self.digits == 0 && !self.negative => self.negative = true,
			b'0'..=b'9' => {
				let digit = i64::from(byte - b'0');
				self.value = self
					.value
					.checked_mul(10)
					.and_then(|v| {
						if self.negative {
							v.checked_sub(digit)
						} else {
							v.checked_add(digit)
						}
					})
					.ok_or_else(|| ParseError::InvalidInteger("value out of 64-bit range".into()))?;
				self.digits += 1;
			}
			_ => {
				return Err(ParseError::InvalidInteger(format!(
					"unexpected byte 0x{:02X}",
					byte
				)));
			}
		}
		Ok(())
	}

	pub(crate) fn finish(&self) -> Result<i64, ParseError> {
		if self.digits == 0 {
			return Err(ParseError::InvalidInteger("no digits".into()));
		}
		Ok(self.value)
	}
}

/// Plain decimal rendering, no framing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decimal;

impl<'a> Encoder<'a, i64> for Decimal {
	fn encode(&self, value: i64) -> Result<ByteExpr<'a>, EncodeError> {
		Ok(signed_expr(value))
	}
}

impl<'a> Encoder<'a, i32> for Decimal {
	fn encode(&self, value: i32) -> Result<ByteExpr<'a>, EncodeError> {
		Ok(signed_expr(i64::from(value)))
	}
}

impl<'a> Encoder<'a, usize> for Decimal {
	fn encode(&self, value: usize) -> Result<ByteExpr<'a>, EncodeError> {
		Ok(unsigned_expr(value as u64))
	}
}

/// `$<len>\r\n<digits>\r\n` for a 32-bit value.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntBulkString;

impl<'a> Encoder<'a, i32> for IntBulkString {
	fn encode(&self, value: i32) -> Result<ByteExpr<'a>, EncodeError> {
		Ok(ByteExpr::arg_marker().append(long_bulk_body(i64::from(value))))
	}
}

/// `$<len>\r\n<digits>\r\n` for a 64-bit value.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongBulkString;

impl<'a> Encoder<'a, i64> for LongBulkString {
	fn encode(&self, value: i64) -> Result<ByteExpr<'a>, EncodeError> {
		Ok(ByteExpr::arg_marker().append(long_bulk_body(value)))
	}
}

/// `*<count>\r\n`. Carries no arguments of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayHeader;

pub(crate) fn array_header<'a>(count: usize) -> ByteExpr<'a> {
	ByteExpr::constant(ARRAY_MARKER)
		.append(unsigned_expr(count as u64))
		.append_const(CRLF)
}

impl<'a> Encoder<'a, usize> for ArrayHeader {
	fn encode(&self, count: usize) -> Result<ByteExpr<'a>, EncodeError> {
		Ok(array_header(count))
	}
}

impl<'a> Encoder<'a, i64> for ArrayHeader {
	fn encode(&self, count: i64) -> Result<ByteExpr<'a>, EncodeError> {
		Ok(ByteExpr::constant(ARRAY_MARKER)
			.append(signed_expr(count))
			.append_const(CRLF))
	}
}

pub fn decimal() -> Decimal {
	Decimal
}

pub fn int_bulk_string() -> IntBulkString {
	IntBulkString
}

pub fn long_bulk_string() -> LongBulkString {
	LongBulkString
}

/// The array-count header. Use it for the `count` reported by
/// [`ByteExpr::arg_count`] of the arguments that follow.
pub fn array() -> ArrayHeader {
	ArrayHeader
}
