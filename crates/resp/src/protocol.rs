//! Encoders for command arguments.
//!
//! A command is an array of bulk strings. Each argument encoder here emits
//! one bulk string and counts it, so [`command`] can write the array header
//! once all arguments are known.

use crate::charset::Charset;
use crate::charset::with_encoder;
use crate::encoder::Collection;
use crate::encoder::Encoder;
use crate::encoder::EncoderExt;
use crate::encoder::argument;
use crate::encoder::borrowed;
use crate::encoder::collection;
use crate::error::EncodeError;
use crate::expr::ByteExpr;
use crate::numeric::Decimal;
use crate::numeric::IntBulkString;
use crate::numeric::LongBulkString;
use crate::numeric::array_header;
use crate::numeric::decimal;
use crate::utils::CRLF;

/// Length, CRLF and payload of an empty bulk string (the `$` comes from the
/// argument marker).
const EMPTY_BULK_BODY: &[u8] = b"0\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
	/// Payload is the string's own bytes.
	Utf8,
	/// One byte per char: the header is the char count, ASCII input is
	/// written as is.
	SingleByte,
	/// Transcode first, then measure.
	Transcode,
}

/// Encodes `&str` values as bulk strings in a given charset.
#[derive(Debug, Clone, Copy)]
pub struct StrBulkString {
	charset: Charset,
	strategy: Strategy,
}

impl StrBulkString {
	pub fn new(charset: Charset) -> Self {
		let strategy = match charset {
			Charset::Utf8 => Strategy::Utf8,
			c if c.is_single_byte() => Strategy::SingleByte,
			_ => Strategy::Transcode,
		};
		Self { charset, strategy }
	}

	pub fn charset(&self) -> Charset {
		self.charset
	}

	fn body<'a>(len: usize, payload: ByteExpr<'a>) -> Result<ByteExpr<'a>, EncodeError> {
		Ok(<Decimal as Encoder<'a, usize>>::encode(&Decimal, len)?
			.append_const(CRLF)
			.append(payload)
			.append_const(CRLF))
	}

	fn transcode<'a>(&self, value: &str) -> Result<ByteExpr<'a>, EncodeError> {
		let bytes = with_encoder(self.charset, |encoder| encoder.encode(value))?;
		Self::body(bytes.len(), ByteExpr::shared(bytes))
	}
}

impl<'a> Encoder<'a, &'a str> for StrBulkString {
	fn encode(&self, value: &'a str) -> Result<ByteExpr<'a>, EncodeError> {
		let body = if value.is_empty() {
			ByteExpr::constant(EMPTY_BULK_BODY)
		} else {
			match self.strategy {
				Strategy::Utf8 => Self::body(value.len(), ByteExpr::borrowed(value.as_bytes()))?,
				Strategy::SingleByte if value.is_ascii() => {
					Self::body(value.len(), ByteExpr::borrowed(value.as_bytes()))?
				}
				Strategy::SingleByte | Strategy::Transcode => self.transcode(value)?,
			}
		};
		Ok(ByteExpr::arg_marker().append(body))
	}
}

impl<'a> Encoder<'a, &'a String> for StrBulkString {
	fn encode(&self, value: &'a String) -> Result<ByteExpr<'a>, EncodeError> {
		self.encode(value.as_str())
	}
}

/// Bulk strings of characters in `charset`.
pub fn str_bulk_string(charset: Charset) -> StrBulkString {
	StrBulkString::new(charset)
}

/// Bulk strings of raw bytes: `$<len>\r\n<bytes>\r\n`.
pub fn bytes_bulk_string<'a>() -> impl Encoder<'a, &'a [u8]> + Copy {
	argument(
		decimal()
			.map_input(|bytes: &'a [u8]| bytes.len())
			.append(CRLF)
			.zip_with(borrowed()),
	)
	.append(CRLF)
}

/// A sequence of `i32` arguments.
pub fn int_array_arg() -> Collection<IntBulkString> {
	collection(IntBulkString)
}

/// A sequence of `i64` arguments.
pub fn long_array_arg() -> Collection<LongBulkString> {
	collection(LongBulkString)
}

/// A sequence of string arguments in `charset`.
pub fn str_array_arg(charset: Charset) -> Collection<StrBulkString> {
	collection(str_bulk_string(charset))
}

/// Prefix `args` with the array header counting its arguments.
pub fn command(args: ByteExpr<'_>) -> ByteExpr<'_> {
	array_header(args.arg_count()).append(args)
}

/// Encode `words` as a complete command in `charset`.
pub fn command_from_words<'a, I>(charset: Charset, words: I) -> Result<ByteExpr<'a>, EncodeError>
where
	I: IntoIterator<Item = &'a str>,
{
	Ok(command(str_array_arg(charset).encode(words)?))
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;
	use crate::charset::CharsetEncoder;

	fn encode_str(charset: Charset, value: &str) -> Vec<u8> {
		str_bulk_string(charset)
			.encode(value)
			.unwrap()
			.to_bytes()
			.to_vec()
	}

	#[rstest]
	#[case(Charset::Utf8)]
	#[case(Charset::UsAscii)]
	#[case(Charset::Iso8859_1)]
	#[case(Charset::Utf16Be)]
	#[case(Charset::Utf16Le)]
	fn test_empty_string(#[case] charset: Charset) {
		let expr = str_bulk_string(charset).encode("").unwrap();
		assert_eq!(expr.to_bytes(), &b"$0\r\n\r\n"[..]);
		assert_eq!(expr.arg_count(), 1);
	}

	#[test]
	fn test_utf8_is_borrowed() {
		let value = String::from("héllo");
		let expr = str_bulk_string(Charset::Utf8).encode(&value).unwrap();
		assert_eq!(expr.to_bytes(), &b"$6\r\nh\xC3\xA9llo\r\n"[..]);
		assert!(
			expr.spans()
				.any(|span| std::ptr::eq(span.as_ptr(), value.as_ptr()))
		);
	}

	#[test]
	fn test_latin1_header_is_char_count() {
		assert_eq!(encode_str(Charset::Iso8859_1, "café"), b"$4\r\ncaf\xE9\r\n");
		assert_eq!(encode_str(Charset::Iso8859_1, "cafe"), b"$4\r\ncafe\r\n");
	}

	#[test]
	fn test_utf16_header_is_encoded_length() {
		let expected = CharsetEncoder::new(Charset::Utf16Le)
			.encode("a𝄞")
			.unwrap();
		let mut wire = b"$6\r\n".to_vec();
		wire.extend_from_slice(&expected);
		wire.extend_from_slice(b"\r\n");
		assert_eq!(encode_str(Charset::Utf16Le, "a𝄞"), wire);
	}

	#[test]
	fn test_unmappable_fails_whole_value() {
		let err = str_bulk_string(Charset::UsAscii)
			.encode("naïve")
			.unwrap_err();
		assert!(matches!(err, EncodeError::Codec(_)));
	}

	#[test]
	fn test_bytes_bulk_string() {
		let payload = [0u8, 1, 2, 255];
		let expr = bytes_bulk_string().encode(&payload[..]).unwrap();
		assert_eq!(expr.to_bytes(), &b"$4\r\n\x00\x01\x02\xFF\r\n"[..]);
		assert_eq!(expr.arg_count(), 1);
	}

	#[test]
	fn test_command_header_counts_arguments() {
		let args = long_array_arg().encode(vec![1i64, 2, 3]).unwrap();
		let expr = command(args);
		assert_eq!(
			expr.to_bytes(),
			&b"*3\r\n$1\r\n1\r\n$1\r\n2\r\n$1\r\n3\r\n"[..]
		);
	}

	#[test]
	fn test_command_from_words() {
		let expr = command_from_words(Charset::Utf8, ["SET", "key", ""]).unwrap();
		assert_eq!(
			expr.to_bytes(),
			&b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$0\r\n\r\n"[..]
		);
	}

	#[test]
	fn test_int_array_arg() {
		let expr = int_array_arg().encode([i32::MIN, 0]).unwrap();
		assert_eq!(expr.arg_count(), 2);
		assert_eq!(
			expr.to_bytes(),
			&b"$11\r\n-2147483648\r\n$1\r\n0\r\n"[..]
		);
	}
}
