//! Sinks for bulk string payloads.
//!
//! The parser never buffers a whole bulk string itself. When it reads a
//! length header it asks a [`BulkStringBuilderFactory`] for a builder sized
//! for that length, then feeds it the payload in whatever chunks the
//! transport delivers.

use std::convert::Infallible;

use bytes::Bytes;
use bytes::BytesMut;

use crate::charset::CharsetDecoder;
use crate::error::ParseError;
use crate::numeric::DecimalAccumulator;

/// Largest bulk string a factory accepts unless told otherwise (512 MiB,
/// the protocol's own limit).
pub const DEFAULT_MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Most a builder reserves before payload arrives; the rest grows on append.
pub(crate) const MAX_PREALLOC_BYTES: usize = 64 * 1024;

/// Accumulates the payload of one bulk string.
pub trait BulkStringBuilder {
	type Output;

	/// Consume the next chunk of payload bytes.
	fn append(&mut self, chunk: &[u8], decoder: &mut CharsetDecoder) -> Result<(), ParseError>;

	/// The payload is complete.
	fn finish(self, decoder: &mut CharsetDecoder) -> Result<Self::Output, ParseError>;
}

/// Creates a builder for each bulk string of a reply.
///
/// `create` is never called for a null bulk string (`$-1`).
pub trait BulkStringBuilderFactory {
	type Builder: BulkStringBuilder;

	fn create(&self, len: usize, decoder: &mut CharsetDecoder) -> Result<Self::Builder, ParseError>;
}

impl<F: BulkStringBuilderFactory + ?Sized> BulkStringBuilderFactory for &F {
	type Builder = F::Builder;

	fn create(&self, len: usize, decoder: &mut CharsetDecoder) -> Result<Self::Builder, ParseError> {
		(**self).create(len, decoder)
	}
}

/// Bulk string type produced by a factory.
pub type BulkOutput<F> = <<F as BulkStringBuilderFactory>::Builder as BulkStringBuilder>::Output;

fn check_len(len: usize, max: usize) -> Result<(), ParseError> {
	if len > max {
		return Err(ParseError::BulkStringTooLarge { len, max });
	}
	Ok(())
}

/// Collects raw payload bytes.
#[derive(Debug, Clone, Copy)]
pub struct BytesFactory {
	max_len: usize,
}

impl BytesFactory {
	pub fn new() -> Self {
		Self::with_max_len(DEFAULT_MAX_BULK_LEN)
	}

	pub fn with_max_len(max_len: usize) -> Self {
		Self { max_len }
	}
}

impl Default for BytesFactory {
	fn default() -> Self {
		Self::new()
	}
}

#[derive(Debug)]
pub struct BytesBuilder {
	buf: BytesMut,
}

impl BulkStringBuilder for BytesBuilder {
	type Output = Bytes;

	fn append(&mut self, chunk: &[u8], _decoder: &mut CharsetDecoder) -> Result<(), ParseError> {
		self.buf.extend_from_slice(chunk);
		Ok(())
	}

	fn finish(self, _decoder: &mut CharsetDecoder) -> Result<Bytes, ParseError> {
		Ok(self.buf.freeze())
	}
}

impl BulkStringBuilderFactory for BytesFactory {
	type Builder = BytesBuilder;

	fn create(&self, len: usize, _decoder: &mut CharsetDecoder) -> Result<BytesBuilder, ParseError> {
		check_len(len, self.max_len)?;
		Ok(BytesBuilder {
			buf: BytesMut::with_capacity(len.min(MAX_PREALLOC_BYTES)),
		})
	}
}

/// Decodes payloads to `String` with the parser's charset decoder.
#[derive(Debug, Clone, Copy)]
pub struct StringFactory {
	max_len: usize,
}

impl StringFactory {
	pub fn new() -> Self {
		Self::with_max_len(DEFAULT_MAX_BULK_LEN)
	}

	pub fn with_max_len(max_len: usize) -> Self {
		Self { max_len }
	}
}

impl Default for StringFactory {
	fn default() -> Self {
		Self::new()
	}
}

#[derive(Debug)]
pub struct StringBuilder {
	out: String,
}

impl BulkStringBuilder for StringBuilder {
	type Output = String;

	fn append(&mut self, chunk: &[u8], decoder: &mut CharsetDecoder) -> Result<(), ParseError> {
		decoder.decode(chunk, &mut self.out)?;
		Ok(())
	}

	fn finish(self, decoder: &mut CharsetDecoder) -> Result<String, ParseError> {
		decoder.finish()?;
		Ok(self.out)
	}
}

impl BulkStringBuilderFactory for StringFactory {
	type Builder = StringBuilder;

	fn create(&self, len: usize, decoder: &mut CharsetDecoder) -> Result<StringBuilder, ParseError> {
		check_len(len, self.max_len)?;
		decoder.reset();
		Ok(StringBuilder {
			// Decoded length differs from `len` outside UTF-8.
			out: String::with_capacity(len.min(MAX_PREALLOC_BYTES)),
		})
	}
}

/// Reads a bulk string holding a signed decimal, as written by the numeric
/// bulk string encoders.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalFactory;

#[derive(Debug, Default)]
pub struct DecimalBuilder {
	acc: DecimalAccumulator,
}

impl BulkStringBuilder for DecimalBuilder {
	type Output = i64;

	fn append(&mut self, chunk: &[u8], _decoder: &mut CharsetDecoder) -> Result<(), ParseError> {
		chunk.iter().try_for_each(|&b| self.acc.push(b))
	}

	fn finish(self, _decoder: &mut CharsetDecoder) -> Result<i64, ParseError> {
		self.acc.finish()
	}
}

impl BulkStringBuilderFactory for DecimalFactory {
	type Builder = DecimalBuilder;

	fn create(&self, len: usize, _decoder: &mut CharsetDecoder) -> Result<DecimalBuilder, ParseError> {
		// Sign plus 19 digits.
		check_len(len, 20)?;
		Ok(DecimalBuilder::default())
	}
}

/// For reply kinds that never carry a bulk string. Reaching `create` means
/// the parser was handed a reply it should have rejected first.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBulkStrings;

impl BulkStringBuilder for Infallible {
	type Output = Infallible;

	fn append(&mut self, _chunk: &[u8], _decoder: &mut CharsetDecoder) -> Result<(), ParseError> {
		match *self {}
	}

	fn finish(self, _decoder: &mut CharsetDecoder) -> Result<Infallible, ParseError> {
		match self {}
	}
}

impl BulkStringBuilderFactory for NoBulkStrings {
	type Builder = Infallible;

	fn create(&self, _len: usize, _decoder: &mut CharsetDecoder) -> Result<Infallible, ParseError> {
		Err(ParseError::UnexpectedReplyType('$'))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::charset::Charset;

	#[test]
	fn test_bytes_builder_collects_chunks() {
		let mut decoder = CharsetDecoder::new(Charset::Utf8);
		let mut builder = BytesFactory::new().create(5, &mut decoder).unwrap();
		builder.append(b"he", &mut decoder).unwrap();
		builder.append(b"llo", &mut decoder).unwrap();
		assert_eq!(builder.finish(&mut decoder).unwrap(), Bytes::from_static(b"hello"));
	}

	#[test]
	fn test_string_builder_decodes_split_character() {
		let mut decoder = CharsetDecoder::new(Charset::Utf8);
		let bytes = "€uro".as_bytes();
		let mut builder = StringFactory::new()
			.create(bytes.len(), &mut decoder)
			.unwrap();
		builder.append(&bytes[..1], &mut decoder).unwrap();
		builder.append(&bytes[1..], &mut decoder).unwrap();
		assert_eq!(builder.finish(&mut decoder).unwrap(), "€uro");
	}

	#[test]
	fn test_string_builder_truncated_payload() {
		let mut decoder = CharsetDecoder::new(Charset::Utf8);
		let mut builder = StringFactory::new().create(2, &mut decoder).unwrap();
		builder.append(&"€".as_bytes()[..2], &mut decoder).unwrap();
		assert!(matches!(
			builder.finish(&mut decoder),
			Err(ParseError::Codec(_))
		));
	}

	#[test]
	fn test_declared_length_is_not_reserved_up_front() {
		let mut decoder = CharsetDecoder::new(Charset::Utf8);
		let len = DEFAULT_MAX_BULK_LEN - 1;

		let mut bytes = BytesFactory::new().create(len, &mut decoder).unwrap();
		assert!(bytes.buf.capacity() <= MAX_PREALLOC_BYTES);
		let strings = StringFactory::new().create(len, &mut decoder).unwrap();
		assert!(strings.out.capacity() <= MAX_PREALLOC_BYTES);

		// Small payloads still get their exact size.
		let small = BytesFactory::new().create(16, &mut decoder).unwrap();
		assert!(small.buf.capacity() >= 16);

		// Growth past the initial reservation works.
		let chunk = vec![b'x'; MAX_PREALLOC_BYTES + 1];
		bytes.append(&chunk, &mut decoder).unwrap();
		assert_eq!(bytes.finish(&mut decoder).unwrap().len(), chunk.len());
	}

	#[test]
	fn test_limit_is_enforced() {
		let mut decoder = CharsetDecoder::new(Charset::Utf8);
		let err = BytesFactory::with_max_len(4)
			.create(5, &mut decoder)
			.unwrap_err();
		assert_eq!(err, ParseError::BulkStringTooLarge { len: 5, max: 4 });
		assert!(BytesFactory::with_max_len(4).create(4, &mut decoder).is_ok());
	}

	#[test]
	fn test_decimal_builder() {
		let mut decoder = CharsetDecoder::new(Charset::Utf8);
		let mut builder = DecimalFactory.create(3, &mut decoder).unwrap();
		builder.append(b"-4", &mut decoder).unwrap();
		builder.append(b"2", &mut decoder).unwrap();
		assert_eq!(builder.finish(&mut decoder).unwrap(), -42);

		assert!(DecimalFactory.create(21, &mut decoder).is_err());
	}

	#[test]
	fn test_no_bulk_strings_refuses() {
		let mut decoder = CharsetDecoder::new(Charset::Utf8);
		assert!(NoBulkStrings.create(0, &mut decoder).is_err());
	}
}
