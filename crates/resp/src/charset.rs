//! Character set codecs used for bulk string payloads.
//!
//! Encoders and decoders are stateful and reused: an encoder keeps its
//! scratch buffer between calls, a decoder keeps the bytes of an unfinished
//! character between the chunks of one payload. Neither is ever shared
//! between threads. A [`CodecCache`] hands out one instance per charset to
//! its owner, and [`with_encoder`] does the same for the current thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

use crate::error::CodecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
	UsAscii,
	Iso8859_1,
	Utf8,
	Utf16Be,
	Utf16Le,
}

impl Charset {
	pub fn name(self) -> &'static str {
		match self {
			Charset::UsAscii => "US-ASCII",
			Charset::Iso8859_1 => "ISO-8859-1",
			Charset::Utf8 => "UTF-8",
			Charset::Utf16Be => "UTF-16BE",
			Charset::Utf16Le => "UTF-16LE",
		}
	}

	pub fn max_bytes_per_char(self) -> usize {
		match self {
			Charset::UsAscii | Charset::Iso8859_1 => 1,
			Charset::Utf8 | Charset::Utf16Be | Charset::Utf16Le => 4,
		}
	}

	/// Every character is exactly one byte, so a string's encoded length is
	/// its char count.
	pub fn is_single_byte(self) -> bool {
		matches!(self, Charset::UsAscii | Charset::Iso8859_1)
	}

	fn max_char(self) -> u32 {
		match self {
			Charset::UsAscii => 0x7F,
			Charset::Iso8859_1 => 0xFF,
			_ => u32::from(char::MAX),
		}
	}
}

impl fmt::Display for Charset {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for Charset {
	type Err = CodecError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"utf-8" | "utf8" => Ok(Charset::Utf8),
			"ascii" | "us-ascii" => Ok(Charset::UsAscii),
			"latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" => Ok(Charset::Iso8859_1),
			"utf-16be" | "utf16be" => Ok(Charset::Utf16Be),
			"utf-16le" | "utf16le" => Ok(Charset::Utf16Le),
			_ => Err(CodecError::UnsupportedCharset(s.to_string())),
		}
	}
}

/// Transcodes strings into one charset, reusing a scratch buffer.
#[derive(Debug)]
pub struct CharsetEncoder {
	charset: Charset,
	scratch: BytesMut,
}

impl CharsetEncoder {
	pub fn new(charset: Charset) -> Self {
		Self {
			charset,
			scratch: BytesMut::new(),
		}
	}

	pub fn charset(&self) -> Charset {
		self.charset
	}

	/// Encode `s`. On failure nothing is returned and the scratch buffer is
	/// left empty.
	pub fn encode(&mut self, s: &str) -> Result<Bytes, CodecError> {
		let chars = s.chars().count();
		self.scratch.clear();
		self.scratch
			.reserve(chars * self.charset.max_bytes_per_char());

		if let Err(e) = self.encode_into_scratch(s) {
			self.scratch.clear();
			return Err(e);
		}
		Ok(self.scratch.split().freeze())
	}

	fn encode_into_scratch(&mut self, s: &str) -> Result<(), CodecError> {
		match self.charset {
			Charset::Utf8 => self.scratch.put_slice(s.as_bytes()),
			Charset::UsAscii | Charset::Iso8859_1 => {
				let max = self.charset.max_char();
				for (index, ch) in s.chars().enumerate() {
					let code = u32::from(ch);
					if code > max {
						return Err(CodecError::Unmappable {
							charset: self.charset,
							ch,
							index,
						});
					}
					self.scratch.put_u8(code as u8);
				}
			}
			Charset::Utf16Be => {
				for unit in s.encode_utf16() {
					self.scratch.put_u16(unit);
				}
			}
			Charset::Utf16Le => {
				for unit in s.encode_utf16() {
					self.scratch.put_u16_le(unit);
				}
			}
		}
		Ok(())
	}
}

/// Incremental decoder for payloads that arrive in several chunks.
///
/// Bytes of a character split across chunks are held back until the rest
/// arrives. [`CharsetDecoder::finish`] reports anything still held back.
#[derive(Debug)]
pub struct CharsetDecoder {
	charset: Charset,
	pending: [u8; 4],
	pending_len: usize,
	/// Bytes consumed since the last reset, for error offsets.
	consumed: usize,
}

impl CharsetDecoder {
	pub fn new(charset: Charset) -> Self {
		Self {
			charset,
			pending: [0; 4],
			pending_len: 0,
			consumed: 0,
		}
	}

	pub fn charset(&self) -> Charset {
		self.charset
	}

	pub fn has_pending(&self) -> bool {
		self.pending_len > 0
	}

	pub fn reset(&mut self) {
		self.pending_len = 0;
		self.consumed = 0;
	}

	/// Decode `input`, appending complete characters to `out`.
	pub fn decode(&mut self, input: &[u8], out: &mut String) -> Result<(), CodecError> {
		let result = match self.charset {
			Charset::Utf8 => self.decode_utf8(input, out),
			Charset::UsAscii => self.decode_ascii(input, out),
			Charset::Iso8859_1 => {
				out.extend(input.iter().map(|&b| char::from(b)));
				Ok(())
			}
			Charset::Utf16Be | Charset::Utf16Le => self.decode_utf16(input, out),
		};
		self.consumed += input.len();
		if result.is_err() {
			self.pending_len = 0;
		}
		result
	}

	/// End of payload. Fails if a partial character is still held back, and
	/// leaves the decoder ready for the next payload either way.
	pub fn finish(&mut self) -> Result<(), CodecError> {
		let pending = self.pending_len;
		self.reset();
		if pending > 0 {
			return Err(CodecError::Truncated {
				charset: self.charset,
				pending,
			});
		}
		Ok(())
	}

	fn malformed(&self, offset: usize) -> CodecError {
		CodecError::Malformed {
			charset: self.charset,
			offset: self.consumed + offset,
		}
	}

	fn decode_ascii(&mut self, input: &[u8], out: &mut String) -> Result<(), CodecError> {
		if let Some(offset) = input.iter().position(|b| !b.is_ascii()) {
			return Err(self.malformed(offset));
		}
		out.extend(input.iter().map(|&b| char::from(b)));
		Ok(())
	}

	fn decode_utf8(&mut self, mut input: &[u8], out: &mut String) -> Result<(), CodecError> {
		let mut skipped = 0;
		// Complete a character left over from the previous chunk first.
		if self.pending_len > 0 {
			let need = utf8_width(self.pending[0]).saturating_sub(self.pending_len);
			let take = need.min(input.len());
			self.pending[self.pending_len..self.pending_len + take].copy_from_slice(&input[..take]);
			self.pending_len += take;
			input = &input[take..];
			skipped = take;
			if take < need {
				return Ok(());
			}
			match std::str::from_utf8(&self.pending[..self.pending_len]) {
				Ok(s) => out.push_str(s),
				Err(_) => return Err(self.malformed(0)),
			}
			self.pending_len = 0;
		}

		match std::str::from_utf8(input) {
			Ok(s) => out.push_str(s),
			Err(e) => {
				let valid = e.valid_up_to();
				// Validated prefix: the lossy conversion borrows it unchanged.
				out.push_str(&String::from_utf8_lossy(&input[..valid]));
				match e.error_len() {
					Some(_) => return Err(self.malformed(skipped + valid)),
					None => {
						let rest = &input[valid..];
						self.pending[..rest.len()].copy_from_slice(rest);
						self.pending_len = rest.len();
					}
				}
			}
		}
		Ok(())
	}

	fn decode_utf16(&mut self, input: &[u8], out: &mut String) -> Result<(), CodecError> {
		let big_endian = self.charset == Charset::Utf16Be;
		for (offset, &byte) in input.iter().enumerate() {
			self.pending[self.pending_len] = byte;
			self.pending_len += 1;

			match self.pending_len {
				2 => {
					let unit = utf16_unit(self.pending[0], self.pending[1], big_endian);
					if (0xD800..0xDC00).contains(&unit) {
						// High surrogate: wait for its pair.
						continue;
					}
					if (0xDC00..0xE000).contains(&unit) {
						return Err(self.malformed(offset));
					}
					self.pending_len = 0;
					match char::from_u32(u32::from(unit)) {
						Some(ch) => out.push(ch),
						None => return Err(self.malformed(offset)),
					}
				}
				4 => {
					let high = utf16_unit(self.pending[0], self.pending[1], big_endian);
					let low = utf16_unit(self.pending[2], self.pending[3], big_endian);
					self.pending_len = 0;
					match char::decode_utf16([high, low]).next() {
						Some(Ok(ch)) => out.push(ch),
						_ => return Err(self.malformed(offset)),
					}
				}
				_ => {}
			}
		}
		Ok(())
	}
}

#[inline]
fn utf16_unit(a: u8, b: u8, big_endian: bool) -> u16 {
	if big_endian {
		u16::from_be_bytes([a, b])
	} else {
		u16::from_le_bytes([a, b])
	}
}

/// Width of the UTF-8 sequence introduced by `lead`. Invalid lead bytes
/// report 1 so that validation rejects them.
#[inline]
fn utf8_width(lead: u8) -> usize {
	match lead {
		0x00..=0x7F => 1,
		0xC2..=0xDF => 2,
		0xE0..=0xEF => 3,
		0xF0..=0xF4 => 4,
		_ => 1,
	}
}

/// Codecs keyed by charset, created on first use and owned by one worker.
#[derive(Debug, Default)]
pub struct CodecCache {
	encoders: HashMap<Charset, CharsetEncoder>,
	decoders: HashMap<Charset, CharsetDecoder>,
}

impl CodecCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn encoder(&mut self, charset: Charset) -> &mut CharsetEncoder {
		self.encoders.entry(charset).or_insert_with(|| {
			log::trace!("creating {} encoder", charset);
			CharsetEncoder::new(charset)
		})
	}

	pub fn decoder(&mut self, charset: Charset) -> &mut CharsetDecoder {
		self.decoders.entry(charset).or_insert_with(|| {
			log::trace!("creating {} decoder", charset);
			CharsetDecoder::new(charset)
		})
	}

	pub fn len(&self) -> usize {
		self.encoders.len() + self.decoders.len()
	}

	pub fn is_empty(&self) -> bool {
		self.encoders.is_empty() && self.decoders.is_empty()
	}
}

thread_local! {
	static CODECS: RefCell<CodecCache> = RefCell::new(CodecCache::new());
}

/// Run `f` with this thread's encoder for `charset`.
///
/// `f` must not call back into `with_encoder`.
pub fn with_encoder<R>(charset: Charset, f: impl FnOnce(&mut CharsetEncoder) -> R) -> R {
	CODECS.with(|codecs| f(codecs.borrow_mut().encoder(charset)))
}
