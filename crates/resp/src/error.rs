//! Error types for RESP parsing and encoding.

use thiserror::Error;

use crate::charset::Charset;

/// Main error type for RESP operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RespError {
	/// Error during parsing
	#[error("Parse error: {0}")]
	Parse(#[from] ParseError),

	/// Error during encoding
	#[error("Encode error: {0}")]
	Encode(#[from] EncodeError),
}

/// Errors that can occur during RESP parsing.
///
/// Every variant except [`ParseError::BulkStringTooLarge`] and
/// [`ParseError::Codec`] means the byte stream is corrupted; the connection
/// that produced it cannot be resynchronised.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
	/// Unexpected end of input while parsing
	#[error("Unexpected end of input")]
	UnexpectedEOF,

	/// Invalid type marker encountered
	#[error("Invalid type marker: {0:?}")]
	InvalidTypeMarker(char),

	/// A well-formed reply of a kind the parser was not asked for
	#[error("Unexpected reply type: {0:?}")]
	UnexpectedReplyType(char),

	/// Invalid format for the current type
	#[error("Invalid format: {0}")]
	InvalidFormat(String),

	/// Invalid integer value
	#[error("Invalid integer: {0}")]
	InvalidInteger(String),

	/// Invalid bulk string length
	#[error("Invalid bulk string length: {0}")]
	InvalidBulkStringLength(i64),

	/// Invalid array length
	#[error("Invalid array length: {0}")]
	InvalidArrayLength(i64),

	/// A record was not closed by CRLF
	#[error("Missing CRLF terminator, found byte 0x{0:02X}")]
	MissingTerminator(u8),

	/// Declared bulk string length refused by the builder factory
	#[error("Bulk string of {len} bytes exceeds the limit of {max} bytes")]
	BulkStringTooLarge { len: usize, max: usize },

	/// Bulk string payload could not be decoded
	#[error("Decoding error: {0}")]
	Codec(#[from] CodecError),
}

/// Errors that can occur during RESP encoding.
///
/// An encoder that fails returns no expression at all, so nothing partially
/// built can reach the transport.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
	/// The value could not be represented in the target charset
	#[error("Encoding error: {0}")]
	Codec(#[from] CodecError),
}

/// Failures of a [`CharsetEncoder`](crate::CharsetEncoder) or
/// [`CharsetDecoder`](crate::CharsetDecoder).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
	/// Character has no representation in the charset
	#[error("{ch:?} at index {index} cannot be encoded as {charset}")]
	Unmappable {
		charset: Charset,
		ch: char,
		index: usize,
	},

	/// Input bytes are not a valid sequence in the charset
	#[error("malformed {charset} input at byte {offset}")]
	Malformed { charset: Charset, offset: usize },

	/// Input ended in the middle of a multi-byte sequence
	#[error("{charset} input truncated with {pending} byte(s) pending")]
	Truncated { charset: Charset, pending: usize },

	/// Charset label is not supported
	#[error("unsupported charset: {0}")]
	UnsupportedCharset(String),
}

/// A protocol-level error reply (`-<message>\r\n`) turned into an error value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ServerError(pub String);

impl ServerError {
	/// The message exactly as sent by the server.
	pub fn message(&self) -> &str {
		&self.0
	}
}

impl From<std::num::TryFromIntError> for ParseError {
	fn from(e: std::num::TryFromIntError) -> Self {
		ParseError::InvalidInteger(e.to_string())
	}
}
