//! # RESP - Redis Serialization Protocol Library
//!
//! Wire-protocol layer for a RESP2 client: composable encoders that build
//! requests without redundant copies, and a resumable parser that reads
//! replies from arbitrarily fragmented input.
//!
//! ## Features
//!
//! - **Lazy encoding**: encoders return a [`ByteExpr`], a list of spans that
//!   borrow constants and caller data until it is written out
//! - **Charset aware**: string arguments in UTF-8, ASCII, Latin-1 or UTF-16,
//!   with the length header always matching the encoded payload
//! - **Streaming parser**: suspends between any two bytes and resumes where
//!   it stopped; bulk strings are streamed into a pluggable builder
//! - **No I/O**: the transport stays with the caller
//!
//! ## Example
//!
//! ```rust
//! use bytes::BytesMut;
//! use resp::Charset;
//! use resp::CharsetDecoder;
//! use resp::Encoder;
//! use resp::RespParseResult;
//!
//! // Encode a command
//! let args = resp::str_array_arg(Charset::Utf8).encode(["GET", "key"]).unwrap();
//! let request = resp::command(args);
//! assert_eq!(request.to_bytes(), &b"*2\r\n$3\r\nGET\r\n$3\r\nkey\r\n"[..]);
//!
//! // Parse a reply delivered in two pieces
//! let mut parser = resp::bulk_string_reply(resp::StringFactory::new());
//! let mut decoder = CharsetDecoder::new(Charset::Utf8);
//! let mut buf = BytesMut::from(&b"$5\r\nhel"[..]);
//! assert!(parser.next_reply(&mut buf, &mut decoder).is_incomplete());
//! buf.extend_from_slice(b"lo\r\n");
//! match parser.next_reply(&mut buf, &mut decoder) {
//! 	RespParseResult::Complete(reply) => assert_eq!(reply, Ok(Some("hello".to_string()))),
//! 	other => panic!("unexpected {:?}", other),
//! }
//! ```

mod builder;
mod charset;
mod encoder;
mod error;
mod expr;
mod numeric;
mod parser;
mod protocol;
mod types;
mod utils;

pub use builder::BulkOutput;
pub use builder::BulkStringBuilder;
pub use builder::BulkStringBuilderFactory;
pub use builder::BytesFactory;
pub use builder::DEFAULT_MAX_BULK_LEN;
pub use builder::DecimalFactory;
pub use builder::NoBulkStrings;
pub use builder::StringFactory;
pub use charset::Charset;
pub use charset::CharsetDecoder;
pub use charset::CharsetEncoder;
pub use charset::CodecCache;
pub use charset::with_encoder;
pub use encoder::Encoder;
pub use encoder::EncoderExt;
pub use encoder::argument;
pub use encoder::borrowed;
pub use encoder::choice;
pub use encoder::choice_const;
pub use encoder::collection;
pub use encoder::constant;
pub use encoder::pair;
pub use encoder::prefix;
pub use error::CodecError;
pub use error::EncodeError;
pub use error::ParseError;
pub use error::RespError;
pub use error::ServerError;
pub use expr::ByteExpr;
pub use expr::COMPACT_SPAN_LIMIT;
pub use numeric::array;
pub use numeric::decimal;
pub use numeric::int_bulk_string;
pub use numeric::long_bulk_string;
pub use numeric::to_ascii;
pub use parser::AnyReply;
pub use parser::ArrayReply;
pub use parser::BulkStringReply;
pub use parser::FailureHandler;
pub use parser::IntegerReply;
pub use parser::LongReply;
pub use parser::ReplyKind;
pub use parser::ReplyParser;
pub use parser::RespParseResult;
pub use parser::SimpleStringReply;
pub use parser::any_reply;
pub use parser::array_reply;
pub use parser::bulk_string_reply;
pub use parser::integer_reply;
pub use parser::long_reply;
pub use parser::parse;
pub use parser::simple_string_reply;
pub use protocol::StrBulkString;
pub use protocol::bytes_bulk_string;
pub use protocol::command;
pub use protocol::command_from_words;
pub use protocol::int_array_arg;
pub use protocol::long_array_arg;
pub use protocol::str_array_arg;
pub use protocol::str_bulk_string;
pub use types::RespValue;

/// Combinator and encoder types, for naming them in signatures.
pub mod encoders {
	pub use crate::encoder::Append;
	pub use crate::encoder::Argument;
	pub use crate::encoder::Borrowed;
	pub use crate::encoder::Choice;
	pub use crate::encoder::ChoiceConst;
	pub use crate::encoder::Collection;
	pub use crate::encoder::Compacted;
	pub use crate::encoder::Constant;
	pub use crate::encoder::Map;
	pub use crate::encoder::Pair;
	pub use crate::encoder::Prefix;
	pub use crate::encoder::Zip;
	pub use crate::numeric::ArrayHeader;
	pub use crate::numeric::AsciiDecimal;
	pub use crate::numeric::Decimal;
	pub use crate::numeric::IntBulkString;
	pub use crate::numeric::LongBulkString;
}
