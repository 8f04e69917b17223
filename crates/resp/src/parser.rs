//! Resumable RESP2 reply parser.
//!
//! The parser is fed whatever bytes the transport has delivered so far and
//! consumes exactly the bytes of one reply. When the input runs out in the
//! middle of a reply it returns [`RespParseResult::Incomplete`] and keeps its
//! position, so the next call continues with the very next byte, whether
//! that falls inside a number, a payload or between the CR and LF of a
//! terminator.

use bytes::Buf;
use bytes::Bytes;
use bytes::BytesMut;
use memchr::memchr;

use crate::builder::BulkOutput;
use crate::builder::BulkStringBuilder;
use crate::builder::BulkStringBuilderFactory;
use crate::builder::BytesFactory;
use crate::builder::NoBulkStrings;
use crate::charset::Charset;
use crate::charset::CharsetDecoder;
use crate::error::ParseError;
use crate::error::RespError;
use crate::error::ServerError;
use crate::numeric::DecimalAccumulator;
use crate::types::RespValue;
use crate::utils::*;

/// Upper bound on the element capacity reserved up front for an array,
/// whatever count the header declares.
const MAX_PREALLOC: usize = 1024;

/// Result of a parsing attempt.
#[derive(Debug)]
pub enum RespParseResult<T> {
	/// A complete reply was parsed and handed to the success or failure path.
	Complete(T),
	/// The input ended before the reply did. Call again with more bytes.
	Incomplete,
	/// The stream is corrupted. The parser has discarded its state and the
	/// connection that produced the bytes cannot be used any further.
	Error(RespError),
}

impl<T> RespParseResult<T> {
	pub fn is_incomplete(&self) -> bool {
		matches!(self, RespParseResult::Incomplete)
	}
}

/// Turns the message of a `-` reply into the caller's result type.
pub trait FailureHandler<T> {
	fn on_failure(&mut self, message: String) -> T;
}

impl<T, F> FailureHandler<T> for F
where
	F: FnMut(String) -> T,
{
	fn on_failure(&mut self, message: String) -> T {
		self(message)
	}
}

/// The replies a parser accepts at top level and what it makes of them.
///
/// Arrays may nest replies of every type regardless of the kind.
pub trait ReplyKind<B> {
	type Output;

	/// Whether a top-level reply starting with `marker` is acceptable.
	/// Error replies are always accepted and never reach [`convert`](Self::convert).
	fn accepts(&self, marker: u8) -> bool;

	fn convert(&self, value: RespValue<B>) -> Result<Self::Output, ParseError>;
}

fn mismatch<B>(value: &RespValue<B>) -> ParseError {
	let kind = match value {
		RespValue::SimpleString(_) => "simple string",
		RespValue::Error(_) => "error",
		RespValue::Integer(_) => "integer",
		RespValue::BulkString(_) => "bulk string",
		RespValue::Array(_) => "array",
		RespValue::Null => "null",
	};
	ParseError::InvalidFormat(format!("unexpected {} reply", kind))
}

/// `:` replies that fit in 32 bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerReply;

impl<B> ReplyKind<B> for IntegerReply {
	type Output = i32;

	fn accepts(&self, marker: u8) -> bool {
		marker == INTEGER
	}

	fn convert(&self, value: RespValue<B>) -> Result<i32, ParseError> {
		match value {
			RespValue::Integer(n) => Ok(i32::try_from(n)?),
			other => Err(mismatch(&other)),
		}
	}
}

/// `:` replies.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongReply;

impl<B> ReplyKind<B> for LongReply {
	type Output = i64;

	fn accepts(&self, marker: u8) -> bool {
		marker == INTEGER
	}

	fn convert(&self, value: RespValue<B>) -> Result<i64, ParseError> {
		match value {
			RespValue::Integer(n) => Ok(n),
			other => Err(mismatch(&other)),
		}
	}
}

/// `+` replies.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleStringReply;

impl<B> ReplyKind<B> for SimpleStringReply {
	type Output = String;

	fn accepts(&self, marker: u8) -> bool {
		marker == SIMPLE_STRING
	}

	fn convert(&self, value: RespValue<B>) -> Result<String, ParseError> {
		match value {
			RespValue::SimpleString(s) => Ok(s),
			other => Err(mismatch(&other)),
		}
	}
}

/// `$` replies; `None` for the null bulk string.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkStringReply;

impl<B> ReplyKind<B> for BulkStringReply {
	type Output = Option<B>;

	fn accepts(&self, marker: u8) -> bool {
		marker == BULK_STRING
	}

	fn convert(&self, value: RespValue<B>) -> Result<Option<B>, ParseError> {
		match value {
			RespValue::BulkString(b) => Ok(Some(b)),
			RespValue::Null => Ok(None),
			other => Err(mismatch(&other)),
		}
	}
}

/// `*` replies; `None` for the null array.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayReply;

impl<B> ReplyKind<B> for ArrayReply {
	type Output = Option<Vec<RespValue<B>>>;

	fn accepts(&self, marker: u8) -> bool {
		marker == ARRAY
	}

	fn convert(&self, value: RespValue<B>) -> Result<Self::Output, ParseError> {
		match value {
			RespValue::Array(items) => Ok(Some(items)),
			RespValue::Null => Ok(None),
			other => Err(mismatch(&other)),
		}
	}
}

/// Any reply at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyReply;

impl<B> ReplyKind<B> for AnyReply {
	type Output = RespValue<B>;

	fn accepts(&self, marker: u8) -> bool {
		is_valid_type_marker(marker)
	}

	fn convert(&self, value: RespValue<B>) -> Result<RespValue<B>, ParseError> {
		Ok(value)
	}
}

/// What a decimal header is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
	Integer,
	BulkLength,
	ArrayLength,
}

#[derive(Debug)]
enum State {
	Marker,
	Line {
		error: bool,
		buf: Vec<u8>,
		cr: bool,
	},
	Decimal {
		target: Target,
		acc: DecimalAccumulator,
		cr: bool,
	},
	Payload {
		remaining: usize,
	},
	Terminator {
		cr: bool,
	},
}

#[derive(Debug)]
struct Frame<B> {
	remaining: usize,
	elements: Vec<RespValue<B>>,
}

/// A finished top-level reply.
enum Done<B> {
	Value(RespValue<B>),
	Failure(String),
}

/// A stateful reply parser that supports streaming.
///
/// `K` decides which replies are acceptable and what they become, `F`
/// creates the sinks for bulk string payloads.
pub struct ReplyParser<K, F: BulkStringBuilderFactory> {
	kind: K,
	factory: F,
	state: State,
	builder: Option<F::Builder>,
	frames: Vec<Frame<BulkOutput<F>>>,
}

impl<K, F> ReplyParser<K, F>
where
	K: ReplyKind<BulkOutput<F>>,
	F: BulkStringBuilderFactory,
{
	pub fn new(kind: K, factory: F) -> Self {
		Self {
			kind,
			factory,
			state: State::Marker,
			builder: None,
			frames: Vec::new(),
		}
	}

	/// True when no reply is partially parsed.
	pub fn is_idle(&self) -> bool {
		matches!(self.state, State::Marker) && self.frames.is_empty()
	}

	/// Discard any partially parsed reply.
	pub fn reset(&mut self) {
		self.state = State::Marker;
		self.builder = None;
		self.frames.clear();
	}

	/// Parse one reply from `buf`.
	///
	/// A complete reply is passed to `on_success` after conversion, except a
	/// top-level error reply whose message goes to `on_failure` instead.
	/// Exactly the bytes of the reply are consumed; anything after it is
	/// left in `buf`. On [`RespParseResult::Incomplete`] all of `buf` has been
	/// consumed and the parser remembers where it stopped.
	pub fn parse<Bf, U, S, H>(
		&mut self,
		buf: &mut Bf,
		decoder: &mut CharsetDecoder,
		on_success: S,
		mut on_failure: H,
	) -> RespParseResult<U>
	where
		Bf: Buf,
		S: FnOnce(K::Output) -> U,
		H: FailureHandler<U>,
	{
		loop {
			if !buf.has_remaining() {
				return RespParseResult::Incomplete;
			}

			let step = self.step(buf.chunk(), decoder);
			match step {
				Ok((consumed, done)) => {
					buf.advance(consumed);
					match done {
						None => continue,
						Some(Done::Value(value)) => {
							return match self.kind.convert(value) {
								Ok(output) => RespParseResult::Complete(on_success(output)),
								Err(e) => RespParseResult::Error(RespError::Parse(e)),
							};
						}
						Some(Done::Failure(message)) => {
							return RespParseResult::Complete(on_failure.on_failure(message));
						}
					}
				}
				Err(e) => {
					log::debug!("discarding reply parser state: {}", e);
					self.reset();
					return RespParseResult::Error(RespError::Parse(e));
				}
			}
		}
	}

	/// Parse one reply, surfacing a server error reply as [`ServerError`].
	pub fn next_reply<Bf: Buf>(
		&mut self,
		buf: &mut Bf,
		decoder: &mut CharsetDecoder,
	) -> RespParseResult<Result<K::Output, ServerError>> {
		self.parse(buf, decoder, Ok, |message| Err(ServerError(message)))
	}

	/// Advance through `chunk` until a top-level reply completes or the chunk
	/// is exhausted. Returns the number of bytes consumed.
	fn step(
		&mut self,
		chunk: &[u8],
		decoder: &mut CharsetDecoder,
	) -> Result<(usize, Option<Done<BulkOutput<F>>>), ParseError> {
		let mut pos = 0;
		while pos < chunk.len() {
			let done = match &mut self.state {
				State::Marker => {
					let marker = chunk[pos];
					pos += 1;
					self.start(marker)?;
					None
				}
				State::Line { error, buf, cr } => match scan_line(buf, cr, chunk, &mut pos) {
					Some(line) => {
						let error = *error;
						self.finish_line(error, line)
					}
					None => None,
				},
				State::Decimal { target, acc, cr } => {
					let byte = chunk[pos];
					pos += 1;
					if *cr {
						if byte != LF {
							return Err(ParseError::MissingTerminator(byte));
						}
						let (target, value) = (*target, acc.finish()?);
						self.finish_decimal(target, value, decoder)?
					} else if byte == CR {
						acc.finish()?;
						*cr = true;
						None
					} else {
						acc.push(byte)?;
						None
					}
				}
				State::Payload { remaining } => {
					let take = (*remaining).min(chunk.len() - pos);
					*remaining -= take;
					if *remaining == 0 {
						self.state = State::Terminator { cr: false };
					}
					self.builder_mut()?
						.append(&chunk[pos..pos + take], decoder)?;
					pos += take;
					None
				}
				State::Terminator { cr } => {
					let byte = chunk[pos];
					pos += 1;
					if !*cr {
						if byte != CR {
							return Err(ParseError::MissingTerminator(byte));
						}
						*cr = true;
						None
					} else {
						if byte != LF {
							return Err(ParseError::MissingTerminator(byte));
						}
						let builder = self.builder.take().ok_or_else(missing_builder)?;
						let payload = builder.finish(decoder)?;
						self.complete(RespValue::BulkString(payload))
					}
				}
			};

			if done.is_some() {
				return Ok((pos, done));
			}
		}
		Ok((pos, None))
	}

	fn start(&mut self, marker: u8) -> Result<(), ParseError> {
		if !is_valid_type_marker(marker) {
			return Err(ParseError::InvalidTypeMarker(marker_char(marker)));
		}
		if self.frames.is_empty() && marker != ERROR && !self.kind.accepts(marker) {
			return Err(ParseError::UnexpectedReplyType(marker_char(marker)));
		}

		self.state = match marker {
			SIMPLE_STRING | ERROR => State::Line {
				error: marker == ERROR,
				buf: Vec::new(),
				cr: false,
			},
			INTEGER => decimal_state(Target::Integer),
			BULK_STRING => decimal_state(Target::BulkLength),
			_ => decimal_state(Target::ArrayLength),
		};
		Ok(())
	}

	fn finish_line(&mut self, error: bool, line: Vec<u8>) -> Option<Done<BulkOutput<F>>> {
		let text = match String::from_utf8(line) {
			Ok(text) => text,
			Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
		};
		if error && self.frames.is_empty() {
			self.state = State::Marker;
			return Some(Done::Failure(text));
		}
		let value = if error {
			RespValue::Error(text)
		} else {
			RespValue::SimpleString(text)
		};
		self.complete(value)
	}

	fn finish_decimal(
		&mut self,
		target: Target,
		value: i64,
		decoder: &mut CharsetDecoder,
	) -> Result<Option<Done<BulkOutput<F>>>, ParseError> {
		match target {
			Target::Integer => Ok(self.complete(RespValue::Integer(value))),
			Target::BulkLength => match value {
				-1 => Ok(self.complete(RespValue::Null)),
				n if n < -1 => Err(ParseError::InvalidBulkStringLength(n)),
				n => {
					let len = usize::try_from(n)?;
					self.builder = Some(self.factory.create(len, decoder)?);
					self.state = if len == 0 {
						State::Terminator { cr: false }
					} else {
						State::Payload { remaining: len }
					};
					Ok(None)
				}
			},
			Target::ArrayLength => match value {
				-1 => Ok(self.complete(RespValue::Null)),
				0 => Ok(self.complete(RespValue::Array(Vec::new()))),
				n if n < -1 => Err(ParseError::InvalidArrayLength(n)),
				n => {
					let remaining = usize::try_from(n)?;
					self.frames.push(Frame {
						remaining,
						elements: Vec::with_capacity(remaining.min(MAX_PREALLOC)),
					});
					self.state = State::Marker;
					Ok(None)
				}
			},
		}
	}

	/// Hand a finished value to the innermost open array, closing every
	/// array it completes. Returns the top-level reply once there is one.
	fn complete(&mut self, mut value: RespValue<BulkOutput<F>>) -> Option<Done<BulkOutput<F>>> {
		self.state = State::Marker;
		loop {
			let Some(frame) = self.frames.last_mut() else {
				return Some(Done::Value(value));
			};
			frame.elements.push(value);
			frame.remaining -= 1;
			if frame.remaining > 0 {
				return None;
			}
			let elements = std::mem::take(&mut frame.elements);
			self.frames.pop();
			value = RespValue::Array(elements);
		}
	}

	fn builder_mut(&mut self) -> Result<&mut F::Builder, ParseError> {
		self.builder.as_mut().ok_or_else(missing_builder)
	}
}

fn decimal_state(target: Target) -> State {
	State::Decimal {
		target,
		acc: DecimalAccumulator::default(),
		cr: false,
	}
}

fn missing_builder() -> ParseError {
	ParseError::InvalidFormat("bulk string payload without a builder".into())
}

/// Collect line bytes up to a CRLF. A CR not followed by LF is content.
/// Returns the line once its terminator has been consumed.
fn scan_line(buf: &mut Vec<u8>, cr: &mut bool, input: &[u8], pos: &mut usize) -> Option<Vec<u8>> {
	while *pos < input.len() {
		if *cr {
			*cr = false;
			if input[*pos] == LF {
				*pos += 1;
				return Some(std::mem::take(buf));
			}
			buf.push(CR);
		}

		let rest = &input[*pos..];
		match memchr(CR, rest) {
			Some(i) => {
				buf.extend_from_slice(&rest[..i]);
				*pos += i + 1;
				*cr = true;
			}
			None => {
				buf.extend_from_slice(rest);
				*pos = input.len();
			}
		}
	}
	None
}

/// `:` replies as `i32`.
pub fn integer_reply() -> ReplyParser<IntegerReply, NoBulkStrings> {
	ReplyParser::new(IntegerReply, NoBulkStrings)
}

/// `:` replies as `i64`.
pub fn long_reply() -> ReplyParser<LongReply, NoBulkStrings> {
	ReplyParser::new(LongReply, NoBulkStrings)
}

/// `+` replies as `String`.
pub fn simple_string_reply() -> ReplyParser<SimpleStringReply, NoBulkStrings> {
	ReplyParser::new(SimpleStringReply, NoBulkStrings)
}

/// `$` replies built by `factory`.
pub fn bulk_string_reply<F: BulkStringBuilderFactory>(factory: F) -> ReplyParser<BulkStringReply, F> {
	ReplyParser::new(BulkStringReply, factory)
}

/// `*` replies whose bulk strings are built by `factory`.
pub fn array_reply<F: BulkStringBuilderFactory>(factory: F) -> ReplyParser<ArrayReply, F> {
	ReplyParser::new(ArrayReply, factory)
}

/// Any reply, bulk strings built by `factory`.
pub fn any_reply<F: BulkStringBuilderFactory>(factory: F) -> ReplyParser<AnyReply, F> {
	ReplyParser::new(AnyReply, factory)
}

/// Convenience function for one-off parsing.
/// This will create a temporary parser and try to parse one value; an error
/// reply comes back as [`RespValue::Error`].
/// If streaming is needed, use [`ReplyParser`] directly.
pub fn parse(buf: &mut BytesMut) -> Result<RespValue<Bytes>, ParseError> {
	let mut parser = any_reply(BytesFactory::new());
	let mut decoder = CharsetDecoder::new(Charset::Utf8);
	match parser.parse(buf, &mut decoder, |value| value, RespValue::Error) {
		RespParseResult::Complete(value) => Ok(value),
		RespParseResult::Incomplete => Err(ParseError::UnexpectedEOF),
		RespParseResult::Error(RespError::Parse(e)) => Err(e),
		RespParseResult::Error(RespError::Encode(e)) => Err(ParseError::InvalidFormat(e.to_string())),
	}
}
