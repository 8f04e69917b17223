//! Reply values.

use bytes::Bytes;

/// A decoded RESP2 reply.
///
/// `B` is the bulk string representation chosen by the parser's
/// [`BulkStringBuilderFactory`](crate::BulkStringBuilderFactory): raw
/// [`Bytes`] by default, or a decoded `String`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue<B = Bytes> {
	/// Simple string: `+OK\r\n`
	SimpleString(String),

	/// Error: `-ERR message\r\n`. Only produced for errors nested in an
	/// array; a top-level error reply goes to the failure handler.
	Error(String),

	/// Integer: `:1000\r\n`
	Integer(i64),

	/// Bulk string: `$6\r\nfoobar\r\n`
	BulkString(B),

	/// Array: `*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n`
	Array(Vec<RespValue<B>>),

	/// Null bulk string `$-1\r\n` or null array `*-1\r\n`
	Null,
}

impl<B> RespValue<B> {
	/// Check if the value is an error
	pub fn is_error(&self) -> bool {
		matches!(self, RespValue::Error(_))
	}

	/// Check if the value is null
	pub fn is_null(&self) -> bool {
		matches!(self, RespValue::Null)
	}

	/// Try to convert to integer
	pub fn as_integer(&self) -> Option<i64> {
		match self {
			RespValue::Integer(i) => Some(*i),
			_ => None,
		}
	}

	/// Try to convert to array
	pub fn as_array(&self) -> Option<&[RespValue<B>]> {
		match self {
			RespValue::Array(a) => Some(a.as_slice()),
			_ => None,
		}
	}

	/// Try to consume and convert to Vec<RespValue>
	pub fn into_vec(self) -> Option<Vec<RespValue<B>>> {
		match self {
			RespValue::Array(a) => Some(a),
			_ => None,
		}
	}

	pub fn as_bulk(&self) -> Option<&B> {
		match self {
			RespValue::BulkString(b) => Some(b),
			_ => None,
		}
	}
}

impl<B: AsRef<[u8]>> RespValue<B> {
	/// Try to convert to a string slice
	pub fn as_str(&self) -> Option<&str> {
		match self {
			RespValue::SimpleString(s) | RespValue::Error(s) => Some(s.as_str()),
			RespValue::BulkString(b) => std::str::from_utf8(b.as_ref()).ok(),
			_ => None,
		}
	}

	/// Try to convert to bytes
	pub fn as_bytes(&self) -> Option<&[u8]> {
		match self {
			RespValue::SimpleString(s) => Some(s.as_bytes()),
			RespValue::BulkString(b) => Some(b.as_ref()),
			_ => None,
		}
	}

	/// Convert to String with lossy UTF-8 conversion
	pub fn to_string_lossy(&self) -> Option<String> {
		match self {
			RespValue::SimpleString(s) => Some(s.clone()),
			RespValue::BulkString(b) => Some(String::from_utf8_lossy(b.as_ref()).into_owned()),
			_ => None,
		}
	}
}

// Convenience constructors
impl RespValue {
	/// Create a bulk string value
	pub fn bulk_string(s: impl Into<Bytes>) -> Self {
		RespValue::BulkString(s.into())
	}
}

impl<B> RespValue<B> {
	pub fn simple_string(s: impl Into<String>) -> Self {
		RespValue::SimpleString(s.into())
	}

	pub fn error(e: impl Into<String>) -> Self {
		RespValue::Error(e.into())
	}

	pub fn integer(i: i64) -> Self {
		RespValue::Integer(i)
	}

	/// Create an array value from an iterator
	pub fn array(items: impl IntoIterator<Item = RespValue<B>>) -> Self {
		RespValue::Array(items.into_iter().collect())
	}

	pub fn null() -> Self {
		RespValue::Null
	}
}

impl<B> From<i64> for RespValue<B> {
	fn from(i: i64) -> Self {
		RespValue::Integer(i)
	}
}

impl From<&str> for RespValue {
	fn from(s: &str) -> Self {
		RespValue::BulkString(Bytes::copy_from_slice(s.as_bytes()))
	}
}

impl From<Bytes> for RespValue {
	fn from(b: Bytes) -> Self {
		RespValue::BulkString(b)
	}
}

impl<B, T: Into<RespValue<B>>> From<Option<T>> for RespValue<B> {
	fn from(o: Option<T>) -> Self {
		match o {
			Some(v) => v.into(),
			None => RespValue::Null,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_is_error() {
		let err: RespValue = RespValue::error("ERR");
		assert!(err.is_error());

		let ok: RespValue = RespValue::simple_string("OK");
		assert!(!ok.is_error());
	}

	#[test]
	fn test_as_str() {
		let val: RespValue = RespValue::simple_string("hello");
		assert_eq!(val.as_str(), Some("hello"));

		let bulk = RespValue::bulk_string("world");
		assert_eq!(bulk.as_str(), Some("world"));

		let num: RespValue = RespValue::integer(42);
		assert_eq!(num.as_str(), None);
	}

	#[test]
	fn test_string_bulk() {
		let val: RespValue<String> = RespValue::BulkString("héllo".to_string());
		assert_eq!(val.as_str(), Some("héllo"));
		assert_eq!(val.as_bulk().map(String::len), Some(6));
	}

	#[test]
	fn test_from_option() {
		let none: RespValue = Option::<i64>::None.into();
		assert!(none.is_null());

		let some: RespValue = Some(7i64).into();
		assert_eq!(some.as_integer(), Some(7));
	}

	#[test]
	fn test_to_string_lossy() {
		let val = RespValue::bulk_string(&b"a\xFFb"[..]);
		assert_eq!(val.to_string_lossy(), Some("a\u{FFFD}b".to_string()));

		let num: RespValue = RespValue::integer(42);
		assert_eq!(num.to_string_lossy(), None);
	}

	#[test]
	fn test_into_vec() {
		let arr: RespValue = RespValue::array(vec![RespValue::integer(1), RespValue::integer(2)]);
		let vec = arr.into_vec().unwrap();
		assert_eq!(vec.len(), 2);
	}
}
