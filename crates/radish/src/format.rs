//! Rendering replies the way redis-cli prints them.

use std::fmt::Write;

use resp::RespValue;
use resp::ServerError;

/// Render a reply, server errors included, without a trailing newline.
pub fn format_reply(reply: &Result<RespValue<String>, ServerError>) -> String {
	match reply {
		Ok(value) => format_value(value),
		Err(e) => format!("(error) {}", e.message()),
	}
}

pub fn format_value(value: &RespValue<String>) -> String {
	let mut out = String::new();
	write_value(&mut out, value, 0);
	out
}

fn write_value(out: &mut String, value: &RespValue<String>, indent: usize) {
	match value {
		RespValue::SimpleString(s) => out.push_str(s),
		RespValue::Error(message) => {
			let _ = write!(out, "(error) {}", message);
		}
		RespValue::Integer(n) => {
			let _ = write!(out, "(integer) {}", n);
		}
		RespValue::BulkString(s) => push_quoted(out, s),
		RespValue::Null => out.push_str("(nil)"),
		RespValue::Array(items) if items.is_empty() => out.push_str("(empty array)"),
		RespValue::Array(items) => {
			let width = items.len().to_string().len();
			for (i, item) in items.iter().enumerate() {
				if i > 0 {
					out.push('\n');
					out.extend(std::iter::repeat_n(' ', indent));
				}
				let _ = write!(out, "{:>width$}) ", i + 1, width = width);
				write_value(out, item, indent + width + 2);
			}
		}
	}
}

/// Double-quote `s`, escaping quotes, backslashes and control characters.
fn push_quoted(out: &mut String, s: &str) {
	out.push('"');
	for c in s.chars() {
		match c {
			'"' => out.push_str("\\\""),
			'\\' => out.push_str("\\\\"),
			'\n' => out.push_str("\\n"),
			'\r' => out.push_str("\\r"),
			'\t' => out.push_str("\\t"),
			'\u{7}' => out.push_str("\\a"),
			'\u{8}' => out.push_str("\\b"),
			c if c.is_control() => {
				let _ = write!(out, "\\x{:02x}", u32::from(c));
			}
			c => out.push(c),
		}
	}
	out.push('"');
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	fn bulk(s: &str) -> RespValue<String> {
		RespValue::BulkString(s.to_string())
	}

	#[rstest]
	#[case(RespValue::simple_string("OK"), "OK")]
	#[case(RespValue::integer(-3), "(integer) -3")]
	#[case(bulk("value"), "\"value\"")]
	#[case(bulk("a\"b\\\r\n\u{1}"), "\"a\\\"b\\\\\\r\\n\\x01\"")]
	#[case(bulk("déjà"), "\"déjà\"")]
	#[case(RespValue::null(), "(nil)")]
	#[case(RespValue::error("WRONGTYPE nested"), "(error) WRONGTYPE nested")]
	#[case(RespValue::array([]), "(empty array)")]
	fn test_format_scalar(#[case] value: RespValue<String>, #[case] expected: &str) {
		assert_eq!(format_value(&value), expected);
	}

	#[test]
	fn test_format_server_error() {
		let reply = Err(ServerError("ERR unknown command 'FOO'".to_string()));
		assert_eq!(format_reply(&reply), "(error) ERR unknown command 'FOO'");
	}

	#[test]
	fn test_format_nested_array() {
		let value = RespValue::array([
			bulk("a"),
			RespValue::array([RespValue::integer(1), RespValue::null()]),
			bulk("c"),
		]);
		assert_eq!(
			format_value(&value),
			"1) \"a\"\n2) 1) (integer) 1\n   2) (nil)\n3) \"c\""
		);
	}

	#[test]
	fn test_format_pads_indices() {
		let value = RespValue::array((0..10).map(RespValue::integer));
		let text = format_value(&value);
		let lines: Vec<&str> = text.lines().collect();
		assert_eq!(lines[0], " 1) (integer) 0");
		assert_eq!(lines[9], "10) (integer) 9");
	}
}
