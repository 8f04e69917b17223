//! Splitting an interactive input line into command words.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SplitError {
	#[error("unbalanced quotes")]
	UnbalancedQuotes,

	#[error("closing quote must be followed by a space")]
	TrailingAfterQuote,

	#[error("invalid escape sequence \\x{0}")]
	InvalidHexEscape(String),
}

/// Split `line` on whitespace. Double-quoted words understand `\n`, `\r`,
/// `\t`, `\xHH`, `\"` and `\\`; single-quoted words only `\'`.
///
/// Words are text, not bytes: `\xHH` is the character U+00HH, which reaches
/// the wire in the configured charset. Under `latin1` that is the byte 0xHH;
/// under `utf-8` anything above `\x7F` becomes two bytes.
pub fn split_line(line: &str) -> Result<Vec<String>, SplitError> {
	let mut words = Vec::new();
	let mut chars = line.chars().peekable();

	loop {
		while chars.next_if(|c| c.is_whitespace()).is_some() {}
		let Some(&first) = chars.peek() else {
			return Ok(words);
		};

		let mut word = String::new();
		match first {
			'"' => {
				chars.next();
				loop {
					match chars.next().ok_or(SplitError::UnbalancedQuotes)? {
						'"' => break,
						'\\' => match chars.next().ok_or(SplitError::UnbalancedQuotes)? {
							'n' => word.push('\n'),
							'r' => word.push('\r'),
							't' => word.push('\t'),
							'x' => {
								let hex: String = chars.by_ref().take(2).collect();
								let code = u8::from_str_radix(&hex, 16)
									.map_err(|_| SplitError::InvalidHexEscape(hex.clone()))?;
								word.push(char::from(code));
							}
							other => word.push(other),
						},
						c => word.push(c),
					}
				}
				ensure_separated(chars.peek())?;
			}
			'\'' => {
				chars.next();
				loop {
					match chars.next().ok_or(SplitError::UnbalancedQuotes)? {
						'\'' => break,
						'\\' if chars.peek() == Some(&'\'') => {
							chars.next();
							word.push('\'');
						}
						c => word.push(c),
					}
				}
				ensure_separated(chars.peek())?;
			}
			_ => {
				while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
					word.push(c);
				}
			}
		}
		words.push(word);
	}
}

fn ensure_separated(next: Option<&char>) -> Result<(), SplitError> {
	match next {
		Some(c) if !c.is_whitespace() => Err(SplitError::TrailingAfterQuote),
		_ => Ok(()),
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("", &[])]
	#[case("   ", &[])]
	#[case("PING", &["PING"])]
	#[case("  SET  key\tvalue ", &["SET", "key", "value"])]
	#[case(r#"SET k "hello world""#, &["SET", "k", "hello world"])]
	#[case(r#"SET k "a\"b\\c\n""#, &["SET", "k", "a\"b\\c\n"])]
	#[case(r#"SET k "\x41\x7a""#, &["SET", "k", "Az"])]
	#[case(r#"SET k "\xE9t""#, &["SET", "k", "\u{e9}t"])]
	#[case(r"SET k 'it\'s raw\n'", &["SET", "k", "it's raw\\n"])]
	#[case(r#"SET k """#, &["SET", "k", ""])]
	#[case("SET k déjà", &["SET", "k", "déjà"])]
	fn test_split_line(#[case] line: &str, #[case] expected: &[&str]) {
		assert_eq!(split_line(line).unwrap(), expected);
	}

	#[rstest]
	#[case(r#"SET k "open"#, SplitError::UnbalancedQuotes)]
	#[case("SET k 'open", SplitError::UnbalancedQuotes)]
	#[case(r#"SET k "a"b"#, SplitError::TrailingAfterQuote)]
	#[case(r#"SET k "\xZZ""#, SplitError::InvalidHexEscape("ZZ".to_string()))]
	fn test_split_line_errors(#[case] line: &str, #[case] expected: SplitError) {
		assert_eq!(split_line(line).unwrap_err(), expected);
	}
}
