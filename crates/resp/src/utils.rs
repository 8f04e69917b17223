//! Utility functions and constants for RESP protocol.

/// CRLF line ending
pub const CRLF: &[u8] = b"\r\n";
pub const CR: u8 = b'\r';
pub const LF: u8 = b'\n';

/// Type markers
pub const SIMPLE_STRING: u8 = b'+';
pub const ERROR: u8 = b'-';
pub const INTEGER: u8 = b':';
pub const BULK_STRING: u8 = b'$';
pub const ARRAY: u8 = b'*';

/// Check if a type marker is valid
#[inline]
pub fn is_valid_type_marker(marker: u8) -> bool {
	matches!(
		marker,
		SIMPLE_STRING | ERROR | INTEGER | BULK_STRING | ARRAY
	)
}

/// Printable form of a byte for error messages.
#[inline]
pub fn marker_char(byte: u8) -> char {
	char::from(byte)
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case(b'+', true)]
	#[case(b'-', true)]
	#[case(b':', true)]
	#[case(b'$', true)]
	#[case(b'*', true)]
	#[case(b'%', false)]
	#[case(b'_', false)]
	#[case(b'\r', false)]
	fn test_is_valid_type_marker(#[case] marker: u8, #[case] expected: bool) {
		assert_eq!(is_valid_type_marker(marker), expected);
	}
}
