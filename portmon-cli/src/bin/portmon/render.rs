const BYTES_PER_LINE: usize = 16;

/// Hex dump of a byte stream, wrapped every 16 bytes.
///
/// The column is kept across calls, so a line can be filled by several chunks.
#[derive(Default)]
pub struct HexDump {
	column: usize,
}

impl HexDump {
	pub fn render(&mut self, data: &[u8]) -> String {
		let mut output = String::with_capacity(data.len() * 3 + data.len() / BYTES_PER_LINE + 1);
		for byte in data {
			output += &format!("{:02x} ", byte);
			self.column += 1;
			if self.column == BYTES_PER_LINE {
				output.push('\n');
				self.column = 0;
			}
		}
		output
	}
}

/// Render received bytes as text, with control characters other than line breaks and tabs replaced by dots.
pub fn render_text(data: &[u8]) -> String {
	String::from_utf8_lossy(data)
		.chars()
		.map(|c| match c {
			'\n' | '\r' | '\t' => c,
			c if c.is_control() => '.',
			c => c,
		})
		.collect()
}

/// Parse a line of space separated hexadecimal bytes, like `41 42 0d 0a`.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
	input
		.split_whitespace()
		.map(|word| {
			let digits = word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")).unwrap_or(word);
			u8::from_str_radix(digits, 16).map_err(|_| format!("invalid hexadecimal byte: {:?}", word))
		})
		.collect()
}

/// Convert a line of text to bytes, replacing the escapes `\r`, `\n`, `\t` and `\\`.
///
/// Any other backslash is kept as is.
pub fn parse_text(input: &str) -> Vec<u8> {
	let mut output = Vec::with_capacity(input.len());
	let mut chars = input.chars().peekable();
	while let Some(c) = chars.next() {
		if c == '\\' {
			let escaped = match chars.peek() {
				Some('r') => Some(b'\r'),
				Some('n') => Some(b'\n'),
				Some('t') => Some(b'\t'),
				Some('\\') => Some(b'\\'),
				_ => None,
			};
			if let Some(byte) = escaped {
				chars.next();
				output.push(byte);
				continue;
			}
		}
		let mut buffer = [0; 4];
		output.extend_from_slice(c.encode_utf8(&mut buffer).as_bytes());
	}
	output
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert2::{assert, let_assert};

	#[test]
	fn hex_dump_wraps_across_chunks() {
		let mut dump = HexDump::default();
		assert!(dump.render(&[0x41, 0x0a]) == "41 0a ");
		let rest: Vec<u8> = (0..15).collect();
		let output = dump.render(&rest);
		assert!(output == "00 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d \n0e ");
	}

	#[test]
	fn text_hides_control_characters() {
		assert!(render_text(b"OK\r\n") == "OK\r\n");
		assert!(render_text(&[0x41, 0x00, 0x1b, 0x42]) == "A..B");
		assert!(render_text(&[0xff]) == "\u{fffd}");
	}

	#[test]
	fn parse_hex_bytes() {
		let_assert!(Ok(data) = parse_hex("41 42  0x0d 0A"));
		assert!(data == [0x41, 0x42, 0x0d, 0x0a]);
		assert!(parse_hex("").unwrap().is_empty());
		let_assert!(Err(message) = parse_hex("41 zz"));
		assert!(message == "invalid hexadecimal byte: \"zz\"");
		assert!(parse_hex("100").is_err());
	}

	#[test]
	fn parse_text_escapes() {
		assert!(parse_text("AT\\r\\n") == b"AT\r\n");
		assert!(parse_text("tab\\there") == b"tab\there");
		assert!(parse_text("back\\\\slash\\x") == b"back\\slash\\x");
		assert!(parse_text("trailing\\") == b"trailing\\");
		assert!(parse_text("é") == "é".as_bytes());
	}
}
