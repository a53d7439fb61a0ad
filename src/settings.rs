//! Serial line settings chosen by the consumer before opening a [`Session`](crate::Session).

/// Parity checking mode of a serial line.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Parity {
	None,
	Odd,
	Even,
	Mark,
	Space,
}

/// Number of stop bits after each character.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum StopBits {
	One,
	OnePointFive,
	Two,
}

/// Everything needed to open a serial port.
///
/// The value is a snapshot: once passed to [`Session::start()`](crate::Session::start)
/// it is never modified.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConnectionParameters {
	/// The name or path of the port, like `/dev/ttyUSB0` or `COM3`.
	pub port_name: String,

	/// The baud rate in bits per second.
	pub baud_rate: u32,

	/// The number of data bits per character, normally 5 to 8.
	pub data_bits: u8,

	/// The parity mode.
	pub parity: Parity,

	/// The number of stop bits.
	pub stop_bits: StopBits,
}

impl ConnectionParameters {
	/// Parameters for the common 8N1 line discipline at the given baud rate.
	pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
		Self {
			port_name: port_name.into(),
			baud_rate,
			data_bits: 8,
			parity: Parity::None,
			stop_bits: StopBits::One,
		}
	}

	pub fn with_data_bits(mut self, data_bits: u8) -> Self {
		self.data_bits = data_bits;
		self
	}

	pub fn with_parity(mut self, parity: Parity) -> Self {
		self.parity = parity;
		self
	}

	pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
		self.stop_bits = stop_bits;
		self
	}
}

impl Parity {
	/// All parity modes, in declaration order.
	pub const ALL: [Parity; 5] = [Parity::None, Parity::Odd, Parity::Even, Parity::Mark, Parity::Space];

	/// The single letter used in the classic `8N1` notation.
	pub fn letter(self) -> char {
		match self {
			Self::None => 'N',
			Self::Odd => 'O',
			Self::Even => 'E',
			Self::Mark => 'M',
			Self::Space => 'S',
		}
	}
}

impl StopBits {
	/// All stop bit modes, in declaration order.
	pub const ALL: [StopBits; 3] = [StopBits::One, StopBits::OnePointFive, StopBits::Two];
}

impl std::fmt::Display for Parity {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::None => write!(f, "none"),
			Self::Odd => write!(f, "odd"),
			Self::Even => write!(f, "even"),
			Self::Mark => write!(f, "mark"),
			Self::Space => write!(f, "space"),
		}
	}
}

impl std::fmt::Display for StopBits {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::One => write!(f, "1"),
			Self::OnePointFive => write!(f, "1.5"),
			Self::Two => write!(f, "2"),
		}
	}
}

impl std::fmt::Display for ConnectionParameters {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"{} @ {} {}{}{}",
			self.port_name,
			self.baud_rate,
			self.data_bits,
			self.parity.letter(),
			self.stop_bits
		)
	}
}

impl std::str::FromStr for Parity {
	type Err = &'static str;

	fn from_str(data: &str) -> Result<Self, Self::Err> {
		match data.trim().to_ascii_lowercase().as_str() {
			"none" | "n" => Ok(Self::None),
			"odd" | "o" => Ok(Self::Odd),
			"even" | "e" => Ok(Self::Even),
			"mark" | "m" => Ok(Self::Mark),
			"space" | "s" => Ok(Self::Space),
			_ => Err("invalid parity: expected one of none, odd, even, mark or space"),
		}
	}
}

impl std::str::FromStr for StopBits {
	type Err = &'static str;

	fn from_str(data: &str) -> Result<Self, Self::Err> {
		match data.trim() {
			"1" => Ok(Self::One),
			"1.5" => Ok(Self::OnePointFive),
			"2" => Ok(Self::Two),
			_ => Err("invalid stop bits: expected 1, 1.5 or 2"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert2::assert;

	#[test]
	fn display_uses_classic_notation() {
		let params = ConnectionParameters::new("/dev/ttyUSB0", 9600);
		assert!(params.to_string() == "/dev/ttyUSB0 @ 9600 8N1");

		let params = ConnectionParameters::new("COM3", 115200)
			.with_data_bits(7)
			.with_parity(Parity::Even)
			.with_stop_bits(StopBits::OnePointFive);
		assert!(params.to_string() == "COM3 @ 115200 7E1.5");
	}

	#[test]
	fn parse_parity() {
		assert!("none".parse::<Parity>() == Ok(Parity::None));
		assert!("ODD".parse::<Parity>() == Ok(Parity::Odd));
		assert!("e".parse::<Parity>() == Ok(Parity::Even));
		assert!(" mark ".parse::<Parity>() == Ok(Parity::Mark));
		assert!("S".parse::<Parity>() == Ok(Parity::Space));
		assert!("x".parse::<Parity>().is_err());
	}

	#[test]
	fn parse_stop_bits() {
		assert!("1".parse::<StopBits>() == Ok(StopBits::One));
		assert!("1.5".parse::<StopBits>() == Ok(StopBits::OnePointFive));
		assert!("2".parse::<StopBits>() == Ok(StopBits::Two));
		assert!("3".parse::<StopBits>().is_err());
	}
}
