//! System implementation using the `serial2` crate.

use crate::{ConnectionParameters, Parity, PortCapabilities, ReadError, StopBits};
use std::time::Duration;

/// Re-exported `serial2` crate in case you need to inspect serial port settings.
pub use serial2;

/// Baud rates tried when probing a port.
///
/// The first part is the classic list of settable rates reported by communication drivers,
/// followed by the common high speed rates of USB adapters.
pub const CANDIDATE_BAUD_RATES: &[u32] = &[
	75, 110, 150, 300, 600, 1200, 1800, 2400, 4800, 7200, 9600, 14400, 19200, 38400, 56000, 57600, 115200, 128000,
	230400, 460800, 921600,
];

const CANDIDATE_DATA_BITS: [u8; 4] = [5, 6, 7, 8];

/// The [`System`](crate::System) of the local machine, backed by `serial2`.
///
/// Mark and space parity and one and a half stop bits can not be configured through `serial2`,
/// so they are never reported by [`probe()`](crate::System::probe) and opening a port with them fails.
#[derive(Debug, Default, Copy, Clone)]
pub struct Serial2System;

impl crate::System for Serial2System {
	type Transport = serial2::SerialPort;

	fn port_names(&self) -> std::io::Result<Vec<String>> {
		let ports = serial2::SerialPort::available_ports()?;
		Ok(ports.into_iter().map(|path| path.to_string_lossy().into_owned()).collect())
	}

	fn probe(&self, port_name: &str) -> std::io::Result<PortCapabilities> {
		let mut port = serial2::SerialPort::open(port_name, |mut settings: serial2::Settings| {
			settings.set_raw();
			Ok(settings)
		})?;
		let original = port.get_configuration()?;
		let capabilities = probe_settings(&mut port, &original);

		// Some platforms keep the line settings after the port is closed, so put them back.
		if let Err(e) = port.set_configuration(&original) {
			debug!("failed to restore settings of {} after probing: {}", port_name, e);
		}
		capabilities
	}

	fn open(&self, params: &ConnectionParameters, read_timeout: Duration) -> std::io::Result<Self::Transport> {
		let char_size = to_char_size(params.data_bits)?;
		let parity = to_parity(params.parity)?;
		let stop_bits = to_stop_bits(params.stop_bits)?;

		let mut port = serial2::SerialPort::open(&params.port_name, |mut settings: serial2::Settings| {
			settings.set_raw();
			settings.set_baud_rate(params.baud_rate)?;
			settings.set_char_size(char_size);
			settings.set_parity(parity);
			settings.set_stop_bits(stop_bits);
			settings.set_flow_control(serial2::FlowControl::None);
			Ok(settings)
		})?;
		port.set_read_timeout(read_timeout)?;
		Ok(port)
	}
}

impl crate::Transport for serial2::SerialPort {
	fn read(&self, buffer: &mut [u8]) -> Result<usize, ReadError> {
		Ok(serial2::SerialPort::read(self, buffer)?)
	}

	fn write_all(&self, buffer: &[u8]) -> std::io::Result<()> {
		serial2::SerialPort::write_all(self, buffer)
	}

	fn check_ready(&self) -> std::io::Result<()> {
		self.get_configuration().map(drop)
	}
}

fn probe_settings(port: &mut serial2::SerialPort, base: &serial2::Settings) -> std::io::Result<PortCapabilities> {
	let baud_rates: Vec<u32> = CANDIDATE_BAUD_RATES
		.iter()
		.copied()
		.filter(|&baud_rate| {
			accepts(
				port,
				base,
				|settings| settings.set_baud_rate(baud_rate),
				|actual| actual.get_baud_rate().ok() == Some(baud_rate),
			)
		})
		.collect();

	if baud_rates.is_empty() {
		return Err(std::io::Error::new(
			std::io::ErrorKind::InvalidData,
			"port accepted none of the probed baud rates",
		));
	}

	let data_bits = CANDIDATE_DATA_BITS
		.iter()
		.copied()
		.filter(|&bits| {
			let Ok(char_size) = to_char_size(bits) else { return false };
			accepts(
				port,
				base,
				|settings| {
					settings.set_char_size(char_size);
					Ok(())
				},
				|actual| actual.get_char_size().ok() == Some(char_size),
			)
		})
		.collect();

	let parities = Parity::ALL
		.iter()
		.copied()
		.filter(|&parity| {
			let Ok(native) = to_parity(parity) else { return false };
			accepts(
				port,
				base,
				|settings| {
					settings.set_parity(native);
					Ok(())
				},
				|actual| actual.get_parity().ok() == Some(native),
			)
		})
		.collect();

	let stop_bits = StopBits::ALL
		.iter()
		.copied()
		.filter(|&stop_bits| {
			let Ok(native) = to_stop_bits(stop_bits) else { return false };
			accepts(
				port,
				base,
				|settings| {
					settings.set_stop_bits(native);
					Ok(())
				},
				|actual| actual.get_stop_bits().ok() == Some(native),
			)
		})
		.collect();

	Ok(PortCapabilities {
		baud_rates,
		data_bits,
		parities,
		stop_bits,
	})
}

/// Apply a modified copy of `base` to the port and check that the port kept the change.
fn accepts<A, C>(port: &mut serial2::SerialPort, base: &serial2::Settings, apply: A, check: C) -> bool
where
	A: FnOnce(&mut serial2::Settings) -> std::io::Result<()>,
	C: FnOnce(&serial2::Settings) -> bool,
{
	let mut settings = base.clone();
	let applied = apply(&mut settings)
		.and_then(|()| port.set_configuration(&settings))
		.and_then(|()| port.get_configuration());
	match applied {
		Ok(actual) => check(&actual),
		Err(e) => {
			trace!("probe setting rejected: {}", e);
			false
		},
	}
}

fn unsupported(what: &str) -> std::io::Error {
	std::io::Error::new(
		std::io::ErrorKind::InvalidInput,
		format!("{} is not supported by the serial2 backend", what),
	)
}

fn to_char_size(data_bits: u8) -> std::io::Result<serial2::CharSize> {
	match data_bits {
		5 => Ok(serial2::CharSize::Bits5),
		6 => Ok(serial2::CharSize::Bits6),
		7 => Ok(serial2::CharSize::Bits7),
		8 => Ok(serial2::CharSize::Bits8),
		other => Err(unsupported(&format!("{} data bits", other))),
	}
}

fn to_parity(parity: Parity) -> std::io::Result<serial2::Parity> {
	match parity {
		Parity::None => Ok(serial2::Parity::None),
		Parity::Odd => Ok(serial2::Parity::Odd),
		Parity::Even => Ok(serial2::Parity::Even),
		Parity::Mark | Parity::Space => Err(unsupported(&format!("{} parity", parity))),
	}
}

fn to_stop_bits(stop_bits: StopBits) -> std::io::Result<serial2::StopBits> {
	match stop_bits {
		StopBits::One => Ok(serial2::StopBits::One),
		StopBits::Two => Ok(serial2::StopBits::Two),
		StopBits::OnePointFive => Err(unsupported("1.5 stop bits")),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::System;
	use assert2::{assert, let_assert};

	#[test]
	fn unsupported_settings_are_rejected_before_opening() {
		let params = ConnectionParameters::new("/dev/does-not-matter", 9600).with_parity(Parity::Mark);
		let_assert!(Err(e) = Serial2System.open(&params, Duration::from_millis(100)));
		assert!(e.kind() == std::io::ErrorKind::InvalidInput);
		assert!(e.to_string() == "mark parity is not supported by the serial2 backend");

		let params = ConnectionParameters::new("/dev/does-not-matter", 9600).with_stop_bits(StopBits::OnePointFive);
		let_assert!(Err(e) = Serial2System.open(&params, Duration::from_millis(100)));
		assert!(e.kind() == std::io::ErrorKind::InvalidInput);

		let params = ConnectionParameters::new("/dev/does-not-matter", 9600).with_data_bits(9);
		let_assert!(Err(e) = Serial2System.open(&params, Duration::from_millis(100)));
		assert!(e.kind() == std::io::ErrorKind::InvalidInput);
	}

	#[test]
	fn candidate_baud_rates_are_unique() {
		let mut sorted = CANDIDATE_BAUD_RATES.to_vec();
		sorted.sort_unstable();
		sorted.dedup();
		assert!(sorted.len() == CANDIDATE_BAUD_RATES.len());
	}
}
