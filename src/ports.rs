//! Discovery of serial ports and the settings they support.

use crate::{ConnectionParameters, Parity, StopBits, System};

/// The line settings a port reports as supported.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PortCapabilities {
	/// Supported baud rates, in ascending order.
	pub baud_rates: Vec<u32>,

	/// Supported numbers of data bits, in ascending order.
	pub data_bits: Vec<u8>,

	/// Supported parity modes.
	pub parities: Vec<Parity>,

	/// Supported stop bit modes.
	pub stop_bits: Vec<StopBits>,
}

/// A serial port found by [`list_ports()`] together with its capabilities.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PortDescriptor {
	pub name: String,
	pub capabilities: PortCapabilities,
}

impl PortCapabilities {
	/// A small set of settings that nearly every UART supports.
	///
	/// Backends that can not query a port may report this instead.
	pub fn conservative() -> Self {
		Self {
			baud_rates: vec![9600, 19200, 38400, 57600, 115200],
			data_bits: vec![8],
			parities: vec![Parity::None],
			stop_bits: vec![StopBits::One],
		}
	}

	fn normalize(&mut self) {
		self.baud_rates.sort_unstable();
		self.baud_rates.dedup();
		self.data_bits.sort_unstable();
		self.data_bits.dedup();
		self.parities.sort_unstable();
		self.parities.dedup();
		self.stop_bits.sort_unstable();
		self.stop_bits.dedup();
	}
}

impl PortDescriptor {
	/// The settings to preselect for this port.
	///
	/// Prefers 9600 baud, 8 data bits, no parity and one stop bit,
	/// and falls back to the first supported value of each setting.
	/// Returns `None` if the port reported no value at all for one of the settings.
	pub fn default_parameters(&self) -> Option<ConnectionParameters> {
		let caps = &self.capabilities;
		Some(ConnectionParameters {
			port_name: self.name.clone(),
			baud_rate: preferred(&caps.baud_rates, 9600)?,
			data_bits: preferred(&caps.data_bits, 8)?,
			parity: preferred(&caps.parities, Parity::None)?,
			stop_bits: preferred(&caps.stop_bits, StopBits::One)?,
		})
	}
}

fn preferred<T: Copy + PartialEq>(values: &[T], preferred: T) -> Option<T> {
	if values.contains(&preferred) {
		Some(preferred)
	} else {
		values.first().copied()
	}
}

/// List the reachable serial ports of the local machine.
///
/// See [`list_ports_with()`] for details.
pub fn list_ports() -> Vec<PortDescriptor> {
	list_ports_with(&crate::Serial2System)
}

/// List the reachable serial ports of a [`System`].
///
/// Every port is opened once to probe its capabilities and closed again.
/// Ports that can not be opened or probed (because they are in use, access is denied, ...) are left out.
/// The result is sorted by port name.
pub fn list_ports_with<S: System + ?Sized>(system: &S) -> Vec<PortDescriptor> {
	let mut names = match system.port_names() {
		Ok(x) => x,
		Err(e) => {
			warn!("failed to list serial ports: {}", e);
			return Vec::new();
		},
	};
	names.sort();
	names.dedup();

	names
		.into_iter()
		.filter_map(|name| match probe_port_with(system, &name) {
			Ok(port) => Some(port),
			Err(e) => {
				debug!("skipping serial port {}: {}", name, e);
				None
			},
		})
		.collect()
}

/// Probe a single serial port of the local machine.
///
/// See [`probe_port_with()`] for details.
pub fn probe_port(port_name: &str) -> std::io::Result<PortDescriptor> {
	probe_port_with(&crate::Serial2System, port_name)
}

/// Probe the capabilities of a single port of a [`System`], without looking at any other port.
///
/// The port is opened once and closed again.
pub fn probe_port_with<S: System + ?Sized>(system: &S, port_name: &str) -> std::io::Result<PortDescriptor> {
	let mut capabilities = system.probe(port_name)?;
	capabilities.normalize();
	trace!("probed {}: {:?}", port_name, capabilities);
	Ok(PortDescriptor {
		name: port_name.to_owned(),
		capabilities,
	})
}
