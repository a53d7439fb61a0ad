//! Traits to support different serial port backends.
//!
//! Use the [`System`] trait to list, probe and open ports,
//! and the [`Transport`] trait for the byte stream of an opened port.

pub mod serial2;

use crate::{ConnectionParameters, PortCapabilities, ReadError};
use ::std::time::Duration;

/// As platforms differ, the [`System`] trait is used to discover and open serial ports.
pub trait System {
	/// The transport type of an opened port.
	///
	/// A session reads from the transport on one thread and writes to it from another,
	/// so it must be shareable.
	type Transport: Transport + Send + Sync + 'static;

	/// List the names of the serial ports known to the system.
	fn port_names(&self) -> std::io::Result<Vec<String>>;

	/// Open a port, query the settings it supports and close it again.
	///
	/// Implementations must not leave the port open, not even when probing fails halfway.
	fn probe(&self, port_name: &str) -> std::io::Result<PortCapabilities>;

	/// Open a port with the given parameters.
	///
	/// Reads on the returned transport must give up after `read_timeout`.
	fn open(&self, params: &ConnectionParameters, read_timeout: Duration) -> std::io::Result<Self::Transport>;
}

/// The byte stream of an opened serial port.
///
/// Dropping the transport closes the port.
pub trait Transport {
	/// Read available bytes, blocking until at least one byte is available or the read timeout expires.
	///
	/// Returns [`ReadError::Timeout`] when no data arrived in time.
	fn read(&self, buffer: &mut [u8]) -> Result<usize, ReadError>;

	/// Write all bytes in the buffer to the port.
	fn write_all(&self, buffer: &[u8]) -> std::io::Result<()>;

	/// Check that the opened port is actually usable.
	fn check_ready(&self) -> std::io::Result<()> {
		Ok(())
	}
}

impl<T: System + ?Sized> System for &T {
	type Transport = T::Transport;

	fn port_names(&self) -> std::io::Result<Vec<String>> {
		(**self).port_names()
	}

	fn probe(&self, port_name: &str) -> std::io::Result<PortCapabilities> {
		(**self).probe(port_name)
	}

	fn open(&self, params: &ConnectionParameters, read_timeout: Duration) -> std::io::Result<Self::Transport> {
		(**self).open(params, read_timeout)
	}
}
