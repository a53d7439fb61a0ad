#![allow(dead_code)]

use portmon::{ConnectionParameters, PortCapabilities, ReadError, System, Transport};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// One scripted result of a read from a mock port.
#[derive(Debug, Clone)]
pub enum MockRead {
	Data(Vec<u8>),
	Error(std::io::ErrorKind),
}

/// The wire of a mock port, shared between the test and every transport opened on it.
#[derive(Debug, Clone, Default)]
pub struct MockLine {
	incoming: Arc<Mutex<VecDeque<MockRead>>>,
	written: Arc<Mutex<Vec<u8>>>,
	fail_writes: Arc<AtomicBool>,
	hung_up: Arc<AtomicBool>,
	reads: Arc<AtomicUsize>,
	open_handles: Arc<AtomicUsize>,
	times_opened: Arc<AtomicUsize>,
}

impl MockLine {
	pub fn push_data(&self, data: &[u8]) {
		self.incoming.lock().unwrap().push_back(MockRead::Data(data.to_vec()));
	}

	pub fn push_error(&self, kind: std::io::ErrorKind) {
		self.incoming.lock().unwrap().push_back(MockRead::Error(kind));
	}

	/// The number of scripted reads that have not been consumed yet.
	pub fn pending_reads(&self) -> usize {
		self.incoming.lock().unwrap().len()
	}

	pub fn written(&self) -> Vec<u8> {
		self.written.lock().unwrap().clone()
	}

	pub fn fail_writes(&self, fail: bool) {
		self.fail_writes.store(fail, Ordering::Relaxed);
	}

	/// Make every following read end at once without data, like a tty after the device was unplugged.
	pub fn hang_up(&self) {
		self.hung_up.store(true, Ordering::Relaxed);
	}

	/// The number of reads performed on this line so far.
	pub fn reads(&self) -> usize {
		self.reads.load(Ordering::Relaxed)
	}

	/// The number of transports currently open on this line.
	pub fn open_handles(&self) -> usize {
		self.open_handles.load(Ordering::Relaxed)
	}

	/// The number of times the port was opened, including probes.
	pub fn times_opened(&self) -> usize {
		self.times_opened.load(Ordering::Relaxed)
	}
}

/// Behaviour of a mock port.
#[derive(Debug, Clone)]
pub struct MockDevice {
	pub capabilities: PortCapabilities,
	pub open_error: Option<std::io::ErrorKind>,
	pub probe_error: Option<std::io::ErrorKind>,
	pub not_ready: bool,
	pub line: MockLine,
}

impl MockDevice {
	pub fn new() -> Self {
		Self {
			capabilities: PortCapabilities::conservative(),
			open_error: None,
			probe_error: None,
			not_ready: false,
			line: MockLine::default(),
		}
	}
}

/// A [`System`] with scripted ports.
#[derive(Debug, Clone, Default)]
pub struct MockSystem {
	devices: Arc<Mutex<BTreeMap<String, MockDevice>>>,
	list_error: Arc<AtomicBool>,
}

impl MockSystem {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a well behaved port.
	pub fn add_port(&self, name: &str) -> MockLine {
		self.add_device(name, MockDevice::new())
	}

	pub fn add_device(&self, name: &str, device: MockDevice) -> MockLine {
		let line = device.line.clone();
		self.devices.lock().unwrap().insert(name.to_owned(), device);
		line
	}

	/// Make listing the port names fail.
	pub fn fail_listing(&self, fail: bool) {
		self.list_error.store(fail, Ordering::Relaxed);
	}

	fn device(&self, name: &str) -> std::io::Result<MockDevice> {
		self.devices
			.lock()
			.unwrap()
			.get(name)
			.cloned()
			.ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, format!("no such port: {}", name)))
	}
}

impl System for MockSystem {
	type Transport = MockTransport;

	fn port_names(&self) -> std::io::Result<Vec<String>> {
		if self.list_error.load(Ordering::Relaxed) {
			return Err(std::io::ErrorKind::PermissionDenied.into());
		}
		// Deliberately unsorted, like a real system may report them.
		Ok(self.devices.lock().unwrap().keys().rev().cloned().collect())
	}

	fn probe(&self, port_name: &str) -> std::io::Result<PortCapabilities> {
		let device = self.device(port_name)?;
		if let Some(kind) = device.open_error {
			return Err(kind.into());
		}
		let _port = MockTransport::open(&device, Duration::ZERO);
		if let Some(kind) = device.probe_error {
			return Err(kind.into());
		}
		Ok(device.capabilities.clone())
	}

	fn open(&self, params: &ConnectionParameters, read_timeout: Duration) -> std::io::Result<Self::Transport> {
		let device = self.device(&params.port_name)?;
		if let Some(kind) = device.open_error {
			return Err(kind.into());
		}
		Ok(MockTransport::open(&device, read_timeout))
	}
}

/// An open mock port.
#[derive(Debug)]
pub struct MockTransport {
	line: MockLine,
	read_timeout: Duration,
	not_ready: bool,
}

impl MockTransport {
	fn open(device: &MockDevice, read_timeout: Duration) -> Self {
		device.line.open_handles.fetch_add(1, Ordering::Relaxed);
		device.line.times_opened.fetch_add(1, Ordering::Relaxed);
		Self {
			line: device.line.clone(),
			read_timeout,
			not_ready: device.not_ready,
		}
	}
}

impl Drop for MockTransport {
	fn drop(&mut self) {
		self.line.open_handles.fetch_sub(1, Ordering::Relaxed);
	}
}

impl Transport for MockTransport {
	fn read(&self, buffer: &mut [u8]) -> Result<usize, ReadError> {
		self.line.reads.fetch_add(1, Ordering::Relaxed);
		if self.line.hung_up.load(Ordering::Relaxed) {
			return Ok(0);
		}
		let deadline = Instant::now() + self.read_timeout;
		loop {
			{
				let mut incoming = self.line.incoming.lock().unwrap();
				match incoming.pop_front() {
					Some(MockRead::Data(data)) => {
						let len = data.len().min(buffer.len());
						buffer[..len].copy_from_slice(&data[..len]);
						if len < data.len() {
							incoming.push_front(MockRead::Data(data[len..].to_vec()));
						}
						return Ok(len);
					},
					Some(MockRead::Error(kind)) => return Err(ReadError::Io(kind.into())),
					None => (),
				}
			}
			if Instant::now() >= deadline {
				return Err(ReadError::Timeout);
			}
			std::thread::sleep(Duration::from_millis(1));
		}
	}

	fn write_all(&self, buffer: &[u8]) -> std::io::Result<()> {
		if self.line.fail_writes.load(Ordering::Relaxed) {
			return Err(std::io::ErrorKind::BrokenPipe.into());
		}
		self.line.written.lock().unwrap().extend_from_slice(buffer);
		Ok(())
	}

	fn check_ready(&self) -> std::io::Result<()> {
		if self.not_ready {
			Err(std::io::Error::new(std::io::ErrorKind::Other, "device reports not ready"))
		} else {
			Ok(())
		}
	}
}
