//! The lifetime of one open connection to one serial port.

use crate::{Aggregator, ConnectionError, ConnectionParameters, Event, EventSink, ReadError, SendError, StartError, System, Transport};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// The default timeout of a single read from the port.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// The default period of the flush timer.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// The default size of a single read: three times a 128 byte base unit.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 3 * 128;

/// The default number of consecutive read failures before a connection error is reported.
pub const DEFAULT_ERROR_REPORT_THRESHOLD: usize = 10;

/// The lower bound of the read timeout and the tick interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Tunables of a [`Session`].
///
/// The read timeout, flush interval and tick interval are independent,
/// even though they all default to 100 milliseconds.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SessionConfig {
	/// How long a single read may block.
	///
	/// This also bounds how long [`Session::stop()`] waits for the read thread.
	/// Values below [`MIN_INTERVAL`] are raised to it.
	pub read_timeout: Duration,

	/// The quiet period after which received bytes are delivered.
	pub flush_interval: Duration,

	/// How often the flush timer checks for a quiet period.
	///
	/// Values below [`MIN_INTERVAL`] are raised to it.
	pub tick_interval: Duration,

	/// The maximum number of bytes requested per read.
	pub read_chunk_size: usize,

	/// The number of consecutive failed reads after which an [`Event::ConnectionError`] is delivered.
	///
	/// Zero disables the report.
	pub error_report_threshold: usize,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			read_timeout: DEFAULT_READ_TIMEOUT,
			flush_interval: crate::aggregator::DEFAULT_FLUSH_INTERVAL,
			tick_interval: DEFAULT_TICK_INTERVAL,
			read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
			error_report_threshold: DEFAULT_ERROR_REPORT_THRESHOLD,
		}
	}
}

impl SessionConfig {
	pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
		self.read_timeout = read_timeout.max(MIN_INTERVAL);
		self
	}

	pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
		self.flush_interval = flush_interval;
		self
	}

	pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
		self.tick_interval = tick_interval.max(MIN_INTERVAL);
		self
	}

	pub fn with_read_chunk_size(mut self, read_chunk_size: usize) -> Self {
		self.read_chunk_size = read_chunk_size.max(1);
		self
	}

	pub fn with_error_report_threshold(mut self, error_report_threshold: usize) -> Self {
		self.error_report_threshold = error_report_threshold;
		self
	}
}

/// The lifecycle state of a [`Session`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SessionState {
	Closed,
	Opening,
	Open,
	Closing,
}

/// A connection to a single serial port.
///
/// While open, a dedicated thread reads from the port into an [`Aggregator`],
/// and a timer thread delivers the aggregated chunks to the [`EventSink`].
/// Outgoing data is written synchronously with [`send()`](Self::send).
///
/// A port can be used by only one session at a time.
/// Dropping the session stops it.
pub struct Session<S: System> {
	system: S,
	config: SessionConfig,
	sink: Arc<dyn EventSink>,
	state: SessionState,
	active: Option<Active<S::Transport>>,
}

/// Resources that only exist while the session is open.
struct Active<T> {
	params: ConnectionParameters,
	transport: Arc<T>,
	aggregator: Arc<Aggregator>,
	stop_reader: Arc<AtomicBool>,
	ticker_control: mpsc::Sender<TickerMessage>,
	reader: JoinHandle<()>,
	ticker: JoinHandle<()>,
	claim: PortClaim,
}

impl<S: System> std::fmt::Debug for Session<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Session")
			.field("state", &self.state)
			.field("params", &self.parameters())
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

impl Session<crate::Serial2System> {
	/// Create a closed session for the serial ports of the local machine.
	pub fn with_default_system(config: SessionConfig, sink: impl EventSink + 'static) -> Self {
		Self::new(crate::Serial2System, config, sink)
	}
}

impl<S: System> Session<S> {
	/// Create a closed session.
	pub fn new(system: S, config: SessionConfig, sink: impl EventSink + 'static) -> Self {
		Self {
			system,
			config,
			sink: Arc::new(sink),
			state: SessionState::Closed,
			active: None,
		}
	}

	/// The current lifecycle state.
	pub fn state(&self) -> SessionState {
		self.state
	}

	/// Check if the session is open.
	pub fn is_open(&self) -> bool {
		self.state == SessionState::Open
	}

	/// The parameters of the open connection, if any.
	pub fn parameters(&self) -> Option<&ConnectionParameters> {
		self.active.as_ref().map(|active| &active.params)
	}

	/// The configuration of the session.
	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Open the port and start reading from it.
	///
	/// On failure the error is also delivered to the event sink as an [`Event::ConnectionError`],
	/// and the session stays closed.
	/// Calling this on a session that is not closed fails with [`StartError::PortUnavailable`] without touching the open connection.
	pub fn start(&mut self, params: ConnectionParameters) -> Result<(), StartError> {
		if self.state != SessionState::Closed {
			return Err(StartError::PortUnavailable {
				params,
				source: std::io::Error::new(std::io::ErrorKind::AlreadyExists, "session is already open"),
			});
		}

		self.state = SessionState::Opening;
		debug!("opening serial port {}", params);
		match self.open(params) {
			Ok(active) => {
				info!("opened serial port {}", active.params);
				self.active = Some(active);
				self.state = SessionState::Open;
				Ok(())
			},
			Err(e) => {
				debug!("{}", e);
				self.state = SessionState::Closed;
				self.sink.deliver(Event::ConnectionError(ConnectionError::from(&e)));
				Err(e)
			},
		}
	}

	/// Write all bytes to the port, blocking until the platform has accepted them.
	pub fn send(&self, data: &[u8]) -> Result<(), SendError> {
		let active = match (&self.state, &self.active) {
			(SessionState::Open, Some(active)) => active,
			_ => return Err(SendError::NotConnected),
		};
		if data.is_empty() {
			return Ok(());
		}
		trace!("sending {} bytes to {}: {:02X?}", data.len(), active.params.port_name, data);
		active.transport.write_all(data)?;
		Ok(())
	}

	/// Stop reading, deliver any pending bytes and close the port.
	///
	/// The read thread is joined before the final flush, so no byte read before the call is lost.
	/// Stopping a closed session does nothing.
	pub fn stop(&mut self) {
		let Some(active) = self.active.take() else {
			return;
		};
		self.state = SessionState::Closing;

		let Active {
			params,
			transport,
			aggregator,
			stop_reader,
			ticker_control,
			reader,
			ticker,
			claim,
		} = active;
		debug!("closing serial port {}", params);

		stop_reader.store(true, Ordering::Release);
		if reader.join().is_err() {
			error!("read thread of {} panicked", params.port_name);
		}

		// Reports queued by the reader are delivered before the ticker sees this.
		// A send error only means the ticker already exited.
		let _ = ticker_control.send(TickerMessage::Stop);
		if ticker.join().is_err() {
			error!("flush timer of {} panicked", params.port_name);
		}

		if let Some(chunk) = aggregator.flush() {
			self.sink.deliver(Event::Data(chunk));
		}

		// Both worker threads are gone, so this is the last reference and the port closes here.
		drop(transport);
		drop(claim);
		self.state = SessionState::Closed;
		info!("closed serial port {}", params.port_name);
	}

	fn open(&self, params: ConnectionParameters) -> Result<Active<S::Transport>, StartError> {
		let claim = match PortClaim::acquire(&params.port_name) {
			Ok(x) => x,
			Err(source) => return Err(StartError::PortUnavailable { params, source }),
		};

		let read_timeout = self.config.read_timeout.max(MIN_INTERVAL);
		let transport = match self.system.open(&params, read_timeout) {
			Ok(x) => x,
			Err(source) => return Err(StartError::PortUnavailable { params, source }),
		};
		if let Err(source) = transport.check_ready() {
			return Err(StartError::PortNotReady { params, source });
		}

		let transport = Arc::new(transport);
		let aggregator = Arc::new(Aggregator::new(self.config.flush_interval));
		let stop_reader = Arc::new(AtomicBool::new(false));
		let (ticker_control, ticker_messages) = mpsc::channel();

		let read_loop = ReadLoop {
			port_name: params.port_name.clone(),
			transport: transport.clone(),
			aggregator: aggregator.clone(),
			reports: ticker_control.clone(),
			stop: stop_reader.clone(),
			chunk_size: self.config.read_chunk_size.max(1),
			read_timeout,
			error_report_threshold: self.config.error_report_threshold,
		};
		let reader = match std::thread::Builder::new()
			.name(format!("portmon-reader {}", params.port_name))
			.spawn(move || read_loop.run())
		{
			Ok(x) => x,
			Err(source) => return Err(StartError::PortUnavailable { params, source }),
		};

		let ticker = {
			let aggregator = aggregator.clone();
			let sink = self.sink.clone();
			let interval = self.config.tick_interval.max(MIN_INTERVAL);
			std::thread::Builder::new()
				.name(format!("portmon-ticker {}", params.port_name))
				.spawn(move || tick_loop(&aggregator, &*sink, interval, ticker_messages))
		};
		let ticker = match ticker {
			Ok(x) => x,
			Err(source) => {
				stop_reader.store(true, Ordering::Release);
				let _ = reader.join();
				return Err(StartError::PortUnavailable { params, source });
			},
		};

		Ok(Active {
			params,
			transport,
			aggregator,
			stop_reader,
			ticker_control,
			reader,
			ticker,
			claim,
		})
	}
}

impl<S: System> Drop for Session<S> {
	fn drop(&mut self) {
		self.stop();
	}
}

/// The body of the read thread.
struct ReadLoop<T> {
	port_name: String,
	transport: Arc<T>,
	aggregator: Arc<Aggregator>,
	reports: mpsc::Sender<TickerMessage>,
	stop: Arc<AtomicBool>,
	chunk_size: usize,
	read_timeout: Duration,
	error_report_threshold: usize,
}

impl<T: Transport> ReadLoop<T> {
	/// Read until a stop is requested.
	///
	/// Read errors never end the loop: they are logged, and a persistent streak of them is reported once.
	fn run(self) {
		let mut buffer = vec![0; self.chunk_size];
		let mut failures = 0;

		while !self.stop.load(Ordering::Acquire) {
			match self.transport.read(&mut buffer) {
				Err(ReadError::Timeout) => failures = 0,
				// A read that ends before the timeout without data means the device hung up.
				Ok(0) => {
					let e = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "end of stream, the device may be disconnected");
					self.read_failed(&mut failures, &e);
				},
				Ok(count) => {
					failures = 0;
					trace!("read {} bytes from {}: {:02X?}", count, self.port_name, &buffer[..count]);
					self.aggregator.append(&buffer[..count]);
				},
				Err(ReadError::Io(e)) => self.read_failed(&mut failures, &e),
			}
		}
		trace!("read thread of {} exiting", self.port_name);
	}

	/// Count a failed read, report the streak once it reaches the threshold and back off.
	fn read_failed(&self, failures: &mut usize, error: &std::io::Error) {
		*failures += 1;
		debug!("failed to read from {} ({} in a row): {}", self.port_name, failures, error);
		if *failures == self.error_report_threshold {
			warn!("serial port {} keeps failing: {}", self.port_name, error);
			let report = ConnectionError::read_failure(&self.port_name, *failures, error);
			// A send error only means the ticker already exited.
			let _ = self.reports.send(TickerMessage::ReadFailure(report));
		}
		self.pause(self.read_timeout);
	}

	/// Sleep for up to `duration`, waking early when a stop is requested.
	fn pause(&self, duration: Duration) {
		let deadline = Instant::now() + duration;
		loop {
			if self.stop.load(Ordering::Acquire) {
				return;
			}
			let now = Instant::now();
			if now >= deadline {
				return;
			}
			std::thread::sleep((deadline - now).min(Duration::from_millis(10)));
		}
	}
}

/// A message to the flush timer thread.
enum TickerMessage {
	/// The read thread keeps failing.
	ReadFailure(ConnectionError),

	/// The session is closing.
	Stop,
}

/// The body of the flush timer thread.
///
/// This is the only thread that delivers events while the session is open.
/// Bytes read before a failure report are flushed ahead of it.
fn tick_loop(aggregator: &Aggregator, sink: &dyn EventSink, interval: Duration, messages: mpsc::Receiver<TickerMessage>) {
	loop {
		match messages.recv_timeout(interval) {
			Err(RecvTimeoutError::Timeout) => {
				if let Some(chunk) = aggregator.tick(Instant::now()) {
					sink.deliver(Event::Data(chunk));
				}
			},
			Ok(TickerMessage::ReadFailure(error)) => {
				if let Some(chunk) = aggregator.flush() {
					sink.deliver(Event::Data(chunk));
				}
				sink.deliver(Event::ConnectionError(error));
			},
			Ok(TickerMessage::Stop) | Err(RecvTimeoutError::Disconnected) => break,
		}
	}
}

/// Process wide registration of a port name, so two sessions never share a port.
#[derive(Debug)]
struct PortClaim {
	port_name: String,
}

fn claimed_ports() -> std::sync::MutexGuard<'static, HashSet<String>> {
	static CLAIMED: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
	CLAIMED
		.get_or_init(Mutex::default)
		.lock()
		.unwrap_or_else(|e| e.into_inner())
}

impl PortClaim {
	fn acquire(port_name: &str) -> std::io::Result<Self> {
		if !claimed_ports().insert(port_name.to_owned()) {
			return Err(std::io::Error::new(
				std::io::ErrorKind::AddrInUse,
				format!("{} is already used by another session", port_name),
			));
		}
		Ok(Self {
			port_name: port_name.to_owned(),
		})
	}
}

impl Drop for PortClaim {
	fn drop(&mut self) {
		claimed_ports().remove(&self.port_name);
	}
}
