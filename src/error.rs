use crate::ConnectionParameters;

/// An error that can occur while starting a [`Session`](crate::Session).
#[derive(Debug)]
pub enum StartError {
	/// The port could not be opened or claimed with the given parameters.
	PortUnavailable {
		params: ConnectionParameters,
		source: std::io::Error,
	},

	/// The port was opened, but it reports that it is not ready for use.
	PortNotReady {
		params: ConnectionParameters,
		source: std::io::Error,
	},
}

/// An error that can occur while sending data through a [`Session`](crate::Session).
#[derive(Debug)]
pub enum SendError {
	/// The session is not open.
	NotConnected,

	/// The platform reported a failure while writing.
	Write(std::io::Error),
}

/// An error reported by a [`Transport`](crate::Transport) while reading.
#[derive(Debug)]
pub enum ReadError {
	/// No data arrived before the read timeout expired.
	Timeout,

	/// Any other I/O error.
	Io(std::io::Error),
}

/// The kind of failure carried by a [`ConnectionError`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ConnectionErrorKind {
	PortUnavailable,
	PortNotReady,
	ReadFailure,
}

/// A connection problem reported to the event sink.
///
/// Unlike [`StartError`] this is a plain description that can be cloned and moved to another thread.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConnectionError {
	pub port_name: String,
	pub kind: ConnectionErrorKind,
	pub message: String,
}

impl StartError {
	/// The parameters that were used for the failed attempt.
	pub fn params(&self) -> &ConnectionParameters {
		match self {
			Self::PortUnavailable { params, .. } => params,
			Self::PortNotReady { params, .. } => params,
		}
	}

	/// The underlying I/O error.
	pub fn io_error(&self) -> &std::io::Error {
		match self {
			Self::PortUnavailable { source, .. } => source,
			Self::PortNotReady { source, .. } => source,
		}
	}
}

impl ConnectionError {
	pub(crate) fn read_failure(port_name: &str, failures: usize, error: &std::io::Error) -> Self {
		Self {
			port_name: port_name.to_owned(),
			kind: ConnectionErrorKind::ReadFailure,
			message: format!("{} consecutive read failures on {}, last error: {}", failures, port_name, error),
		}
	}
}

impl std::error::Error for StartError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		Some(self.io_error())
	}
}

impl std::error::Error for SendError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::NotConnected => None,
			Self::Write(e) => Some(e),
		}
	}
}

impl std::error::Error for ReadError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Timeout => None,
			Self::Io(e) => Some(e),
		}
	}
}

impl std::error::Error for ConnectionError {}

impl From<&StartError> for ConnectionError {
	fn from(other: &StartError) -> Self {
		let kind = match other {
			StartError::PortUnavailable { .. } => ConnectionErrorKind::PortUnavailable,
			StartError::PortNotReady { .. } => ConnectionErrorKind::PortNotReady,
		};
		Self {
			port_name: other.params().port_name.clone(),
			kind,
			message: other.to_string(),
		}
	}
}

impl From<std::io::Error> for ReadError {
	fn from(other: std::io::Error) -> Self {
		if other.kind() == std::io::ErrorKind::TimedOut {
			Self::Timeout
		} else {
			Self::Io(other)
		}
	}
}

impl From<std::io::Error> for SendError {
	fn from(other: std::io::Error) -> Self {
		Self::Write(other)
	}
}

impl std::fmt::Display for StartError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::PortUnavailable { params, source } => write!(f, "failed to open serial port {}: {}", params, source),
			Self::PortNotReady { params, source } => write!(f, "serial port {} is not ready: {}", params, source),
		}
	}
}

impl std::fmt::Display for SendError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::NotConnected => write!(f, "serial port is not connected"),
			Self::Write(e) => write!(f, "failed to write to serial port: {}", e),
		}
	}
}

impl std::fmt::Display for ReadError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Timeout => write!(f, "timeout while reading from serial port"),
			Self::Io(e) => write!(f, "failed to read from serial port: {}", e),
		}
	}
}

impl std::fmt::Display for ConnectionErrorKind {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::PortUnavailable => write!(f, "port unavailable"),
			Self::PortNotReady => write!(f, "port not ready"),
			Self::ReadFailure => write!(f, "read failure"),
		}
	}
}

impl std::fmt::Display for ConnectionError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "{}: {}", self.kind, self.message)
	}
}
