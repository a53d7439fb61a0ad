//! Serial port data acquisition.
//!
//! A [`Session`] opens a serial port, reads from it on a dedicated thread and
//! coalesces the received bytes into [`RawChunk`]s with an [`Aggregator`].
//! A chunk is delivered to an [`EventSink`] once the port has been quiet for a short while,
//! so a burst of tiny reads reaches the consumer as one event.
//! Data can be written back to the port with [`Session::send()`].
//!
//! Use [`list_ports()`] to find the available ports and the settings they support.
//!
//! ```no_run
//! use portmon::{ConnectionParameters, Event, Session, SessionConfig};
//!
//! let (events, received) = std::sync::mpsc::channel();
//! let mut session = Session::with_default_system(SessionConfig::default(), events);
//! session.start(ConnectionParameters::new("/dev/ttyUSB0", 115200))?;
//! session.send(b"AT\r\n")?;
//! if let Ok(Event::Data(chunk)) = received.recv() {
//! 	println!("{:02X?}", chunk.as_bytes());
//! }
//! session.stop();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[macro_use]
mod log;

pub mod aggregator;
pub mod event;
pub mod ports;
pub mod session;
pub mod systems;

mod error;
mod settings;

pub use aggregator::{Aggregator, RawChunk};
pub use error::{ConnectionError, ConnectionErrorKind, ReadError, SendError, StartError};
pub use event::{Event, EventSink};
pub use ports::{list_ports, list_ports_with, probe_port, probe_port_with, PortCapabilities, PortDescriptor};
pub use session::{Session, SessionConfig, SessionState};
pub use settings::{ConnectionParameters, Parity, StopBits};
pub use systems::serial2::Serial2System;
pub use systems::{System, Transport};
