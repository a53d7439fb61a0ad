//! Delivery of received data and connection problems to the consumer.

use crate::{ConnectionError, RawChunk};
use std::sync::mpsc;

/// Something a [`Session`](crate::Session) reports to its consumer.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Event {
	/// A chunk of received bytes.
	Data(RawChunk),

	/// The port could not be opened, or it keeps failing while open.
	ConnectionError(ConnectionError),
}

/// The receiving end of session events.
///
/// Chunks are delivered in the order the bytes were read, from at most one thread at a time.
/// A report of failing reads comes after every chunk read before the failures.
/// Implementations should return quickly:
/// hand the event to another thread (for example through a channel) instead of rendering it in place.
/// A bounded channel must be drained by a thread other than the one that stops the session,
/// or stopping may wait forever for room in the channel.
pub trait EventSink: Send + Sync {
	fn deliver(&self, event: Event);
}

impl EventSink for mpsc::Sender<Event> {
	fn deliver(&self, event: Event) {
		if self.send(event).is_err() {
			debug!("event receiver is gone, dropping event");
		}
	}
}

impl EventSink for mpsc::SyncSender<Event> {
	fn deliver(&self, event: Event) {
		if self.send(event).is_err() {
			debug!("event receiver is gone, dropping event");
		}
	}
}

impl<F> EventSink for F
where
	F: Fn(Event) + Send + Sync,
{
	fn deliver(&self, event: Event) {
		self(event)
	}
}

impl Event {
	/// The chunk, if this is a data event.
	pub fn into_data(self) -> Option<RawChunk> {
		match self {
			Self::Data(x) => Some(x),
			Self::ConnectionError(_) => None,
		}
	}
}
