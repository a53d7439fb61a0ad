//! Coalescing of small serial reads into larger chunks.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// The default quiet period after which pending bytes are flushed.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(100);

/// A batch of received bytes, in the order they were read.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct RawChunk(Vec<u8>);

impl RawChunk {
	pub fn new(data: Vec<u8>) -> Self {
		Self(data)
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	pub fn into_bytes(self) -> Vec<u8> {
		self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl AsRef<[u8]> for RawChunk {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl From<RawChunk> for Vec<u8> {
	fn from(other: RawChunk) -> Self {
		other.0
	}
}

/// Thread-safe byte accumulator with a quiescence based flush policy.
///
/// Bytes are collected with [`append()`](Self::append) and handed out as a [`RawChunk`]
/// once no new data arrived for longer than the flush interval (see [`tick()`](Self::tick)),
/// or unconditionally with [`flush()`](Self::flush).
/// A burst of many tiny reads therefore becomes one chunk, and an idle port never produces empty chunks.
///
/// The aggregator never performs I/O while holding its lock: chunks are returned to the caller to deliver.
#[derive(Debug)]
pub struct Aggregator {
	flush_interval: Duration,
	state: Mutex<Pending>,
}

#[derive(Debug)]
struct Pending {
	data: Vec<u8>,
	last_append: Option<Instant>,
}

impl Aggregator {
	/// Create an aggregator that flushes after `flush_interval` of silence.
	pub fn new(flush_interval: Duration) -> Self {
		Self {
			flush_interval,
			state: Mutex::new(Pending {
				data: Vec::new(),
				last_append: None,
			}),
		}
	}

	/// The configured quiet period.
	pub fn flush_interval(&self) -> Duration {
		self.flush_interval
	}

	/// Add bytes to the pending buffer.
	pub fn append(&self, data: &[u8]) {
		if data.is_empty() {
			return;
		}
		let mut state = self.lock();
		state.data.extend_from_slice(data);
		state.last_append = Some(Instant::now());
	}

	/// Flush the pending bytes if the last append was more than the flush interval before `now`.
	///
	/// Returns `None` if the buffer is empty or data arrived too recently.
	pub fn tick(&self, now: Instant) -> Option<RawChunk> {
		let mut state = self.lock();
		let quiet = match state.last_append {
			Some(last_append) => now.saturating_duration_since(last_append) > self.flush_interval,
			None => true,
		};
		if quiet {
			take(&mut state)
		} else {
			None
		}
	}

	/// Take all pending bytes, regardless of timing.
	///
	/// Returns `None` instead of an empty chunk if nothing is pending.
	pub fn flush(&self) -> Option<RawChunk> {
		take(&mut self.lock())
	}

	/// The number of bytes waiting to be flushed.
	pub fn pending_len(&self) -> usize {
		self.lock().data.len()
	}

	/// The moment of the most recent non-empty append.
	pub fn last_append(&self) -> Option<Instant> {
		self.lock().last_append
	}

	fn lock(&self) -> MutexGuard<'_, Pending> {
		// The pending data is always left consistent, so a poisoned lock is still usable.
		self.state.lock().unwrap_or_else(|e| e.into_inner())
	}
}

impl Default for Aggregator {
	fn default() -> Self {
		Self::new(DEFAULT_FLUSH_INTERVAL)
	}
}

fn take(state: &mut Pending) -> Option<RawChunk> {
	if state.data.is_empty() {
		None
	} else {
		Some(RawChunk(std::mem::take(&mut state.data)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert2::{assert, let_assert};

	const F: Duration = Duration::from_millis(100);

	#[test]
	fn tick_waits_for_quiescence_after_last_append() {
		let aggregator = Aggregator::new(F);
		for burst in 0..5u8 {
			aggregator.append(&[burst; 3]);
			let_assert!(Some(last) = aggregator.last_append());
			assert!(aggregator.tick(last).is_none());
			assert!(aggregator.tick(last + F / 2).is_none());
			assert!(aggregator.tick(last + F).is_none());
		}
		assert!(aggregator.pending_len() == 15);

		let_assert!(Some(last) = aggregator.last_append());
		let_assert!(Some(chunk) = aggregator.tick(last + F + Duration::from_millis(1)));
		assert!(chunk.len() == 15);
		assert!(aggregator.pending_len() == 0);
	}

	#[test]
	fn tick_is_relative_to_last_append() {
		let aggregator = Aggregator::new(F);
		aggregator.append(b"A");
		let_assert!(Some(first) = aggregator.last_append());
		std::thread::sleep(Duration::from_millis(5));
		aggregator.append(b"B");
		let_assert!(Some(second) = aggregator.last_append());
		assert!(second > first);

		assert!(aggregator.tick(second + F).is_none());
		let_assert!(Some(chunk) = aggregator.tick(second + F + Duration::from_millis(1)));
		assert!(chunk.as_bytes() == b"AB");
	}

	#[test]
	fn flush_returns_appended_bytes_in_order() {
		let aggregator = Aggregator::default();
		aggregator.append(&[1, 2, 3]);
		aggregator.append(&[]);
		aggregator.append(&[4]);
		aggregator.append(&[5, 6]);
		let_assert!(Some(chunk) = aggregator.flush());
		assert!(chunk.into_bytes() == [1, 2, 3, 4, 5, 6]);
		assert!(aggregator.pending_len() == 0);

		aggregator.append(&[7]);
		let_assert!(Some(chunk) = aggregator.flush());
		assert!(chunk.as_bytes() == [7]);
	}

	#[test]
	fn empty_buffer_never_produces_a_chunk() {
		let aggregator = Aggregator::new(F);
		assert!(aggregator.flush().is_none());
		assert!(aggregator.tick(Instant::now() + F * 10).is_none());

		aggregator.append(&[]);
		assert!(aggregator.last_append().is_none());
		assert!(aggregator.flush().is_none());

		aggregator.append(&[0x41]);
		assert!(aggregator.flush().is_some());
		assert!(aggregator.flush().is_none());
	}
}
