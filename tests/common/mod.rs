pub mod mock;

use portmon::Event;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Collect all events that arrive within `duration`.
#[allow(unused)]
pub fn collect_for(events: &Receiver<Event>, duration: Duration) -> Vec<Event> {
	let deadline = Instant::now() + duration;
	let mut collected = Vec::new();
	loop {
		let remaining = deadline.saturating_duration_since(Instant::now());
		match events.recv_timeout(remaining) {
			Ok(event) => collected.push(event),
			Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return collected,
		}
	}
}

/// Wait until `condition` holds, or panic after one second.
#[allow(unused)]
pub fn wait_until(mut condition: impl FnMut() -> bool) {
	let deadline = Instant::now() + Duration::from_secs(1);
	while !condition() {
		assert!(Instant::now() < deadline, "condition not reached within one second");
		std::thread::sleep(Duration::from_millis(1));
	}
}
