// Logging is optional: with the `log` feature the macros forward to the `log` crate,
// without it they still type-check their arguments but emit nothing.

#[cfg(feature = "log")]
#[allow(unused)]
#[macro_use]
mod log {
	macro_rules! trace {
		($($args:tt)*) => { ::log::trace!($($args)*) }
	}

	macro_rules! debug {
		($($args:tt)*) => { ::log::debug!($($args)*) }
	}

	macro_rules! info {
		($($args:tt)*) => { ::log::info!($($args)*) }
	}

	macro_rules! warn {
		($($args:tt)*) => { ::log::warn!($($args)*) }
	}

	macro_rules! error {
		($($args:tt)*) => { ::log::error!($($args)*) }
	}
}

#[cfg(not(feature = "log"))]
#[allow(unused)]
#[macro_use]
mod log {
	macro_rules! trace {
		($($args:tt)*) => { { let _ = format_args!($($args)*); } }
	}

	macro_rules! debug {
		($($args:tt)*) => { { let _ = format_args!($($args)*); } }
	}

	macro_rules! info {
		($($args:tt)*) => { { let _ = format_args!($($args)*); } }
	}

	macro_rules! warn {
		($($args:tt)*) => { { let _ = format_args!($($args)*); } }
	}

	macro_rules! error {
		($($args:tt)*) => { { let _ = format_args!($($args)*); } }
	}
}
