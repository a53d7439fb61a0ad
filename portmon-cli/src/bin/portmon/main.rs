use portmon::{ConnectionParameters, Event, PortDescriptor, Session, SessionConfig};
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

mod logging;
mod options;
mod render;

use options::{Command, MonitorOptions, Options};

fn main() {
	if let Err(()) = do_main(clap::Parser::parse()) {
		std::process::exit(1);
	}
}

fn do_main(options: Options) -> Result<(), ()> {
	logging::init(module_path!(), options.verbose);
	match &options.command {
		Command::List => {
			let ports = portmon::list_ports();
			if ports.is_empty() {
				log::warn!("No serial ports found");
			}
			for port in &ports {
				log_port(port);
			}
		},
		Command::Monitor(monitor_options) => {
			monitor(monitor_options)?;
		},
		Command::ShellCompletion { shell, output } => {
			write_shell_completion(*shell, output.as_deref())?;
		},
	}

	Ok(())
}

fn monitor(options: &MonitorOptions) -> Result<(), ()> {
	let params = connection_parameters(options)?;
	let config = SessionConfig::default()
		.with_flush_interval(Duration::from_millis(options.flush_interval))
		.with_read_timeout(Duration::from_millis(options.read_timeout));

	let (events, received) = mpsc::channel();
	let mut session = Session::with_default_system(config, events);
	session.start(params.clone()).map_err(|e| log::error!("{}", e))?;
	log::info!("Connected to {}. Type a line to send it, end the input to quit.", params);

	let hex = options.hex;
	let printer = std::thread::spawn(move || print_events(received, hex));
	forward_input(&session, options.send_hex);

	// Dropping the session also drops the event sender, which ends the printer.
	drop(session);
	printer.join().map_err(|_| log::error!("Output thread panicked"))?;
	log::debug!("Disconnected from {}", params.port_name);
	Ok(())
}

/// Fill in the settings that were not given on the command line.
fn connection_parameters(options: &MonitorOptions) -> Result<ConnectionParameters, ()> {
	let complete = options.baud_rate.is_some() && options.data_bits.is_some() && options.parity.is_some() && options.stop_bits.is_some();

	let mut params = match (&options.port, complete) {
		(Some(port), true) => ConnectionParameters::new(port.clone(), 9600),
		(Some(port), false) => match portmon::probe_port(port).map(|x| x.default_parameters()) {
			Ok(Some(x)) => x,
			Ok(None) => {
				log::debug!("Port {} reported no usable settings, assuming 9600 baud 8N1", port);
				ConnectionParameters::new(port.clone(), 9600)
			},
			Err(e) => {
				log::debug!("Failed to probe {}: {}, assuming 9600 baud 8N1", port, e);
				ConnectionParameters::new(port.clone(), 9600)
			},
		},
		(None, _) => {
			let ports = portmon::list_ports();
			ports
				.iter()
				.find_map(PortDescriptor::default_parameters)
				.ok_or_else(|| log::error!("No serial ports found, use --port to select one"))?
		},
	};

	if let Some(baud_rate) = options.baud_rate {
		params.baud_rate = baud_rate;
	}
	if let Some(data_bits) = options.data_bits {
		params.data_bits = data_bits;
	}
	if let Some(parity) = options.parity {
		params.parity = parity;
	}
	if let Some(stop_bits) = options.stop_bits {
		params.stop_bits = stop_bits;
	}
	Ok(params)
}

fn print_events(received: mpsc::Receiver<Event>, hex: bool) {
	let mut dump = render::HexDump::default();
	let stdout = std::io::stdout();
	for event in received {
		match event {
			Event::Data(chunk) => {
				let text = if hex {
					dump.render(chunk.as_bytes())
				} else {
					render::render_text(chunk.as_bytes())
				};
				let mut stdout = stdout.lock();
				if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
					log::error!("Failed to write to stdout: {}", e);
					return;
				}
			},
			Event::ConnectionError(e) => log::error!("{}", e),
		}
	}
}

fn forward_input(session: &Session<portmon::Serial2System>, send_hex: bool) {
	let stdin = std::io::stdin();
	for line in stdin.lock().lines() {
		let line = match line {
			Ok(x) => x,
			Err(e) => {
				log::error!("Failed to read from stdin: {}", e);
				return;
			},
		};

		let data = if send_hex {
			match render::parse_hex(&line) {
				Ok(x) => x,
				Err(e) => {
					log::error!("Not sent: {}", e);
					continue;
				},
			}
		} else {
			render::parse_text(&line)
		};

		log::debug!("Sending {} bytes", data.len());
		if let Err(e) = session.send(&data) {
			log::error!("Failed to send: {}", e);
		}
	}
}

fn log_port(port: &PortDescriptor) {
	fn join<T: ToString>(values: &[T]) -> String {
		values.iter().map(T::to_string).collect::<Vec<_>>().join(", ")
	}

	let caps = &port.capabilities;
	log::info!("{}", port.name);
	log::info!(" ├─ Baud rates: {}", join(&caps.baud_rates));
	log::info!(" ├─ Data bits: {}", join(&caps.data_bits));
	log::info!(" ├─ Parity: {}", join(&caps.parities));
	log::info!(" └─ Stop bits: {}", join(&caps.stop_bits));
}

fn write_shell_completion(shell: clap_complete::Shell, path: Option<&Path>) -> Result<(), ()> {
	use clap::CommandFactory;

	let mut script = Vec::new();
	clap_complete::generate(shell, &mut Options::command(), env!("CARGO_BIN_NAME"), &mut script);
	if script.last() != Some(&b'\n') {
		script.push(b'\n');
	}

	match path.filter(|path| *path != Path::new("-")) {
		None => {
			log::debug!("Writing {} completion script to stdout", shell);
			std::io::stdout()
				.lock()
				.write_all(&script)
				.map_err(|e| log::error!("Failed to write completion script to stdout: {}", e))
		},
		Some(path) => {
			log::debug!("Writing {} completion script to {}", shell, path.display());
			std::fs::write(path, &script).map_err(|e| log::error!("Failed to write completion script to {}: {}", path.display(), e))
		},
	}
}
