use portmon::{Parity, StopBits};
use std::path::PathBuf;

/// Monitor and talk to serial ports.
#[derive(clap::Parser)]
#[command(author, version)]
pub struct Options {
	/// Show more messages. Can be given twice.
	#[arg(long, short)]
	#[arg(global = true)]
	#[arg(action = clap::ArgAction::Count)]
	pub verbose: u8,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(clap::Subcommand)]
pub enum Command {
	/// List the available serial ports and the settings they support.
	List,

	/// Print everything received on a serial port, and send lines typed on standard input.
	///
	/// Settings that are not given default to 9600 baud 8N1,
	/// or the first supported value if the port does not support those.
	Monitor(MonitorOptions),

	/// Write shell completions to a file or standard output.
	ShellCompletion {
		/// The shell for which to generate completions.
		#[arg(long)]
		shell: clap_complete::Shell,

		/// The file to write the generated completion file to.
		#[arg(long, short)]
		output: Option<PathBuf>,
	},
}

#[derive(clap::Args)]
pub struct MonitorOptions {
	/// The serial port to open. Defaults to the first port found.
	#[arg(long, short)]
	pub port: Option<String>,

	/// The baud rate.
	#[arg(long, short)]
	pub baud_rate: Option<u32>,

	/// The number of data bits per character.
	#[arg(long)]
	#[arg(value_parser = clap::value_parser!(u8).range(5..=8))]
	pub data_bits: Option<u8>,

	/// The parity mode: none, odd, even, mark or space.
	#[arg(long)]
	pub parity: Option<Parity>,

	/// The number of stop bits: 1, 1.5 or 2.
	#[arg(long)]
	pub stop_bits: Option<StopBits>,

	/// Show received data as a hex dump instead of text.
	#[arg(long)]
	pub hex: bool,

	/// Interpret input lines as space separated hexadecimal bytes instead of text.
	#[arg(long)]
	pub send_hex: bool,

	/// Deliver received data after the port was quiet for this many milliseconds.
	#[arg(long, value_name = "MS")]
	#[arg(default_value = "100")]
	pub flush_interval: u64,

	/// The timeout of a single read in milliseconds.
	#[arg(long, value_name = "MS")]
	#[arg(default_value = "100")]
	#[arg(value_parser = clap::value_parser!(u64).range(1..))]
	pub read_timeout: u64,
}
