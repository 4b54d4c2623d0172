
extern crate dcax;

use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use dcax::devices::n1000a::N1000A;
use dcax::export;

pub const DEFAULT_CHANNEL:&str = "CHAN1A";
pub const DEFAULT_POINTS:u32 = 10_000;
pub const DEFAULT_TIMEOUT:Duration = Duration::from_secs(20);

pub fn main() {
	env_logger::init();

	// TODO: take the timeout from the command line as well
	let mut args = env::args().skip(1);
	let addr:String = match args.next() {
		Some(a) => a,
		None => {
			eprintln!("usage: single_capture <host[:port]> [channel] [points]");
			process::exit(2);
		}
	};
	let channel:String = args.next().unwrap_or_else(|| DEFAULT_CHANNEL.to_owned());
	let points:u32 = match args.next() {
		Some(p) => match p.parse() {
			Ok(n) => n,
			Err(_) => {
				eprintln!("point count must be a positive integer, got {:?}", p);
				process::exit(2);
			}
		},
		None => DEFAULT_POINTS,
	};

	// Only a connection failure aborts; everything after this degrades
	let mut scope = match N1000A::connect(&addr, DEFAULT_TIMEOUT) {
		Ok(s) => s,
		Err(e) => {
			eprintln!("{}", e);
			process::exit(1);
		}
	};
	println!("Connected to: {}", scope.identity_string());
	if let Some(id) = scope.identity() {
		eprintln!("{}", serde_json::to_string_pretty(&id).unwrap());
	}

	let record = scope.capture(&channel, points);

	if let Err(e) = scope.disconnect() {
		eprintln!("error closing instrument link: {}", e);
	}

	let stamp:String = export::run_timestamp();
	let csv_path:PathBuf = PathBuf::from(export::trace_filename(&stamp));
	let svg_path:PathBuf = PathBuf::from(export::plot_filename(&stamp));

	if let Err(e) = export::write_csv(&record, &csv_path) {
		eprintln!("unable to write {}: {}", csv_path.display(), e);
		process::exit(1);
	}
	println!("Waveform trace logged to: {}", csv_path.display());
	println!("Total points captured: {}", record.len());
	if let Some((t0, t1)) = record.time_span() {
		println!("Time range: {:.3e} to {:.3e} seconds", t0, t1);
	}
	if let Some((lo, hi)) = record.voltage_range() {
		println!("Voltage range: {:.3} to {:.3} V", lo, hi);
	}
	if record.samples_are_fallback {
		println!("WARNING: capture degraded to synthetic placeholder samples");
	}

	if let Err(e) = export::write_svg_plot(&record, &svg_path) {
		eprintln!("unable to write {}: {}", svg_path.display(), e);
		process::exit(1);
	}
	println!("Plot saved as: {}", svg_path.display());
}
