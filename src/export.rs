
use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::Local;
use log::info;

use crate::waveform::CaptureRecord;

// Plot geometry in SVG user units
const PLOT_W:f64  = 1200.0;
const PLOT_H:f64  = 600.0;
const MARGIN:f64  = 60.0;

/// One timestamp names every artifact of a run.
pub fn run_timestamp() -> String {
	Local::now().format("%Y%m%d_%H%M%S").to_string()
}

pub fn trace_filename(timestamp:&str) -> String {
	format!("n1000a_trace_{}.csv", timestamp)
}

pub fn plot_filename(timestamp:&str) -> String {
	format!("n1000a_plot_{}.svg", timestamp)
}

/// Write the record as a two-column CSV under a commented metadata header.
/// Times carry 12 fractional digits, voltages 6, both in scientific
/// notation.
pub fn write_csv(record:&CaptureRecord, path:&Path) -> csv::Result<()> {
	let mut file = File::create(path)?;

	writeln!(file, "# DCA-X Waveform Capture")?;
	writeln!(file, "# Timestamp: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
	writeln!(file, "# Instrument: {}", record.instrument_id)?;
	writeln!(file, "# Channel: {}", record.channel)?;
	writeln!(file, "# X Increment: {}", record.metadata.x_increment)?;
	writeln!(file, "# X Origin: {}", record.metadata.x_origin)?;
	writeln!(file, "# Y Increment: {}", record.metadata.y_increment)?;
	writeln!(file, "# Y Origin: {}", record.metadata.y_origin)?;
	writeln!(file, "# Y Reference: {}", record.metadata.y_reference)?;
	writeln!(file, "# Number of Points: {}", record.len())?;
	if record.samples_are_fallback {
		writeln!(file, "# WARNING: synthetic placeholder samples")?;
	}
	if record.metadata_is_fallback {
		writeln!(file, "# WARNING: default scaling parameters")?;
	}
	writeln!(file, "#")?;

	let mut wtr = csv::Writer::from_writer(file);
	wtr.write_record(&["Time(s)", "Voltage(V)"])?;
	for (t, v) in &record.points {
		wtr.write_record(&[format!("{:.12e}", t), format!("{:.6e}", v)])?;
	}
	wtr.flush()?;

	info!("waveform trace logged to {}", path.display());
	Ok(())
}

/// Render the record as an SVG polyline, time in nanoseconds against
/// voltage.
pub fn write_svg_plot(record:&CaptureRecord, path:&Path) -> std::io::Result<()> {
	let (t0, t1) = record.time_span().unwrap_or((0.0, 1.0));
	let (v0, v1) = record.voltage_range().unwrap_or((-1.0, 1.0));

	let t0_ns:f64 = t0 * 1e9;
	let t1_ns:f64 = t1 * 1e9;
	let t_span:f64 = if t1_ns > t0_ns { t1_ns - t0_ns } else { 1.0 };
	let v_span:f64 = if v1 > v0 { v1 - v0 } else { 1.0 };

	let mut points:String = String::new();
	for (t, v) in &record.points {
		let x:f64 = MARGIN + ((t * 1e9 - t0_ns) / t_span) * (PLOT_W - 2.0 * MARGIN);
		let y:f64 = (PLOT_H - MARGIN) - ((v - v0) / v_span) * (PLOT_H - 2.0 * MARGIN);
		points.push_str(&format!("{:.2},{:.2} ", x, y));
	}

	let mut file = File::create(path)?;
	writeln!(file, "<svg xmlns='http://www.w3.org/2000/svg' width='{}' height='{}' viewBox='0 0 {} {}'>", PLOT_W, PLOT_H, PLOT_W, PLOT_H)?;
	writeln!(file, "<rect width='100%' height='100%' fill='white'/>")?;
	writeln!(file, "<line x1='{m}' y1='{b}' x2='{r}' y2='{b}' stroke='black'/>", m = MARGIN, b = PLOT_H - MARGIN, r = PLOT_W - MARGIN)?;
	writeln!(file, "<line x1='{m}' y1='{t}' x2='{m}' y2='{b}' stroke='black'/>", m = MARGIN, t = MARGIN, b = PLOT_H - MARGIN)?;
	writeln!(file, "<polyline fill='none' stroke='steelblue' stroke-width='1' points='{}'/>", points.trim_end())?;
	writeln!(file, "<text x='{}' y='{}' text-anchor='middle'>Time (ns)</text>", PLOT_W / 2.0, PLOT_H - MARGIN / 3.0)?;
	writeln!(file, "<text x='{}' y='{}' text-anchor='middle' transform='rotate(-90 {} {})'>Voltage (V)</text>", MARGIN / 3.0, PLOT_H / 2.0, MARGIN / 3.0, PLOT_H / 2.0)?;
	writeln!(file, "<text x='{}' y='{}' text-anchor='middle'>DCA-X Captured Waveform - {}</text>", PLOT_W / 2.0, MARGIN / 2.0, record.channel)?;
	writeln!(file, "</svg>")?;

	info!("plot saved as {}", path.display());
	Ok(())
}

#[cfg(test)]
mod tests {

	use std::env;
	use std::fs;
	use std::path::PathBuf;

	use crate::error::Degraded;
	use crate::waveform::{CaptureRecord, WaveformMetadata};

	use super::*;

	fn sample_record() -> CaptureRecord {
		let meta = WaveformMetadata {
			x_increment: 1e-12,
			x_origin:    0.0,
			y_increment: 1e-3,
			y_origin:    0.0,
			y_reference: 0.0,
		};
		CaptureRecord::assemble(
			Degraded::Live(vec![0.1, 0.2, 0.3]),
			Degraded::Live(meta),
			"CHAN1A",
			"ACME,N1000A,SN123,1.0",
		)
	}

	fn scratch_path(name:&str) -> PathBuf {
		env::temp_dir().join(format!("dcax_{}_{}", std::process::id(), name))
	}

	#[test]
	fn csv_has_commented_header_and_formatted_rows() {
		let path = scratch_path("trace.csv");
		write_csv(&sample_record(), &path).unwrap();

		let text = fs::read_to_string(&path).unwrap();
		assert!(text.contains("# Instrument: ACME,N1000A,SN123,1.0"));
		assert!(text.contains("# Channel: CHAN1A"));
		assert!(text.contains("# Number of Points: 3"));
		assert!(text.contains("Time(s),Voltage(V)"));
		assert!(text.contains("1.000000000000e-12,2.000000e-1"));
		assert!(!text.contains("WARNING"));

		let _ = fs::remove_file(&path);
	}

	#[test]
	fn csv_flags_degraded_runs() {
		let mut record = sample_record();
		record.samples_are_fallback = true;
		record.metadata_is_fallback = true;

		let path = scratch_path("degraded.csv");
		write_csv(&record, &path).unwrap();

		let text = fs::read_to_string(&path).unwrap();
		assert!(text.contains("# WARNING: synthetic placeholder samples"));
		assert!(text.contains("# WARNING: default scaling parameters"));

		let _ = fs::remove_file(&path);
	}

	#[test]
	fn svg_plot_contains_the_polyline() {
		let path = scratch_path("plot.svg");
		write_svg_plot(&sample_record(), &path).unwrap();

		let text = fs::read_to_string(&path).unwrap();
		assert!(text.starts_with("<svg"));
		assert!(text.contains("<polyline"));
		assert!(text.contains("Time (ns)"));
		assert!(text.contains("CHAN1A"));

		let _ = fs::remove_file(&path);
	}

	#[test]
	fn artifact_names_share_the_timestamp() {
		let stamp = run_timestamp();
		assert_eq!(stamp.len(), "20260101_120000".len());
		assert_eq!(trace_filename(&stamp), format!("n1000a_trace_{}.csv", stamp));
		assert_eq!(plot_filename(&stamp), format!("n1000a_plot_{}.svg", stamp));
	}

}
