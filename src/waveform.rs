
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Serialize, Deserialize};

use crate::error::{CaptureError, Degraded};

// Scaling parameters substituted when any metadata query fails
pub const FALLBACK_X_INCREMENT:f64 = 1e-12;
pub const FALLBACK_X_ORIGIN:f64    = 0.0;
pub const FALLBACK_Y_INCREMENT:f64 = 1e-3;
pub const FALLBACK_Y_ORIGIN:f64    = 0.0;
pub const FALLBACK_Y_REFERENCE:f64 = 0.0;

// Shape of the synthetic trace substituted when fetch or decode fails
pub const FALLBACK_SAMPLE_COUNT:usize = 1000;
pub const FALLBACK_AMPLITUDE_V:f64    = 0.1;

const FALLBACK_SEED:u64 = 0x0dca;

/// Scaling parameters reported alongside a waveform record. Voltage samples
/// arrive already scaled; the x parameters define the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveformMetadata {
	pub x_increment: f64,
	pub x_origin: f64,
	pub y_increment: f64,
	pub y_origin: f64,
	pub y_reference: f64,
}

impl WaveformMetadata {

	pub fn fallback() -> Self {
		Self {
			x_increment: FALLBACK_X_INCREMENT,
			x_origin:    FALLBACK_X_ORIGIN,
			y_increment: FALLBACK_Y_INCREMENT,
			y_origin:    FALLBACK_Y_ORIGIN,
			y_reference: FALLBACK_Y_REFERENCE,
		}
	}

	/// Valid captures always report a positive time step.
	pub fn is_plausible(&self) -> bool {
		self.x_increment > 0.0
	}

}

/// Parse a waveform-data response into voltage samples.
///
/// Responses either carry a definite-length block header
/// (`'#' DIGIT LENGTH_DIGITS DATA`) or are a bare comma-separated float
/// list. The header skip is `digit + 2` characters from the start of the
/// response, matching the instrument dialect this crate targets.
pub fn decode(raw:&str) -> Result<Vec<f64>, CaptureError> {
	let body:&str = if raw.starts_with('#') {
		let digit:usize = match raw[1..].chars().next() {
			Some(c) => match c.to_digit(10) {
				Some(d) if d >= 1 && d <= 9 => d as usize,
				Some(d) => return Err(CaptureError::Decode(format!("block header digit {} out of range", d))),
				None => return Err(CaptureError::Decode(format!("block header has non-digit {:?} after the marker", c))),
			},
			None => return Err(CaptureError::Decode("block header ends after the marker".to_owned())),
		};

		match raw.get(digit + 2..) {
			Some(rest) => rest,
			None => return Err(CaptureError::Decode("block header longer than the response".to_owned())),
		}
	} else {
		raw.trim()
	};

	let mut samples:Vec<f64> = vec![];
	for token in body.split(',') {
		let token:&str = token.trim();
		if token.is_empty() {
			continue;
		}
		match token.parse::<f64>() {
			Ok(v)  => samples.push(v),
			Err(_) => return Err(CaptureError::Decode(format!("non-numeric sample {:?}", token))),
		}
	}

	Ok(samples)
}

/// Deterministic placeholder trace: zero-mean, small amplitude, fixed seed,
/// so repeated degraded runs produce identical files.
pub fn fallback_samples() -> Vec<f64> {
	let mut rng:StdRng = StdRng::seed_from_u64(FALLBACK_SEED);
	(0..FALLBACK_SAMPLE_COUNT).map(|_| rng.gen_range(-1.0..1.0) * FALLBACK_AMPLITUDE_V).collect()
}

/// Decode the fetched response, substituting the synthetic trace on any
/// upstream or parse failure so the pipeline always reaches export.
pub fn decode_with_fallback(raw:Result<String, CaptureError>) -> Degraded<Vec<f64>> {
	match raw.and_then(|text| decode(&text)) {
		Ok(samples) => Degraded::Live(samples),
		Err(e) => Degraded::Fallback { value: fallback_samples(), reason: e.to_string() },
	}
}

/// The immutable result of one capture run, consumed by the exporters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRecord {
	pub instrument_id: String,
	pub channel: String,
	pub metadata: WaveformMetadata,
	pub metadata_is_fallback: bool,
	pub samples_are_fallback: bool,
	pub points: Vec<(f64, f64)>,
}

impl CaptureRecord {

	/// Pair voltages with the linear time axis
	/// `time[i] = x_origin + i * x_increment`. Voltage is taken in the unit
	/// the instrument reported; no further y-scaling is applied.
	pub fn assemble(samples:Degraded<Vec<f64>>, metadata:Degraded<WaveformMetadata>, channel:&str, instrument_id:&str) -> Self {
		let samples_are_fallback:bool = samples.is_fallback();
		let metadata_is_fallback:bool = metadata.is_fallback();

		let meta:WaveformMetadata = metadata.into_value();
		let volts:Vec<f64>        = samples.into_value();

		let points:Vec<(f64, f64)> = volts.iter().enumerate()
			.map(|(i, v)| (meta.x_origin + (i as f64) * meta.x_increment, *v))
			.collect();

		Self {
			instrument_id: instrument_id.to_owned(),
			channel: channel.to_owned(),
			metadata: meta,
			metadata_is_fallback,
			samples_are_fallback,
			points,
		}
	}

	pub fn len(&self) -> usize { self.points.len() }

	pub fn is_empty(&self) -> bool { self.points.is_empty() }

	pub fn voltage_range(&self) -> Option<(f64, f64)> {
		if self.points.is_empty() {
			return None;
		}
		let mut lo:f64 = f64::INFINITY;
		let mut hi:f64 = f64::NEG_INFINITY;
		for (_, v) in &self.points {
			if *v < lo { lo = *v; }
			if *v > hi { hi = *v; }
		}
		Some((lo, hi))
	}

	pub fn time_span(&self) -> Option<(f64, f64)> {
		match (self.points.first(), self.points.last()) {
			(Some((t0, _)), Some((t1, _))) => Some((*t0, *t1)),
			_ => None,
		}
	}

}
