
extern crate regex;

use std::time::Duration;

use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;
use serde::{Serialize, Deserialize};

use crate::clock::{Clock, SystemClock};
use crate::error::{CaptureError, Degraded, TransportError};
use crate::scpi::Transport;
use crate::scpi::socket::ScpiSocket;
use crate::waveform::{self, CaptureRecord, WaveformMetadata};

lazy_static! {
    static ref IDN_RE: Regex = Regex::new("([^,]+),([^,]+),([^,]+),([^,\\s]+)").unwrap();
}

// Settle intervals after state-changing commands
pub const RESET_SETTLE:Duration = Duration::from_secs(2);
pub const ARM_SETTLE:Duration   = Duration::from_secs(3);

// Acquisition polling policy. The ceiling bounds total wall-clock wait
// independently of the per-query transport timeout.
pub const POLL_INTERVAL:Duration        = Duration::from_secs(1);
pub const MAX_POLL_WAIT:Duration        = Duration::from_secs(30);
pub const STATUS_FALLBACK_WAIT:Duration = Duration::from_secs(5);

// Status replies that mean the acquisition has stopped
const TERMINAL_STATES:[&str; 3] = ["STOP", "STOPPED", "0"];

/// How the polling step ended. None of these is fatal; the caller fetches
/// regardless, since some instruments never expose a reliable status query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AcquisitionOutcome {
	Completed,
	TimedOut,
	FallbackAssumedComplete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
	pub manufacturer: String,
	pub model: String,
	pub serial_num: String,
	pub fw_version: String,
}

impl Identity {

	/// Parse a comma-separated `*IDN?` reply. Replies that do not follow
	/// the four-field convention are left unparsed.
	pub fn parse(idn:&str) -> Option<Self> {
		let caps = IDN_RE.captures(idn)?;

		Some(Self {
			manufacturer: caps.get(1)?.as_str().trim().to_owned(),
			model:        caps.get(2)?.as_str().trim().to_owned(),
			serial_num:   caps.get(3)?.as_str().trim().to_owned(),
			fw_version:   caps.get(4)?.as_str().trim().to_owned(),
		})
	}

}

/// Controller for one DCA-X session. Owns the transport for the life of the
/// session and releases it exactly once, through `disconnect` or `Drop`.
pub struct N1000A<T: Transport> {
	transport: T,
	clock: Box<dyn Clock>,
	instrument_id: String,
	closed: bool,
}

impl N1000A<ScpiSocket> {

	/// Open the raw-socket link and identify the instrument. `timeout`
	/// bounds every individual query for the life of the session.
	pub fn connect(addr:&str, timeout:Duration) -> Result<Self, CaptureError> {
		let transport = ScpiSocket::connect(addr, timeout)
			.map_err(|e| CaptureError::Connection(format!("unable to open {}: {}", addr, e)))?;

		Self::over(transport, Box::new(SystemClock::new()))
	}

}

impl<T: Transport> N1000A<T> {

	/// Build a session over an already-open transport. The identification
	/// query must return a non-empty reply; anything else is fatal and the
	/// transport is released before returning.
	pub fn over(mut transport:T, clock:Box<dyn Clock>) -> Result<Self, CaptureError> {
		let instrument_id:String = match transport.query("*IDN?") {
			Ok(resp) => resp.trim().to_owned(),
			Err(e) => {
				let _ = transport.close();
				return Err(CaptureError::Connection(format!("identification query failed: {}", e)));
			}
		};

		if instrument_id.is_empty() {
			let _ = transport.close();
			return Err(CaptureError::Connection("identification query returned no data".to_owned()));
		}

		info!("connected to: {}", instrument_id);

		Ok(Self { transport, clock, instrument_id, closed: false })
	}

	pub fn identity_string(&self) -> &str { &self.instrument_id }

	pub fn identity(&self) -> Option<Identity> { Identity::parse(&self.instrument_id) }

	/// Device reset and status clear, then a settle wait so the next
	/// command lands on a quiet instrument.
	pub fn reset_and_clear(&mut self) -> Result<(), TransportError> {
		self.transport.write("*RST")?;
		self.transport.write("*CLS")?;
		self.clock.sleep(RESET_SETTLE);
		Ok(())
	}

	/// Enable the channel display and start free-run acquisition, then let
	/// the acquisition stabilize.
	pub fn arm_channel(&mut self, channel:&str) -> Result<(), TransportError> {
		self.transport.write(&format!(":{}:DISP ON", channel))?;
		self.transport.write(":ACQ:RUN")?;
		self.clock.sleep(ARM_SETTLE);
		Ok(())
	}

	/// Issue the single trigger. Returns immediately; completion is
	/// observed by `wait_for_acquisition`.
	pub fn trigger_single(&mut self) -> Result<(), TransportError> {
		self.transport.write(":SING")
	}

	pub fn wait_for_acquisition(&mut self) -> AcquisitionOutcome {
		self.wait_for_acquisition_with(POLL_INTERVAL, MAX_POLL_WAIT)
	}

	/// Poll the acquisition state until it reports stopped or `max_wait`
	/// elapses. A failed status query gets one fixed wait instead of a
	/// retry loop, which bounds the run when the instrument never answers.
	pub fn wait_for_acquisition_with(&mut self, poll_interval:Duration, max_wait:Duration) -> AcquisitionOutcome {
		let start:Duration = self.clock.now();

		loop {
			match self.transport.query(":ACQ:STAT?") {
				Ok(state) => {
					let state:String = state.trim().to_uppercase();
					info!("acquisition state: {}", state);

					if TERMINAL_STATES.contains(&state.as_str()) {
						return AcquisitionOutcome::Completed;
					}
				},
				Err(e) => {
					warn!("status check error: {}", CaptureError::StatusQuery(e));
					self.clock.sleep(STATUS_FALLBACK_WAIT);
					return AcquisitionOutcome::FallbackAssumedComplete;
				},
			}

			if self.clock.now() - start > max_wait {
				warn!("timeout waiting for acquisition to complete");
				return AcquisitionOutcome::TimedOut;
			}

			self.clock.sleep(poll_interval);
		}
	}

	/// Select the source channel and set the ASCII/RAW export shape for the
	/// requested point count.
	pub fn configure_waveform_export(&mut self, channel:&str, points:u32) -> Result<(), TransportError> {
		self.transport.write(&format!(":WAV:SOUR {}", channel))?;
		self.transport.write(":WAV:FORM ASCII")?;
		self.transport.write(":WAV:MODE RAW")?;
		self.transport.write(":WAV:POIN:MODE RAW")?;
		self.transport.write(&format!(":WAV:POIN {}", points))?;
		Ok(())
	}

	fn query_f64(&mut self, cmd:&str) -> Result<f64, CaptureError> {
		let text:String = self.transport.query(cmd)
			.map_err(|e| CaptureError::Metadata(format!("{}: {}", cmd, e)))?;

		text.trim().parse::<f64>()
			.map_err(|_| CaptureError::Metadata(format!("{} returned non-numeric text {:?}", cmd, text)))
	}

	fn read_metadata_strict(&mut self) -> Result<WaveformMetadata, CaptureError> {
		let x_increment:f64 = self.query_f64(":WAV:XINC?")?;
		let x_origin:f64    = self.query_f64(":WAV:XOR?")?;
		let y_increment:f64 = self.query_f64(":WAV:YINC?")?;
		let y_origin:f64    = self.query_f64(":WAV:YOR?")?;
		let y_reference:f64 = self.query_f64(":WAV:YREF?")?;

		Ok(WaveformMetadata { x_increment, x_origin, y_increment, y_origin, y_reference })
	}

	/// All five scaling parameters, or the documented defaults. A partial
	/// mix of live and default values would report inconsistent units, so
	/// substitution is all-or-nothing.
	pub fn read_metadata(&mut self) -> Degraded<WaveformMetadata> {
		match self.read_metadata_strict() {
			Ok(meta) => {
				info!("x increment: {}, y increment: {}", meta.x_increment, meta.y_increment);
				Degraded::Live(meta)
			},
			Err(e) => {
				warn!("error getting waveform parameters: {}", e);
				Degraded::Fallback { value: WaveformMetadata::fallback(), reason: e.to_string() }
			},
		}
	}

	/// Fetch the unparsed waveform response. Failures are reported, not
	/// retried; the decoder's fallback policy takes over.
	pub fn fetch_raw_waveform(&mut self) -> Result<String, CaptureError> {
		self.transport.query(":WAV:DATA?").map_err(CaptureError::Fetch)
	}

	/// Drive one full single-shot cycle:
	/// reset, arm, trigger, poll, configure, read scaling, fetch, decode.
	/// Non-connection failures are logged and degrade the data instead of
	/// aborting, so a failed bench run still yields a record.
	pub fn capture(&mut self, channel:&str, points:u32) -> CaptureRecord {
		if let Err(e) = self.reset_and_clear() {
			warn!("reset failed: {}", e);
		}
		if let Err(e) = self.arm_channel(channel) {
			warn!("unable to arm {}: {}", channel, e);
		}
		match self.trigger_single() {
			Ok(())  => info!("single trigger initiated"),
			Err(e)  => warn!("single trigger failed: {}", e),
		}

		let outcome:AcquisitionOutcome = self.wait_for_acquisition();
		info!("acquisition finished ({:?}), retrieving data", outcome);

		if let Err(e) = self.configure_waveform_export(channel, points) {
			warn!("waveform export configuration failed: {}", e);
		}

		let metadata = self.read_metadata();
		let raw      = self.fetch_raw_waveform();
		let samples  = waveform::decode_with_fallback(raw);

		if let Some(reason) = samples.reason() {
			warn!("error fetching waveform data: {}", reason);
		}

		CaptureRecord::assemble(samples, metadata, channel, &self.instrument_id)
	}

	/// Release the transport. The session is consumed; `Drop` covers every
	/// path that never reaches this call.
	pub fn disconnect(mut self) -> Result<(), TransportError> {
		self.closed = true;
		self.transport.close()
	}

}

impl<T: Transport> Drop for N1000A<T> {

	fn drop(&mut self) {
		if !self.closed {
			let _ = self.transport.close();
		}
	}

}

// Implemented
// *IDN?				IDENTIFICATION
// *RST					RESET
// *CLS					CLEAR STATUS
// :CHAN<n>:DISP		CHANNEL DISPLAY
// :ACQ:RUN				FREE-RUN ACQUISITION
// :ACQ:STAT?			ACQUISITION STATE
// :SING				SINGLE TRIGGER
// :WAV:SOUR			EXPORT SOURCE
// :WAV:FORM			EXPORT FORMAT
// :WAV:MODE			EXPORT MODE
// :WAV:POIN:MODE		POINT COUNT MODE
// :WAV:POIN			POINT COUNT
// :WAV:XINC?			X INCREMENT
// :WAV:XOR?			X ORIGIN
// :WAV:YINC?			Y INCREMENT
// :WAV:YOR?			Y ORIGIN
// :WAV:YREF?			Y REFERENCE
// :WAV:DATA?			WAVEFORM DATA
