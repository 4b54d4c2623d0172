
// Raw-socket SCPI transport, a line-oriented command/response channel to instruments like oscilloscopes
pub mod scpi;

// Error taxonomy for the capture pipeline, plus the degraded-value outcome type
pub mod error;

// Wall-clock seam used for settle intervals and acquisition polling
pub mod clock;

// Waveform scaling metadata, block-header decoding, and the capture record handed to exporters
pub mod waveform;

// Module for devices that speak the SCPI dialect implemented here
pub mod devices;

// Timestamped CSV and plot artifacts built from a capture record
pub mod export;
