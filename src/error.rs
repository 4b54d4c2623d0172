
use thiserror::Error;

/// Failures at the command-channel seam: opening, exchanging, and closing.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out waiting for a response")]
    Timeout,

    #[error("transport already closed")]
    Closed,

    #[error("response is not valid UTF-8")]
    NotUtf8,
}

/// Failures in the capture pipeline. Only `Connection` aborts a run; every
/// other kind is caught at its step boundary and replaced with a documented
/// fallback value.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("unable to open or identify the instrument: {0}")]
    Connection(String),

    #[error("acquisition status query failed: {0}")]
    StatusQuery(#[source] TransportError),

    #[error("waveform metadata query failed: {0}")]
    Metadata(String),

    #[error("waveform data fetch failed: {0}")]
    Fetch(#[source] TransportError),

    #[error("waveform decode failed: {0}")]
    Decode(String),
}

/// A value that reached the caller either live from the instrument or as a
/// documented substitute, with the reason the substitution happened.
#[derive(Debug, Clone, PartialEq)]
pub enum Degraded<T> {
    Live(T),
    Fallback { value: T, reason: String },
}

impl<T> Degraded<T> {

    pub fn value(&self) -> &T {
        match self {
            Degraded::Live(value) => value,
            Degraded::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Degraded::Live(value) => value,
            Degraded::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        match self {
            Degraded::Live(_) => false,
            Degraded::Fallback { .. } => true,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Degraded::Live(_) => None,
            Degraded::Fallback { reason, .. } => Some(reason.as_str()),
        }
    }

}
