use serde::Serialize;
use thiserror::Error;

/// Terminal reasons a measurement session ends without a result.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// Too few samples, or fewer than two physiologically valid intervals.
    #[error("insufficient signal: improve contact or placement and retry")]
    InsufficientSignal,
    /// Flat signal (below the noise floor) or nothing above threshold.
    #[error("no peaks detected in the captured signal")]
    NoPeaksDetected,
    /// The acquisition side delivered more than the configured session length.
    #[error("sample capacity exceeded for this session")]
    CapacityExceeded,
    #[error("measurement cancelled")]
    Cancelled,
    /// The platform could not provide the sensor at all.
    #[error("sensor unavailable on this device")]
    SensorUnavailable,
}

impl FailureKind {
    /// Whether re-running the capture is a sensible user prompt.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FailureKind::InsufficientSignal | FailureKind::NoPeaksDetected
        )
    }
}

/// Per-sample rejections raised by [`crate::buffer::SampleBuffer::push`].
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum BufferError {
    #[error("buffer full: capacity of {capacity} samples / {max_duration_ms} ms reached")]
    CapacityExceeded { capacity: usize, max_duration_ms: u32 },
    #[error("timestamp went backwards: {got_ms} ms after {previous_ms} ms")]
    TimestampRegression { previous_ms: u32, got_ms: u32 },
    #[error("sample value is not finite")]
    NonFinite,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Failed(#[from] FailureKind),
    #[error("session already reached a terminal state")]
    Terminated,
    #[error("cannot end capture after {elapsed_ms} ms, minimum is {min_ms} ms")]
    TooEarly { elapsed_ms: u32, min_ms: u32 },
    #[error("sample rejected: {0}")]
    Sample(BufferError),
}

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("profile '{profile}' is invalid: {reason}")]
    Validation { profile: String, reason: String },
}
