pub mod buffer;
pub mod confidence;
pub mod config;
pub mod data_loading;
pub mod error;
pub mod filter;
pub mod intervals;
pub mod output;
pub mod peaks;
pub mod pipeline;
pub mod preprocessing;
pub mod profile;
pub mod replay;
pub mod session;
pub mod thermal;

use serde::{Deserialize, Serialize};

pub use buffer::{Sample, SampleBuffer};
pub use error::{BufferError, FailureKind, ProfileError, SessionError};
pub use profile::{FilterKind, SignalProfile};
pub use session::{MeasurementSession, SessionState};

/// Final outcome of a successful session, handed to the result collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    /// Beats or breaths per minute, rounded.
    pub rate: f64,
    /// RMSSD in milliseconds for pulsatile profiles.
    pub variability: Option<f64>,
    pub confidence: f64,
    pub sample_count: u32,
}

/// Provisional feedback while acquiring. Carries no confidence guarantee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveEstimate {
    pub rate: Option<f64>,
    /// 0-100 contact/sound quality indicator.
    pub signal_strength: u8,
    pub sample_count: u32,
    pub peaks: usize,
}
