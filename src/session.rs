//! Measurement session state machine.
//!
//! A session owns its buffer and filter state. It is created per capture,
//! fed samples by the acquisition side, polled for live feedback, and ends in
//! exactly one terminal state. A terminal session is never resumed.

use crate::buffer::{values, Sample, SampleBuffer};
use crate::error::{BufferError, FailureKind, SessionError};
use crate::filter::DigitalFilter;
use crate::pipeline::Pipeline;
use crate::preprocessing::signal_strength;
use crate::profile::SignalProfile;
use crate::{LiveEstimate, MeasurementResult};
use log::{debug, info, trace, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Acquiring,
    Finalizing,
    Succeeded(MeasurementResult),
    Failed(FailureKind),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Succeeded(_) | SessionState::Failed(_))
    }
}

#[derive(Debug)]
pub struct MeasurementSession {
    profile: SignalProfile,
    state: SessionState,
    buffer: SampleBuffer,
    pipeline: Pipeline,
    // Incremental path used only for live feedback.
    live_filter: DigitalFilter,
    live_filtered: Vec<f64>,
    since_live: usize,
    live: Option<LiveEstimate>,
}

impl MeasurementSession {
    pub fn new(profile: SignalProfile) -> Self {
        debug!(
            "New {} session: capacity {} samples, max {} ms",
            profile.name,
            profile.capacity(),
            profile.max_duration_ms
        );
        Self {
            state: SessionState::Idle,
            buffer: SampleBuffer::new(profile.capacity(), profile.max_duration_ms),
            pipeline: Pipeline::new(&profile),
            live_filter: DigitalFilter::from_profile(&profile),
            live_filtered: Vec::with_capacity(profile.capacity()),
            since_live: 0,
            live: None,
            profile,
        }
    }

    /// Append a sample. Once the session is terminal this is a no-op.
    ///
    /// Malformed samples are rejected without changing state. Overrunning the
    /// configured capacity ends the session with `CapacityExceeded`.
    pub fn push_sample(&mut self, value: f64, t_offset_ms: u32) -> Result<(), SessionError> {
        if self.state.is_terminal() {
            trace!("Ignoring sample at {} ms: session is terminal", t_offset_ms);
            return Ok(());
        }

        match self.buffer.push(value, t_offset_ms) {
            Ok(()) => {}
            Err(BufferError::CapacityExceeded { capacity, .. }) => {
                warn!(
                    "{} session overran {} samples at {} ms",
                    self.profile.name, capacity, t_offset_ms
                );
                self.terminate(SessionState::Failed(FailureKind::CapacityExceeded));
                return Err(SessionError::Failed(FailureKind::CapacityExceeded));
            }
            Err(e) => return Err(SessionError::Sample(e)),
        }

        if self.state == SessionState::Idle {
            info!("{} session acquiring", self.profile.name);
            self.state = SessionState::Acquiring;
        }

        self.live_filtered.push(self.live_filter.process(value));
        self.since_live += 1;
        if self.buffer.len() >= self.profile.live.min_samples
            && self.since_live >= self.profile.live.cadence
        {
            self.since_live = 0;
            self.live = Some(self.live_pass());
        }
        Ok(())
    }

    fn live_pass(&self) -> LiveEstimate {
        let n = self.profile.live.tail_window.unwrap_or(self.buffer.len());
        let start = self.live_filtered.len().saturating_sub(n);
        let (peaks, intervals) = self.pipeline.estimate(&self.live_filtered[start..]);

        let (min_rate, max_rate) = self.profile.valid_rate_range;
        let rate = intervals
            .rate
            .filter(|rate| (min_rate..=max_rate).contains(rate));
        let strength = signal_strength(
            &values(self.buffer.tail(n)),
            self.profile.live.strength_divisor,
        );

        trace!(
            "Live pass over {} samples: rate {:?}, strength {}",
            self.live_filtered.len() - start,
            rate,
            strength
        );
        LiveEstimate {
            rate,
            signal_strength: strength,
            sample_count: self.buffer.len() as u32,
            peaks: peaks.len(),
        }
    }

    /// Latest provisional estimate; `None` before the first live pass or once
    /// the session has stopped acquiring.
    pub fn request_live_estimate(&self) -> Option<LiveEstimate> {
        match self.state {
            SessionState::Acquiring => self.live.clone(),
            _ => None,
        }
    }

    /// The capture window has elapsed: run the batch pipeline once.
    pub fn finish(&mut self) -> Result<MeasurementResult, SessionError> {
        if self.state.is_terminal() {
            return Err(SessionError::Terminated);
        }

        self.state = SessionState::Finalizing;
        debug!(
            "Finalizing {} session over {} samples ({} ms)",
            self.profile.name,
            self.buffer.len(),
            self.buffer.duration_ms()
        );

        match self.pipeline.run(self.buffer.snapshot()) {
            Ok(result) => {
                self.terminate(SessionState::Succeeded(result.clone()));
                Ok(result)
            }
            Err(kind) => {
                self.terminate(SessionState::Failed(kind));
                Err(SessionError::Failed(kind))
            }
        }
    }

    /// Caller-initiated early end; allowed once `min_duration_ms` has elapsed.
    pub fn force_end(&mut self) -> Result<MeasurementResult, SessionError> {
        if self.state.is_terminal() {
            return Err(SessionError::Terminated);
        }
        let elapsed_ms = self.buffer.duration_ms();
        if elapsed_ms < self.profile.min_duration_ms {
            return Err(SessionError::TooEarly {
                elapsed_ms,
                min_ms: self.profile.min_duration_ms,
            });
        }
        self.finish()
    }

    /// Abort from any non-terminal state. Idempotent.
    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            self.terminate(SessionState::Failed(FailureKind::Cancelled));
        }
    }

    /// The platform cannot provide this sensor; end without fabricating data.
    pub fn mark_sensor_unavailable(&mut self) {
        if !self.state.is_terminal() {
            self.terminate(SessionState::Failed(FailureKind::SensorUnavailable));
        }
    }

    fn terminate(&mut self, state: SessionState) {
        info!("{} session -> {:?}", self.profile.name, state);
        self.state = state;
        self.live = None;
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn profile(&self) -> &SignalProfile {
        &self.profile
    }

    pub fn sample_count(&self) -> u32 {
        self.buffer.len() as u32
    }

    pub fn elapsed_ms(&self) -> u32 {
        self.buffer.duration_ms()
    }

    pub fn snapshot(&self) -> &[Sample] {
        self.buffer.snapshot()
    }
}
