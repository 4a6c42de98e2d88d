use crate::error::BufferError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub value: f64,
    pub t_offset_ms: u32,
}

/// Append-only store of the samples captured by one session.
///
/// Capacity and maximum duration are fixed at construction. Live preview and
/// final analysis both read through [`SampleBuffer::snapshot`] /
/// [`SampleBuffer::tail`], so there is a single buffering path.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
    capacity: usize,
    max_duration_ms: u32,
}

impl SampleBuffer {
    pub fn new(capacity: usize, max_duration_ms: u32) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            max_duration_ms,
        }
    }

    pub fn push(&mut self, value: f64, t_offset_ms: u32) -> Result<(), BufferError> {
        if !value.is_finite() {
            return Err(BufferError::NonFinite);
        }
        if let Some(last) = self.samples.last() {
            if t_offset_ms < last.t_offset_ms {
                return Err(BufferError::TimestampRegression {
                    previous_ms: last.t_offset_ms,
                    got_ms: t_offset_ms,
                });
            }
        }
        let start_ms = self.samples.first().map_or(t_offset_ms, |s| s.t_offset_ms);
        if self.samples.len() >= self.capacity || t_offset_ms - start_ms > self.max_duration_ms {
            return Err(BufferError::CapacityExceeded {
                capacity: self.capacity,
                max_duration_ms: self.max_duration_ms,
            });
        }

        self.samples.push(Sample { value, t_offset_ms });
        Ok(())
    }

    pub fn snapshot(&self) -> &[Sample] {
        &self.samples
    }

    /// The last `n` samples, or everything if fewer are buffered.
    pub fn tail(&self, n: usize) -> &[Sample] {
        let start = self.samples.len().saturating_sub(n);
        &self.samples[start..]
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Time spanned between the first and the last sample.
    pub fn duration_ms(&self) -> u32 {
        span_ms(&self.samples)
    }
}

/// Milliseconds between the first and last sample; 0 for fewer than two.
pub fn span_ms(samples: &[Sample]) -> u32 {
    match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => last.t_offset_ms.saturating_sub(first.t_offset_ms),
        _ => 0,
    }
}

/// Copy the sample values out in arrival order.
pub fn values(samples: &[Sample]) -> Vec<f64> {
    samples.iter().map(|s| s.value).collect()
}
