//! Performance counters and rolling step-time averages.

use std::collections::VecDeque;
use std::ops::AddAssign;

use serde::Serialize;

/// Rough per-object footprint used for the memory estimate.
pub const BODY_BYTES: usize = 640;
pub const CONSTRAINT_BYTES: usize = 256;
pub const CONTACT_BYTES: usize = 160;

// ---------------------------------------------------------------------------
// PerformanceMetrics
// ---------------------------------------------------------------------------

/// Snapshot of one world, or the sum over an engine's worlds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Mean wall-clock duration of recent steps, in milliseconds.
    pub average_step_ms: f64,
    /// Duration of the most recent step, in milliseconds.
    pub last_step_ms: f64,
    pub bodies: usize,
    pub constraints: usize,
    pub contacts: usize,
    pub active_bodies: usize,
    pub sleeping_bodies: usize,
    pub culled_bodies: usize,
    pub estimated_memory_bytes: usize,
    pub worlds: usize,
    pub pooled_handles: usize,
}

impl PerformanceMetrics {
    /// Estimate from object counts.
    #[must_use]
    pub const fn estimate_memory(bodies: usize, constraints: usize, contacts: usize) -> usize {
        bodies * BODY_BYTES + constraints * CONSTRAINT_BYTES + contacts * CONTACT_BYTES
    }
}

impl AddAssign for PerformanceMetrics {
    /// Counters add up. The step average is weighted by world so a single
    /// slow world still shows.
    fn add_assign(&mut self, rhs: Self) {
        let worlds = self.worlds + rhs.worlds;
        if worlds > 0 {
            #[allow(clippy::cast_precision_loss)]
            {
                self.average_step_ms = (self.average_step_ms * self.worlds as f64
                    + rhs.average_step_ms * rhs.worlds as f64)
                    / worlds as f64;
            }
        }
        self.last_step_ms = self.last_step_ms.max(rhs.last_step_ms);
        self.bodies += rhs.bodies;
        self.constraints += rhs.constraints;
        self.contacts += rhs.contacts;
        self.active_bodies += rhs.active_bodies;
        self.sleeping_bodies += rhs.sleeping_bodies;
        self.culled_bodies += rhs.culled_bodies;
        self.estimated_memory_bytes += rhs.estimated_memory_bytes;
        self.worlds = worlds;
        self.pooled_handles += rhs.pooled_handles;
    }
}

// ---------------------------------------------------------------------------
// RollingAverage
// ---------------------------------------------------------------------------

/// Fixed-capacity ring of samples; the oldest is evicted when full.
#[derive(Debug, Clone)]
pub struct RollingAverage {
    samples: VecDeque<f64>,
    capacity: usize,
    sum: f64,
}

impl RollingAverage {
    /// Ring holding at most `capacity` samples (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
        }
    }

    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            if let Some(old) = self.samples.pop_front() {
                self.sum -= old;
            }
        }
        self.samples.push_back(sample);
        self.sum += sample;
    }

    /// Mean of the retained samples, `None` when empty.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        Some(self.sum / self.samples.len() as f64)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.sum = 0.0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
