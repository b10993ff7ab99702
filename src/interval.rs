//! Open→close interval tracking and duration clamping.

use std::collections::VecDeque;
use std::time::Instant;

/// Number of intervals kept for the moving average.
pub const HISTORY_CAPACITY: usize = 3;

pub const DEFAULT_MIN_SEC: f64 = 0.05;
pub const DEFAULT_MAX_SEC: f64 = 5.0;

/// Why an event did not change the interval history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// `Close` with no pending `Open`.
    NoPendingOpen,
    /// The computed interval was zero or negative.
    NonPositiveInterval,
}

/// Result of feeding a `Close` into the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CloseOutcome {
    Recorded(f64),
    Stale(StaleReason),
}

/// Pending open timestamp plus a FIFO of the last three intervals.
#[derive(Debug, Default, Clone)]
pub struct IntervalTracker {
    pending_open: Option<Instant>,
    history: VecDeque<f64>,
}

impl IntervalTracker {
    pub fn new() -> Self {
        Self {
            pending_open: None,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Last open wins: a second `Open` replaces the pending timestamp.
    pub fn open(&mut self, at: Instant) {
        if self.pending_open.replace(at).is_some() {
            log::debug!("Open while another open is pending, replacing it");
        }
    }

    pub fn close(&mut self, at: Instant) -> CloseOutcome {
        let Some(opened) = self.pending_open.take() else {
            return CloseOutcome::Stale(StaleReason::NoPendingOpen);
        };

        let interval = match at.checked_duration_since(opened) {
            Some(d) if !d.is_zero() => d.as_secs_f64(),
            _ => return CloseOutcome::Stale(StaleReason::NonPositiveInterval),
        };

        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(interval);
        CloseOutcome::Recorded(interval)
    }

    /// Arithmetic mean of the held intervals; `None` while history is empty.
    pub fn average(&self) -> Option<f64> {
        if self.history.is_empty() {
            return None;
        }
        Some(self.history.iter().sum::<f64>() / self.history.len() as f64)
    }

    pub fn history(&self) -> Vec<f64> {
        self.history.iter().copied().collect()
    }

    pub fn has_pending_open(&self) -> bool {
        self.pending_open.is_some()
    }
}

/// Safe playback range for a raw duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationBounds {
    pub min_sec: f64,
    pub max_sec: f64,
}

impl Default for DurationBounds {
    fn default() -> Self {
        Self {
            min_sec: DEFAULT_MIN_SEC,
            max_sec: DEFAULT_MAX_SEC,
        }
    }
}

impl DurationBounds {
    pub fn new(min_sec: f64, max_sec: f64) -> Self {
        Self { min_sec, max_sec }
    }

    /// `max(min_sec, min(max_sec, secs))`
    pub fn clamp(&self, secs: f64) -> f64 {
        self.min_sec.max(self.max_sec.min(secs))
    }
}
