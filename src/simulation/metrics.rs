use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const FPS_SMOOTHING: f64 = 0.1;

/// Per-tick timings and error counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub fps: f64,
    pub physics_time_ms: f64,
    pub update_time_ms: f64,
    pub render_time_ms: f64,
    pub tick_time_ms: f64,
    pub consecutive_errors: u32,
    pub total_errors: u64,
    pub recoveries: u64,
}

/// Phases timed inside a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Physics,
    Update,
    Render,
    Tick,
}

/// Wall-clock bookkeeping for the tick loop
#[derive(Debug, Clone, Default)]
pub struct PerformanceTracker {
    metrics: PerformanceMetrics,
    last_tick: Option<Instant>,
    samples: u64,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.metrics
    }

    pub fn fps(&self) -> f64 {
        self.metrics.fps
    }

    /// Wall time since the previous call, clamped to `max_dt`. The first call
    /// and zero measurements yield `fallback`.
    pub fn measure_delta(&mut self, max_dt: f64, fallback: f64) -> f64 {
        let now = Instant::now();
        let measured = self
            .last_tick
            .replace(now)
            .map(|last| now.duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        if measured > 0.0 {
            measured.min(max_dt)
        } else {
            fallback.min(max_dt)
        }
    }

    /// Fold a tick of length `dt` into the smoothed frame rate.
    pub fn record_tick(&mut self, dt: f64) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        let instant = 1.0 / dt;
        self.metrics.fps = if self.samples == 0 {
            instant
        } else {
            self.metrics.fps + FPS_SMOOTHING * (instant - self.metrics.fps)
        };
        self.samples += 1;
    }

    pub fn record_phase(&mut self, phase: Phase, elapsed: Duration) {
        let ms = elapsed.as_secs_f64() * 1000.0;
        match phase {
            Phase::Physics => self.metrics.physics_time_ms = ms,
            Phase::Update => self.metrics.update_time_ms = ms,
            Phase::Render => self.metrics.render_time_ms = ms,
            Phase::Tick => self.metrics.tick_time_ms = ms,
        }
    }

    /// Returns the new consecutive error count.
    pub fn record_error(&mut self) -> u32 {
        self.metrics.consecutive_errors += 1;
        self.metrics.total_errors += 1;
        self.metrics.consecutive_errors
    }

    pub fn record_success(&mut self) {
        self.metrics.consecutive_errors = 0;
    }

    pub fn record_recovery(&mut self) {
        self.metrics.consecutive_errors = 0;
        self.metrics.recoveries += 1;
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.metrics.consecutive_errors
    }

    /// Restart the wall clock without touching the counters, e.g. after a pause.
    pub fn restart_clock(&mut self) {
        self.last_tick = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
