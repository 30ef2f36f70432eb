//! Time utilities for the frame loop

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Display refresh rate the session loop emulates
pub const FRAME_RATE: u32 = 60;

/// Interval between session frames
pub fn frame_interval() -> Duration {
    Duration::from_micros(1_000_000 / FRAME_RATE as u64)
}

/// Wall-clock delta between frames, in seconds
#[derive(Debug)]
pub struct FrameTimer {
    last: Option<Instant>,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Seconds since the previous call; zero on the first call
    pub fn delta(&mut self) -> f32 {
        self.delta_at(Instant::now())
    }

    fn delta_at(&mut self, now: Instant) -> f32 {
        let dt = self
            .last
            .map(|last| now.saturating_duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last = Some(now);
        dt
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}
