//! Time utilities for game simulation

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

/// Fixed simulation tick rate; snapshots broadcast at the same rate
pub const TICK_RATE: u32 = 25;
pub const TICK_DURATION_MICROS: u64 = 1_000_000 / TICK_RATE as u64;

/// Fixed timestep for one tick, in seconds
pub fn tick_delta() -> f32 {
    1.0 / TICK_RATE as f32
}

/// Convert a tick count to whole seconds, rounding up
pub fn ticks_to_secs_ceil(ticks: u32) -> u32 {
    (ticks + TICK_RATE - 1) / TICK_RATE
}
