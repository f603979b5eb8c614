//! Default values and CPU-aware helpers.

/// Minimum number of executor lanes.
pub const MIN_EXECUTOR_LANES: usize = 1;

/// Maximum number of executor lanes.
pub const MAX_EXECUTOR_LANES: usize = 256;

/// Get the number of available CPU cores.
pub fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Default executor lanes: one per core.
pub fn default_lanes() -> usize {
    num_cpus().clamp(MIN_EXECUTOR_LANES, MAX_EXECUTOR_LANES)
}

/// Clamps the lane count to the valid range and logs a warning if clamped.
pub(super) fn clamp_lanes(value: usize) -> usize {
    if value < MIN_EXECUTOR_LANES {
        tracing::warn!(
            requested = value,
            min = MIN_EXECUTOR_LANES,
            max = MAX_EXECUTOR_LANES,
            "executor lanes below minimum, clamping to {}",
            MIN_EXECUTOR_LANES
        );
        MIN_EXECUTOR_LANES
    } else if value > MAX_EXECUTOR_LANES {
        tracing::warn!(
            requested = value,
            min = MIN_EXECUTOR_LANES,
            max = MAX_EXECUTOR_LANES,
            "executor lanes above maximum, clamping to {}",
            MAX_EXECUTOR_LANES
        );
        MAX_EXECUTOR_LANES
    } else {
        value
    }
}
