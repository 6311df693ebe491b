// Dispatcher and reaper constants (no magic values)
use std::time::Duration;

/// Baseline dispatch pool size: one slot, matching the single exclusive
/// generation resource.
pub const DEFAULT_POOL_SIZE: usize = 1;

/// Default inter-dispatch throttle (disabled). A design knob, not a
/// correctness requirement.
pub const DEFAULT_DISPATCH_DELAY: Duration = Duration::ZERO;

/// Default deadline around one synthesize call (10 minutes). A stuck
/// generation transitions to Error and frees the slot when this expires.
pub const DEFAULT_SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(600);

/// Default time-to-live for terminal jobs before the reaper reclaims them
/// (300 seconds).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default reaper sweep period (every 5 minutes).
pub const DEFAULT_SWEEP_PERIOD: Duration = Duration::from_secs(300);
