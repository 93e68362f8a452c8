use crate::Stage;
use std::time::Duration;

/// Stages used when none are configured: ramp to 100 VUs, hold, ramp down.
pub const DEFAULT_STAGES: [Stage; 3] = [
    Stage::new(Duration::from_secs(10), 100),
    Stage::new(Duration::from_secs(30), 100),
    Stage::new(Duration::from_secs(30), 0),
];

/// How long stopped VUs may keep running their current iteration before being aborted.
pub const DEFAULT_GRACEFUL_RAMP_DOWN: Duration = Duration::from_secs(30);

/// Upper bound on a `shared-iterations` run.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(600);

/// Interval at which the ramping executor re-evaluates its VU target.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
