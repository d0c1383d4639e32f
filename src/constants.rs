//! Timing and scheduling constants used across the crate.

use std::time::Duration;

/// Target duration of one host loop iteration (60 Hz).
pub const LOOP_TIME: Duration = Duration::from_nanos((1_000_000_000.0 / 60.0) as u64);

/// Upper bound on the delta time handed to systems and listeners.
///
/// After a stall (debugger pause, background tab, swapped-out process) the raw
/// delta can be seconds long; clamping keeps time-based animation and physics
/// from taking one giant step.
pub const MAX_DELTA: Duration = Duration::from_millis(100);

/// Number of frame samples kept in the metrics window.
pub const METRICS_WINDOW: usize = 120;

/// Fraction of the frame budget a pass may consume before a warning is logged.
pub const FRAME_BUDGET_HEADROOM: f32 = 1.2;

/// Default throttle window for camera movement events.
pub const CAMERA_MOVE_THROTTLE: Duration = Duration::from_millis(16);

/// Default throttle window for asset load progress events.
pub const ASSET_PROGRESS_THROTTLE: Duration = Duration::from_millis(100);
