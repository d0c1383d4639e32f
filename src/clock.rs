//! Frame clock and render gate: time bookkeeping plus the Idle → Scheduled →
//! Processing state machine that bounds how often the host is asked to tick.

use std::cell::Cell;
use std::fmt;
use std::time::{Duration, Instant};

use strum_macros::IntoStaticStr;

use crate::constants::MAX_DELTA;

/// Transient frame metadata passed to every system callback and embedded in
/// every delivered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameContext {
    /// Time accumulated since the scheduler was initialized.
    pub elapsed: Duration,
    /// Time since the previous processed frame, clamped to
    /// [`MAX_DELTA`](crate::constants::MAX_DELTA).
    pub delta: Duration,
    /// Monotonically increasing count of processed frames.
    pub frame: u64,
}

impl FrameContext {
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }
}

/// Where the scheduler sits in its tick lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum FramePhase {
    /// No frame pending.
    Idle,
    /// A tick has been requested from the host but has not yet fired.
    Scheduled,
    /// A tick is currently executing.
    Processing,
}

impl fmt::Display for FramePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Into::<&'static str>::into(self).to_ascii_lowercase())
    }
}

/// Injected host dependency: asks the host loop for exactly one future
/// invocation of [`Scheduler::run_frame`](crate::Scheduler::run_frame),
/// optionally delayed by `delay`.
///
/// Implementations must not call back into the scheduler synchronously from
/// `request_tick`; the request is a promise of a *future* tick.
pub trait TickSource {
    fn request_tick(&mut self, delay: Option<Duration>);
}

impl<F: FnMut(Option<Duration>)> TickSource for F {
    fn request_tick(&mut self, delay: Option<Duration>) {
        self(delay)
    }
}

/// Outcome of asking the clock to admit a frame tick.
pub(crate) enum TickAdmission {
    /// Scheduler inactive; the tick is ignored.
    Inactive,
    /// A frame is already Processing; re-entrant entry rejected.
    Busy,
    /// Target frame rate configured and the tick arrived early; re-schedule
    /// after the contained remainder instead of processing now.
    Defer(Duration),
    /// Tick admitted; timing already advanced for this frame.
    Admit(FrameContext),
}

/// Interior-mutable clock state. Single-threaded by construction; the owning
/// scheduler handle is `!Send`.
pub(crate) struct FrameClock {
    active: Cell<bool>,
    phase: Cell<FramePhase>,
    last_tick: Cell<Option<Instant>>,
    elapsed: Cell<Duration>,
    last_delta: Cell<Duration>,
    frame: Cell<u64>,
    needs_update: Cell<bool>,
    target_period: Cell<Option<Duration>>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            active: Cell::new(false),
            phase: Cell::new(FramePhase::Idle),
            last_tick: Cell::new(None),
            elapsed: Cell::new(Duration::ZERO),
            last_delta: Cell::new(Duration::ZERO),
            frame: Cell::new(0),
            needs_update: Cell::new(false),
            target_period: Cell::new(None),
        }
    }

    /// Zeroes all counters and marks the clock active.
    pub fn initialize(&self, now: Instant) {
        self.active.set(true);
        self.phase.set(FramePhase::Idle);
        self.last_tick.set(Some(now));
        self.elapsed.set(Duration::ZERO);
        self.last_delta.set(Duration::ZERO);
        self.frame.set(0);
        self.needs_update.set(false);
    }

    /// Transitions to Idle-inactive and zeroes all counters.
    pub fn reset(&self) {
        self.active.set(false);
        self.phase.set(FramePhase::Idle);
        self.last_tick.set(None);
        self.elapsed.set(Duration::ZERO);
        self.last_delta.set(Duration::ZERO);
        self.frame.set(0);
        self.needs_update.set(false);
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn phase(&self) -> FramePhase {
        self.phase.get()
    }

    pub fn frame(&self) -> u64 {
        self.frame.get()
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update.get()
    }

    pub fn set_target_period(&self, period: Option<Duration>) {
        self.target_period.set(period);
    }

    /// Frame metadata as of the most recently processed tick.
    pub fn context(&self) -> FrameContext {
        FrameContext {
            elapsed: self.elapsed.get(),
            delta: self.last_delta.get(),
            frame: self.frame.get(),
        }
    }

    /// Records that work is outstanding. Returns true when this call
    /// transitioned Idle → Scheduled, i.e. the caller must request a tick.
    ///
    /// While Scheduled or Processing the flag is still raised, but no new
    /// tick request is needed: at most one is ever pending.
    pub fn mark_work(&self) -> bool {
        if !self.active.get() {
            return false;
        }
        self.needs_update.set(true);
        if self.phase.get() == FramePhase::Idle {
            self.phase.set(FramePhase::Scheduled);
            true
        } else {
            false
        }
    }

    /// Attempts to enter Processing for a tick observed at `now`.
    pub fn begin(&self, now: Instant) -> TickAdmission {
        if !self.active.get() {
            return TickAdmission::Inactive;
        }
        if self.phase.get() == FramePhase::Processing {
            return TickAdmission::Busy;
        }

        let last = self.last_tick.get().unwrap_or(now);
        let raw_delta = now.saturating_duration_since(last);

        if let Some(period) = self.target_period.get() {
            if raw_delta < period {
                self.phase.set(FramePhase::Scheduled);
                return TickAdmission::Defer(period - raw_delta);
            }
        }

        let delta = raw_delta.min(MAX_DELTA);
        self.phase.set(FramePhase::Processing);
        self.needs_update.set(false);
        self.last_tick.set(Some(now));
        self.elapsed.set(self.elapsed.get() + delta);
        self.last_delta.set(delta);
        self.frame.set(self.frame.get() + 1);

        TickAdmission::Admit(self.context())
    }

    /// Leaves Processing. Returns true when new work arrived during the pass
    /// and the caller must re-arm the loop with another tick request.
    pub fn finish(&self) -> bool {
        if self.needs_update.get() && self.active.get() {
            self.phase.set(FramePhase::Scheduled);
            true
        } else {
            self.phase.set(FramePhase::Idle);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_clamped_after_a_stall() {
        let clock = FrameClock::new();
        let start = Instant::now();
        clock.initialize(start);

        match clock.begin(start + Duration::from_secs(3)) {
            TickAdmission::Admit(ctx) => {
                assert_eq!(ctx.delta, MAX_DELTA);
                assert_eq!(ctx.elapsed, MAX_DELTA);
                assert_eq!(ctx.frame, 1);
            }
            _ => panic!("tick should have been admitted"),
        }
    }

    #[test]
    fn processing_rejects_reentrant_entry() {
        let clock = FrameClock::new();
        let start = Instant::now();
        clock.initialize(start);

        assert!(matches!(clock.begin(start), TickAdmission::Admit(_)));
        assert!(matches!(clock.begin(start), TickAdmission::Busy));
        clock.finish();
        assert_eq!(clock.phase(), FramePhase::Idle);
    }

    #[test]
    fn early_tick_is_deferred_under_target_rate() {
        let clock = FrameClock::new();
        let start = Instant::now();
        clock.initialize(start);
        clock.set_target_period(Some(Duration::from_millis(33)));

        match clock.begin(start + Duration::from_millis(10)) {
            TickAdmission::Defer(remaining) => assert_eq!(remaining, Duration::from_millis(23)),
            _ => panic!("early tick should have been deferred"),
        }
        // deferral consumes no frame
        assert_eq!(clock.frame(), 0);
    }

    #[test]
    fn mark_work_requests_at_most_one_tick() {
        let clock = FrameClock::new();
        clock.initialize(Instant::now());

        assert!(clock.mark_work());
        assert!(!clock.mark_work());
        assert_eq!(clock.phase(), FramePhase::Scheduled);
        assert!(clock.needs_update());
    }

    #[test]
    fn mark_work_is_ignored_while_inactive() {
        let clock = FrameClock::new();
        assert!(!clock.mark_work());
        assert!(!clock.needs_update());
    }
}
