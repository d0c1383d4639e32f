//! The scheduler facade: owns the bus, the system list, the frame clock, and
//! the metrics window, and orchestrates one frame pass per host tick.

use std::any::Any;
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, trace, warn};

use crate::bus::{EventBus, ListenerFn};
use crate::clock::{FrameClock, FrameContext, FramePhase, TickAdmission, TickSource};
use crate::constants::FRAME_BUDGET_HEADROOM;
use crate::error::{SchedulerError, SchedulerResult};
use crate::events::{EventContext, EventOptions, EventPayload, EventType};
use crate::formatter;
use crate::metrics::{FrameMetrics, MetricsSnapshot};
use crate::systems::{SystemFn, SystemRegistry};

/// Single-threaded, demand-driven frame scheduler with an integrated
/// publish/subscribe event bus.
///
/// `Scheduler` is a cheap-to-clone handle over shared state; clone it freely
/// and hand copies to collaborators. All callbacks receive a `&Scheduler` so
/// they can emit events or mutate registrations mid-dispatch — structural
/// mutation during a pass is tolerated by dispatching against snapshots.
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Clone for Scheduler {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

pub(crate) struct SchedulerInner {
    pub(crate) bus: EventBus,
    pub(crate) systems: SystemRegistry,
    clock: FrameClock,
    metrics: FrameMetrics,
    tick_source: RefCell<Box<dyn TickSource>>,
}

/// Detached unsubscribe handle returned by [`Scheduler::subscribe`].
///
/// Holds no strong reference to the scheduler; unsubscribing after the
/// scheduler is gone is a harmless no-op.
pub struct Subscription {
    id: String,
    inner: Weak<SchedulerInner>,
}

impl Subscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Removes the listener. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.inner.upgrade() {
            Some(inner) => inner.bus.unsubscribe(&self.id),
            None => false,
        }
    }
}

/// Detached unregister handle returned by [`Scheduler::register_system`].
pub struct SystemRegistration {
    id: String,
    inner: Weak<SchedulerInner>,
}

impl SystemRegistration {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Removes the system. Returns false if it was already gone.
    pub fn unregister(self) -> bool {
        match self.inner.upgrade() {
            Some(inner) => inner.systems.unregister(&self.id),
            None => false,
        }
    }
}

impl Scheduler {
    /// Creates an inactive scheduler wired to `tick_source`. Call
    /// [`initialize`](Self::initialize) before emitting or requesting frames.
    pub fn new(tick_source: impl TickSource + 'static) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                bus: EventBus::new(),
                systems: SystemRegistry::new(),
                clock: FrameClock::new(),
                metrics: FrameMetrics::new(),
                tick_source: RefCell::new(Box::new(tick_source)),
            }),
        }
    }

    /// (Re)starts the clock, marks the scheduler active, and re-registers the
    /// statically declared event types.
    pub fn initialize(&self) {
        self.inner.clock.initialize(Instant::now());
        for event in EventType::BUILT_IN {
            self.inner.bus.register(event, None);
        }
        info!("Scheduler initialized");
    }

    /// Deactivates and clears all listeners, systems, and event descriptors.
    pub fn reset(&self) {
        self.inner.bus.clear();
        self.inner.systems.clear();
        self.inner.metrics.reset();
        self.inner.clock.reset();
        info!("Scheduler reset");
    }

    // --- Event registry & bus -----------------------------------------------

    /// Registers an event type with explicit options. Idempotent; returns
    /// whether a new descriptor was created (existing options are kept).
    pub fn register_event(&self, event: EventType, options: EventOptions) -> bool {
        self.inner.bus.register(event, Some(options))
    }

    pub fn is_event_registered(&self, event: &EventType) -> bool {
        self.inner.bus.descriptor(event).is_some()
    }

    /// Options currently in effect for a registered event type.
    pub fn event_options(&self, event: &EventType) -> Option<EventOptions> {
        self.inner.bus.descriptor(event).map(|d| d.options())
    }

    /// Subscribes `callback` to `event` under the caller-chosen `id`,
    /// auto-registering the type if unknown. Subscribing with an id already
    /// in use replaces the prior listener (last write wins). `priority: None`
    /// inherits the event type's default; lower values run earlier.
    pub fn subscribe(
        &self,
        id: impl Into<String>,
        event: EventType,
        callback: impl FnMut(&Scheduler, &EventContext) + 'static,
        priority: Option<i32>,
    ) -> Subscription {
        let id = id.into();
        let callback: Rc<RefCell<ListenerFn>> = Rc::new(RefCell::new(callback));
        self.inner.bus.subscribe(id.clone(), event, callback, priority);
        Subscription {
            id,
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Removes the listener if present; no-op returning false otherwise.
    pub fn unsubscribe(&self, id: &str) -> bool {
        self.inner.bus.unsubscribe(id)
    }

    /// Sets a listener's active flag without removing it. Inactive listeners
    /// are skipped by dispatch.
    pub fn set_listener_active(&self, id: &str, active: bool) -> SchedulerResult<()> {
        if self.inner.bus.set_listener_active(id, active) {
            Ok(())
        } else {
            Err(SchedulerError::UnknownListener(id.to_string()))
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.bus.listener_count()
    }

    /// Publishes an event. Returns false when the type's throttle window has
    /// not elapsed (the event is dropped, not queued); otherwise invokes every
    /// currently active listener synchronously in (priority, insertion) order
    /// and arms the frame loop.
    ///
    /// Safe to call from inside listener and system callbacks; nested emits
    /// dispatch synchronously against their own snapshot.
    pub fn emit(&self, event: EventType, payload: EventPayload) -> bool {
        if !self.inner.bus.try_accept(&event, Instant::now()) {
            trace!(event = %event, "Emission throttled; dropped");
            return false;
        }
        self.dispatch(&event, payload);
        if self.inner.clock.mark_work() {
            self.request_tick(None);
        }
        true
    }

    /// Delivery without arming the loop: used for the scheduler's own
    /// lifecycle traffic (frame start/end, performance samples) so an
    /// otherwise-idle scheduler does not re-schedule itself forever on its
    /// own bookkeeping.
    fn dispatch_internal(&self, event: EventType, payload: EventPayload) {
        if !self.inner.bus.try_accept(&event, Instant::now()) {
            return;
        }
        self.dispatch(&event, payload);
    }

    fn dispatch(&self, event: &EventType, payload: EventPayload) {
        let context = EventContext {
            event: event.clone(),
            frame: self.inner.clock.context(),
            payload,
        };
        let snapshot = self.inner.bus.snapshot(event);
        trace!(
            event = %event,
            listeners = snapshot.len(),
            payload = context.payload.kind(),
            "Dispatching event"
        );

        for (id, callback) in snapshot {
            let Ok(mut callback) = callback.try_borrow_mut() else {
                warn!(
                    listener = %id,
                    event = %event,
                    "Listener re-entered its own callback; delivery skipped"
                );
                continue;
            };
            let result = catch_unwind(AssertUnwindSafe(|| (&mut *callback)(self, &context)));
            if let Err(panic) = result {
                error!(
                    listener = %id,
                    event = %event,
                    panic = panic_message(&panic),
                    "Listener panicked during dispatch"
                );
            }
        }
    }

    // --- System scheduler ---------------------------------------------------

    /// Inserts or replaces the recurring system for `id`. Lower priority
    /// values execute earlier within a frame; re-registering an existing id
    /// replaces it in place rather than duplicating it.
    pub fn register_system(
        &self,
        id: impl Into<String>,
        update_fn: impl FnMut(&Scheduler, &FrameContext) + 'static,
        priority: i32,
        active: bool,
    ) -> SystemRegistration {
        let id = id.into();
        let callback: Rc<RefCell<SystemFn>> = Rc::new(RefCell::new(update_fn));
        self.inner.systems.register(id.clone(), callback, priority, active);
        SystemRegistration {
            id,
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Removes by id; no-op returning false if absent.
    pub fn unregister_system(&self, id: &str) -> bool {
        self.inner.systems.unregister(id)
    }

    /// Flips (`None`) or explicitly sets the active flag without removing the
    /// registration. Returns whether `id` was found.
    pub fn toggle_system(&self, id: &str, active: Option<bool>) -> bool {
        self.inner.systems.toggle(id, active)
    }

    /// [`toggle_system`](Self::toggle_system) that surfaces unknown ids as an
    /// error instead of a boolean.
    pub fn try_toggle_system(&self, id: &str, active: Option<bool>) -> SchedulerResult<()> {
        if self.inner.systems.toggle(id, active) {
            Ok(())
        } else {
            Err(SchedulerError::UnknownSystem(id.to_string()))
        }
    }

    pub fn system_count(&self) -> usize {
        self.inner.systems.len()
    }

    /// System priorities in execution order; ascending by the sort invariant.
    pub fn system_priorities(&self) -> Vec<i32> {
        self.inner.systems.priorities()
    }

    // --- Frame clock & render gate ------------------------------------------

    /// Marks work outstanding and requests a host tick if none is pending.
    /// Returns false while the scheduler is inactive.
    pub fn request_frame(&self) -> bool {
        if !self.inner.clock.is_active() {
            debug!("Frame request ignored; scheduler inactive");
            return false;
        }
        if self.inner.clock.mark_work() {
            self.request_tick(None);
        }
        true
    }

    /// Caps the processed frame rate. Ticks arriving early are deferred by
    /// re-requesting them with the remaining time, trading latency for a
    /// steady ceiling. `None` removes the cap.
    pub fn set_target_frame_rate(&self, fps: Option<f32>) -> SchedulerResult<()> {
        match fps {
            Some(fps) if !(fps.is_finite() && fps > 0.0) => {
                Err(SchedulerError::InvalidFrameRate(fps))
            }
            Some(fps) => {
                let period = Duration::from_secs_f32(1.0 / fps);
                debug!(fps, period = ?period, "Target frame rate set");
                self.inner.clock.set_target_period(Some(period));
                Ok(())
            }
            None => {
                self.inner.clock.set_target_period(None);
                Ok(())
            }
        }
    }

    /// Host tick entry point: runs one frame pass at `Instant::now()`.
    /// Returns whether a frame was actually processed.
    pub fn run_frame(&self) -> bool {
        self.run_frame_at(Instant::now())
    }

    /// Deterministic variant of [`run_frame`](Self::run_frame) for hosts and
    /// tests that control time themselves.
    pub fn run_frame_at(&self, now: Instant) -> bool {
        let context = match self.inner.clock.begin(now) {
            TickAdmission::Inactive => {
                trace!("Frame tick ignored; scheduler inactive");
                return false;
            }
            TickAdmission::Busy => {
                warn!("Re-entrant frame tick rejected");
                return false;
            }
            TickAdmission::Defer(remaining) => {
                trace!(remaining = ?remaining, "Tick ahead of target period; deferring");
                self.request_tick(Some(remaining));
                return false;
            }
            TickAdmission::Admit(context) => context,
        };

        formatter::increment_frame();
        trace!(frame = context.frame, delta = ?context.delta, "Frame processing started");
        self.dispatch_internal(EventType::FrameStart, EventPayload::None);

        let pass_start = Instant::now();
        for (id, callback) in self.inner.systems.snapshot() {
            let Ok(mut callback) = callback.try_borrow_mut() else {
                warn!(system = %id, "System re-entered its own callback; update skipped");
                continue;
            };
            let result = catch_unwind(AssertUnwindSafe(|| (&mut *callback)(self, &context)));
            if let Err(panic) = result {
                error!(
                    system = %id,
                    frame = context.frame,
                    panic = panic_message(&panic),
                    "System panicked during update"
                );
            }
        }
        let processing = pass_start.elapsed();

        self.inner.metrics.record(context.delta, processing);
        let fps = if context.delta > Duration::ZERO {
            1.0 / context.delta.as_secs_f32()
        } else {
            0.0
        };

        if context.delta > Duration::ZERO
            && processing.as_secs_f32() > context.delta.as_secs_f32() * FRAME_BUDGET_HEADROOM
        {
            warn!(
                frame = context.frame,
                processing = ?processing,
                budget = ?context.delta,
                "Frame took longer than expected"
            );
        }

        self.dispatch_internal(EventType::FrameEnd, EventPayload::None);
        self.dispatch_internal(
            EventType::PerformanceMetrics,
            EventPayload::Metrics {
                fps,
                frame_time: processing,
            },
        );

        if self.inner.clock.finish() {
            trace!(frame = context.frame, "New work arrived during frame; re-arming");
            self.request_tick(None);
        }
        true
    }

    fn request_tick(&self, delay: Option<Duration>) {
        match self.inner.tick_source.try_borrow_mut() {
            Ok(mut source) => source.request_tick(delay),
            // A tick source calling run_frame synchronously from request_tick
            // violates the TickSource contract; drop rather than panic.
            Err(_) => error!("Tick source re-entered; request dropped"),
        }
    }

    // --- Introspection ------------------------------------------------------

    pub fn is_active(&self) -> bool {
        self.inner.clock.is_active()
    }

    pub fn phase(&self) -> FramePhase {
        self.inner.clock.phase()
    }

    pub fn frame(&self) -> u64 {
        self.inner.clock.frame()
    }

    pub fn needs_update(&self) -> bool {
        self.inner.clock.needs_update()
    }

    /// Frame metadata as of the most recently processed tick.
    pub fn frame_context(&self) -> FrameContext {
        self.inner.clock.context()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Aligned FPS/frame-time lines for a stats overlay or shutdown log.
    pub fn metrics_summary(&self) -> Vec<String> {
        self.inner.metrics.summary().into_vec()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
