//! Demo host driver: runs the scheduler against a real-time pending-tick
//! source with fixed-rate pacing, wiring a pair of collaborators (camera
//! drift, adaptive quality) to exercise the public contract end to end.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use glam::Vec3;
use tracing::{debug, info, warn};

use crate::clock::FramePhase;
use crate::constants::LOOP_TIME;
use crate::error::SchedulerResult;
use crate::events::{EventPayload, EventType};
use crate::scheduler::Scheduler;

/// Shared slot holding the next host tick deadline. Acts as the injected
/// tick source: the scheduler arms it, the host loop drains it.
#[derive(Clone, Default)]
struct PendingTick(Rc<Cell<Option<Instant>>>);

impl PendingTick {
    fn arm(&self, delay: Option<Duration>) {
        self.0.set(Some(Instant::now() + delay.unwrap_or(Duration::ZERO)));
    }

    fn take_due(&self, now: Instant) -> bool {
        match self.0.get() {
            Some(due) if due <= now => {
                self.0.set(None);
                true
            }
            _ => false,
        }
    }
}

pub struct AppConfig {
    /// Frame rate ceiling handed to the scheduler; `None` leaves it uncapped.
    pub target_fps: Option<f32>,
    /// How long the camera keeps orbiting before the demo lets the loop drain.
    pub orbit_for: Duration,
    /// Hard stop for the whole demo.
    pub run_for: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_fps: Some(60.0),
            orbit_for: Duration::from_secs(2),
            run_for: Duration::from_secs(4),
        }
    }
}

/// Main application wrapper managing scheduler lifecycle and the host loop.
pub struct App {
    scheduler: Scheduler,
    pending: PendingTick,
    config: AppConfig,
    started: Instant,
    orbit_stopped: bool,
}

impl App {
    /// Builds the scheduler, installs the demo collaborators, and arms the
    /// first frame.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidFrameRate` for a non-positive or
    /// non-finite `target_fps`.
    pub fn new(config: AppConfig) -> SchedulerResult<Self> {
        let pending = PendingTick::default();
        let scheduler = {
            let slot = pending.clone();
            Scheduler::new(move |delay: Option<Duration>| slot.arm(delay))
        };
        scheduler.set_target_frame_rate(config.target_fps)?;
        scheduler.initialize();

        Self::install_collaborators(&scheduler);
        scheduler.request_frame();

        info!(target_fps = ?config.target_fps, "Application initialized");
        Ok(App {
            scheduler,
            pending,
            config,
            started: Instant::now(),
            orbit_stopped: false,
        })
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Demo collaborators from the scheduler's point of view: a camera system
    /// producing movement events each frame, and a quality controller that
    /// consumes performance samples and reports decisions back over the bus.
    fn install_collaborators(scheduler: &Scheduler) {
        scheduler.register_system(
            "camera-drift",
            |sched, ctx| {
                let angle = ctx.elapsed_secs() * 0.4;
                let position = Vec3::new(angle.cos() * 40.0, 18.0, angle.sin() * 40.0);
                sched.emit(
                    EventType::CameraMove,
                    EventPayload::Camera {
                        position,
                        target: Vec3::ZERO,
                        duration: None,
                    },
                );
            },
            10,
            true,
        );

        let quality = Rc::new(Cell::new(1.0f32));
        scheduler.subscribe(
            "quality-feedback",
            EventType::PerformanceMetrics,
            move |sched, ctx| {
                let EventPayload::Metrics { fps, .. } = ctx.payload else {
                    return;
                };
                let current = quality.get();
                let next = if fps > 0.0 && fps < 30.0 {
                    (current * 0.85).max(0.5)
                } else {
                    (current + 0.01).min(1.0)
                };
                if (next - current).abs() > f32::EPSILON {
                    quality.set(next);
                    sched.emit(EventType::QualityAdjust, EventPayload::Scalar(next as f64));
                }
            },
            None,
        );

        scheduler.subscribe(
            "quality-log",
            EventType::QualityAdjust,
            |_, ctx| {
                if let EventPayload::Scalar(scale) = ctx.payload {
                    debug!(scale, "Render quality adjusted");
                }
            },
            None,
        );
    }

    /// Executes one host loop iteration: fire a due tick if any, then sleep
    /// off the remainder of the loop budget.
    ///
    /// # Returns
    ///
    /// `true` while the demo should keep looping.
    pub fn run(&mut self) -> bool {
        let start = Instant::now();

        if self.pending.take_due(start) {
            self.scheduler.run_frame();
        }

        if !self.orbit_stopped && self.started.elapsed() >= self.config.orbit_for {
            self.orbit_stopped = true;
            if let Err(e) = self.scheduler.try_toggle_system("camera-drift", Some(false)) {
                warn!(error = %e, "Could not stop camera drift");
            } else {
                info!("Camera drift stopped; letting the loop drain");
            }
        }

        // Once the camera stops producing events the scheduler goes idle on
        // its own; that drain is the demand-driven behavior being demoed.
        let drained = self.scheduler.phase() == FramePhase::Idle && !self.scheduler.needs_update();
        if self.orbit_stopped && drained {
            info!(frames = self.scheduler.frame(), "Scheduler idle; demo complete");
            return false;
        }

        if self.started.elapsed() >= self.config.run_for {
            info!(frames = self.scheduler.frame(), "Demo window elapsed; stopping");
            return false;
        }

        if start.elapsed() < LOOP_TIME {
            let remaining = LOOP_TIME.saturating_sub(start.elapsed());
            if remaining != Duration::ZERO {
                spin_sleep::sleep(remaining);
            }
        } else {
            warn!("Host loop behind schedule by: {:?}", start.elapsed() - LOOP_TIME);
        }

        true
    }
}
