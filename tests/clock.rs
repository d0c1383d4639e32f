mod common;

use std::time::{Duration, Instant};

use framepulse::constants::MAX_DELTA;
use framepulse::{EventPayload, EventType, FramePhase, Scheduler, SchedulerError};
use pretty_assertions::assert_eq;

use common::{capture, scheduler_with_ticks};

#[test]
fn frame_counter_increments_once_per_tick() {
    let (scheduler, _ticks) = scheduler_with_ticks();
    let base = Instant::now();

    for i in 1..=3u64 {
        scheduler.request_frame();
        assert!(scheduler.run_frame_at(base + Duration::from_millis(20 * i)));
        assert_eq!(scheduler.frame(), i);
    }
}

#[test]
fn delta_is_clamped_after_a_stall() {
    let (scheduler, _ticks) = scheduler_with_ticks();
    scheduler.request_frame();
    assert!(scheduler.run_frame_at(Instant::now() + Duration::from_secs(3)));

    let ctx = scheduler.frame_context();
    assert_eq!(ctx.delta, MAX_DELTA);
    assert_eq!(ctx.elapsed, MAX_DELTA);
    assert_eq!(ctx.frame, 1);
}

#[test]
fn delta_never_goes_negative() {
    let before = Instant::now();
    let (scheduler, _ticks) = scheduler_with_ticks();

    // A tick stamped before the clock started saturates to zero.
    scheduler.request_frame();
    assert!(scheduler.run_frame_at(before));
    assert_eq!(scheduler.frame_context().delta, Duration::ZERO);
    assert_eq!(scheduler.frame(), 1);
}

#[test]
fn early_ticks_are_deferred_under_a_target_rate() {
    let (scheduler, ticks) = scheduler_with_ticks();
    scheduler.set_target_frame_rate(Some(2.0)).unwrap();

    scheduler.request_frame();
    assert_eq!(ticks.count(), 1);

    // Arrives well inside the 500ms period, so no frame runs; the scheduler
    // re-requests a tick carrying the remaining wait.
    assert!(!scheduler.run_frame_at(Instant::now()));
    assert_eq!(scheduler.frame(), 0);
    assert_eq!(scheduler.phase(), FramePhase::Scheduled);
    assert_eq!(ticks.count(), 2);
    let delay = ticks.last().flatten().unwrap_or_default();
    assert!(delay > Duration::from_millis(300), "deferred by {delay:?}");

    // The late retry is admitted.
    assert!(scheduler.run_frame_at(Instant::now() + Duration::from_secs(1)));
    assert_eq!(scheduler.frame(), 1);
}

#[test]
fn invalid_frame_rates_are_rejected() {
    let (scheduler, _ticks) = scheduler_with_ticks();
    for fps in [0.0, -30.0, f32::NAN, f32::INFINITY] {
        assert!(matches!(
            scheduler.set_target_frame_rate(Some(fps)),
            Err(SchedulerError::InvalidFrameRate(_))
        ));
    }
    assert!(scheduler.set_target_frame_rate(Some(60.0)).is_ok());
    assert!(scheduler.set_target_frame_rate(None).is_ok());
}

#[test]
fn inactive_scheduler_ignores_frame_requests() {
    let log = common::TickLog::default();
    let sink = log.clone();
    let scheduler = Scheduler::new(move |delay: Option<Duration>| sink.0.borrow_mut().push(delay));

    assert!(!scheduler.is_active());
    assert!(!scheduler.request_frame());
    assert!(!scheduler.run_frame());
    assert_eq!(scheduler.frame(), 0);
    assert_eq!(log.count(), 0);
}

#[test]
fn emit_while_inactive_delivers_but_does_not_arm() {
    let log = common::TickLog::default();
    let sink = log.clone();
    let scheduler = Scheduler::new(move |delay: Option<Duration>| sink.0.borrow_mut().push(delay));

    let (seen, listener) = capture();
    scheduler.subscribe("sink", EventType::from("early:bird"), listener, None);

    assert!(scheduler.emit(EventType::from("early:bird"), EventPayload::None));
    assert_eq!(seen.borrow().len(), 1);
    assert!(!scheduler.needs_update());
    assert_eq!(log.count(), 0);
}

#[test]
fn reset_clears_state_and_initialize_restarts() {
    let (scheduler, _ticks) = scheduler_with_ticks();
    let (_, listener) = capture();
    scheduler.subscribe("sink", EventType::RenderNeeded, listener, None);
    scheduler.register_system("worker", |_, _| {}, 0, true);
    scheduler.request_frame();
    scheduler.run_frame();
    assert_eq!(scheduler.frame(), 1);

    scheduler.reset();
    assert!(!scheduler.is_active());
    assert_eq!(scheduler.listener_count(), 0);
    assert_eq!(scheduler.system_count(), 0);
    assert_eq!(scheduler.frame(), 0);
    assert!(!scheduler.run_frame());

    scheduler.initialize();
    assert!(scheduler.is_active());
    assert!(scheduler.is_event_registered(&EventType::FrameStart));
    scheduler.request_frame();
    assert!(scheduler.run_frame());
    assert_eq!(scheduler.frame(), 1);
}

#[test]
fn work_flag_follows_the_frame_lifecycle() {
    let (scheduler, ticks) = scheduler_with_ticks();
    assert_eq!(scheduler.phase(), FramePhase::Idle);

    scheduler.emit(EventType::RenderNeeded, EventPayload::None);
    assert!(scheduler.needs_update());
    assert_eq!(scheduler.phase(), FramePhase::Scheduled);
    assert_eq!(ticks.count(), 1);

    assert!(scheduler.run_frame());
    assert!(!scheduler.needs_update());
    assert_eq!(scheduler.phase(), FramePhase::Idle);
    assert_eq!(ticks.count(), 1);
}

#[test]
fn lifecycle_events_do_not_rearm_the_loop() {
    let (scheduler, ticks) = scheduler_with_ticks();
    let (seen, listener) = capture();
    scheduler.subscribe("end-watcher", EventType::FrameEnd, listener, None);

    scheduler.request_frame();
    assert!(scheduler.run_frame());

    // The FrameEnd delivery itself must not count as new work.
    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(seen.borrow()[0].frame.frame, 1);
    assert_eq!(scheduler.phase(), FramePhase::Idle);
    assert_eq!(ticks.count(), 1);
}
