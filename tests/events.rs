mod common;

use std::rc::Rc;
use std::time::Duration;

use framepulse::constants::{ASSET_PROGRESS_THROTTLE, CAMERA_MOVE_THROTTLE};
use framepulse::{EventOptions, EventPayload, EventType};
use pretty_assertions::assert_eq;

use common::{order_log, scheduler_with_ticks};

#[test]
fn built_in_types_are_registered_on_initialize() {
    let (scheduler, _ticks) = scheduler_with_ticks();
    for event in EventType::BUILT_IN {
        assert!(scheduler.is_event_registered(&event), "{event} should be pre-registered");
    }
    assert!(!scheduler.is_event_registered(&EventType::from("adhoc:unseen")));
}

#[test]
fn spammy_types_ship_with_default_throttles() {
    let (scheduler, _ticks) = scheduler_with_ticks();

    let camera = scheduler.event_options(&EventType::CameraMove).unwrap();
    assert_eq!(camera.throttle, CAMERA_MOVE_THROTTLE);

    let progress = scheduler.event_options(&EventType::AssetLoadProgress).unwrap();
    assert_eq!(progress.throttle, ASSET_PROGRESS_THROTTLE);

    let frame = scheduler.event_options(&EventType::FrameStart).unwrap();
    assert_eq!(frame.throttle, Duration::ZERO);
}

#[test]
fn subscribers_inherit_the_type_default_priority() {
    let (scheduler, _ticks) = scheduler_with_ticks();
    let event = EventType::from("ranked:feed");
    scheduler.register_event(event.clone(), EventOptions::default().with_priority(7));

    let order = order_log();
    {
        let order = Rc::clone(&order);
        // No explicit priority: inherits 7 from the type.
        scheduler.subscribe(
            "inherited",
            event.clone(),
            move |_, _| order.borrow_mut().push("inherited"),
            None,
        );
    }
    {
        let order = Rc::clone(&order);
        scheduler.subscribe(
            "explicit",
            event.clone(),
            move |_, _| order.borrow_mut().push("explicit"),
            Some(3),
        );
    }

    scheduler.emit(event, EventPayload::None);
    assert_eq!(*order.borrow(), vec!["explicit", "inherited"]);
}

#[test]
fn payloads_round_through_dispatch_intact() {
    let (scheduler, _ticks) = scheduler_with_ticks();
    let order = order_log();

    {
        let order = Rc::clone(&order);
        scheduler.subscribe("object-sink", EventType::ObjectAdded, move |_, ctx| {
            let EventPayload::Object { id } = &ctx.payload else {
                panic!("expected an object payload, got {:?}", ctx.payload);
            };
            assert_eq!(ctx.event, EventType::ObjectAdded);
            assert_eq!(id, "rock-17");
            order.borrow_mut().push("delivered");
        }, None);
    }

    scheduler.emit(EventType::ObjectAdded, EventPayload::Object { id: "rock-17".into() });
    assert_eq!(*order.borrow(), vec!["delivered"]);
}
