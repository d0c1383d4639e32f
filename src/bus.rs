//! Event registry and listener bookkeeping for the bus.
//!
//! Dispatch itself lives on [`Scheduler`](crate::Scheduler), which owns the
//! handle listeners receive; this module keeps the descriptor and listener
//! maps and produces the stable snapshots dispatch iterates over.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use smallvec::SmallVec;
use tracing::trace;

use crate::events::{EventContext, EventOptions, EventType};
use crate::scheduler::Scheduler;

/// Callback bound to one event type.
pub type ListenerFn = dyn FnMut(&Scheduler, &EventContext);

/// Per-type dispatch policy and throttle bookkeeping.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EventDescriptor {
    pub priority: i32,
    pub throttle: Duration,
    pub last_fired: Option<Instant>,
}

impl EventDescriptor {
    fn from_options(options: EventOptions) -> Self {
        Self {
            priority: options.priority,
            throttle: options.throttle,
            last_fired: None,
        }
    }

    pub fn options(&self) -> EventOptions {
        EventOptions {
            priority: self.priority,
            throttle: self.throttle,
        }
    }
}

struct Listener {
    event: EventType,
    callback: Rc<RefCell<ListenerFn>>,
    priority: i32,
    active: bool,
    seq: u64,
}

pub(crate) struct EventBus {
    descriptors: RefCell<HashMap<EventType, EventDescriptor>>,
    listeners: RefCell<HashMap<String, Listener>>,
    next_seq: Cell<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            descriptors: RefCell::new(HashMap::new()),
            listeners: RefCell::new(HashMap::new()),
            next_seq: Cell::new(0),
        }
    }

    /// Creates a descriptor for `event` if none exists. Idempotent; returns
    /// whether a new descriptor was created. `options: None` applies the
    /// type's defaults.
    pub fn register(&self, event: EventType, options: Option<EventOptions>) -> bool {
        let mut descriptors = self.descriptors.borrow_mut();
        if descriptors.contains_key(&event) {
            return false;
        }
        let options = options.unwrap_or_else(|| event.default_options());
        trace!(
            event = %event,
            priority = options.priority,
            throttle = ?options.throttle,
            "Registering event type"
        );
        descriptors.insert(event, EventDescriptor::from_options(options));
        true
    }

    pub fn descriptor(&self, event: &EventType) -> Option<EventDescriptor> {
        self.descriptors.borrow().get(event).copied()
    }

    /// Stores or replaces the listener keyed by `id` (last write wins).
    /// Re-subscribing under an existing id keeps the original insertion rank
    /// so equal-priority ordering stays stable across hot-swaps.
    pub fn subscribe(
        &self,
        id: String,
        event: EventType,
        callback: Rc<RefCell<ListenerFn>>,
        priority: Option<i32>,
    ) {
        self.register(event.clone(), None);
        let priority = priority.unwrap_or_else(|| {
            self.descriptors
                .borrow()
                .get(&event)
                .map(|d| d.priority)
                .unwrap_or_default()
        });

        let mut listeners = self.listeners.borrow_mut();
        let seq = listeners.get(&id).map(|l| l.seq).unwrap_or_else(|| {
            let seq = self.next_seq.get();
            self.next_seq.set(seq + 1);
            seq
        });
        trace!(listener = %id, event = %event, priority, "Subscribing listener");
        listeners.insert(
            id,
            Listener {
                event,
                callback,
                priority,
                active: true,
                seq,
            },
        );
    }

    /// Removes the listener if present; returns false for unknown ids.
    pub fn unsubscribe(&self, id: &str) -> bool {
        let removed = self.listeners.borrow_mut().remove(id).is_some();
        if removed {
            trace!(listener = %id, "Unsubscribed listener");
        }
        removed
    }

    /// Flips a listener's active flag without removing the registration.
    pub fn set_listener_active(&self, id: &str, active: bool) -> bool {
        match self.listeners.borrow_mut().get_mut(id) {
            Some(listener) => {
                listener.active = active;
                true
            }
            None => false,
        }
    }

    /// Throttle gate for one emission observed at `now`. Auto-registers
    /// unknown types. On acceptance the descriptor's last-fired stamp is
    /// advanced; a rejected emission leaves it untouched (dropped, not queued).
    pub fn try_accept(&self, event: &EventType, now: Instant) -> bool {
        let mut descriptors = self.descriptors.borrow_mut();
        let descriptor = descriptors
            .entry(event.clone())
            .or_insert_with(|| EventDescriptor::from_options(event.default_options()));

        if descriptor.throttle > Duration::ZERO {
            if let Some(last) = descriptor.last_fired {
                if now.saturating_duration_since(last) < descriptor.throttle {
                    return false;
                }
            }
        }
        descriptor.last_fired = Some(now);
        true
    }

    /// Stable snapshot of the active listeners bound to `event`, ordered by
    /// (priority, insertion). Dispatch iterates this copy so subscribing or
    /// unsubscribing mid-dispatch cannot corrupt the pass in progress.
    pub fn snapshot(&self, event: &EventType) -> SmallVec<[(String, Rc<RefCell<ListenerFn>>); 8]> {
        let listeners = self.listeners.borrow();
        let mut matched: SmallVec<[(i32, u64, String, Rc<RefCell<ListenerFn>>); 8]> = listeners
            .iter()
            .filter(|(_, l)| l.active && l.event == *event)
            .map(|(id, l)| (l.priority, l.seq, id.clone(), Rc::clone(&l.callback)))
            .collect();
        matched.sort_by_key(|(priority, seq, _, _)| (*priority, *seq));
        matched.into_iter().map(|(_, _, id, cb)| (id, cb)).collect()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn clear(&self) {
        self.descriptors.borrow_mut().clear();
        self.listeners.borrow_mut().clear();
    }
}
