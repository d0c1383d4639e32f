//! Priority-ordered registry of recurring per-frame callbacks.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::trace;

use crate::clock::FrameContext;
use crate::scheduler::Scheduler;

/// Callback invoked once per processed frame tick.
pub type SystemFn = dyn FnMut(&Scheduler, &FrameContext);

struct ScheduledSystem {
    id: String,
    callback: Rc<RefCell<SystemFn>>,
    priority: i32,
    active: bool,
    seq: u64,
}

/// The system list is kept sorted ascending by (priority, insertion) after
/// every mutation, so a frame pass is a single in-order walk.
pub(crate) struct SystemRegistry {
    systems: RefCell<Vec<ScheduledSystem>>,
    next_seq: Cell<u64>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self {
            systems: RefCell::new(Vec::new()),
            next_seq: Cell::new(0),
        }
    }

    /// Inserts or replaces the system for `id`. Replacement updates the
    /// callback, priority, and active flag in place; the original insertion
    /// rank is kept for stable equal-priority ordering.
    pub fn register(
        &self,
        id: String,
        callback: Rc<RefCell<SystemFn>>,
        priority: i32,
        active: bool,
    ) {
        let mut systems = self.systems.borrow_mut();
        match systems.iter_mut().find(|s| s.id == id) {
            Some(slot) => {
                trace!(system = %id, priority, "Replacing registered system");
                slot.callback = callback;
                slot.priority = priority;
                slot.active = active;
            }
            None => {
                let seq = self.next_seq.get();
                self.next_seq.set(seq + 1);
                trace!(system = %id, priority, active, "Registering system");
                systems.push(ScheduledSystem {
                    id,
                    callback,
                    priority,
                    active,
                    seq,
                });
            }
        }
        systems.sort_by_key(|s| (s.priority, s.seq));
    }

    /// Removes by id; no-op returning false if absent.
    pub fn unregister(&self, id: &str) -> bool {
        let mut systems = self.systems.borrow_mut();
        let before = systems.len();
        systems.retain(|s| s.id != id);
        let removed = systems.len() != before;
        if removed {
            trace!(system = %id, "Unregistered system");
        }
        removed
    }

    /// Flips or explicitly sets the active flag. Returns whether `id` exists.
    pub fn toggle(&self, id: &str, active: Option<bool>) -> bool {
        let mut systems = self.systems.borrow_mut();
        match systems.iter_mut().find(|s| s.id == id) {
            Some(system) => {
                system.active = active.unwrap_or(!system.active);
                trace!(system = %id, active = system.active, "Toggled system");
                true
            }
            None => false,
        }
    }

    /// Stable snapshot of the active systems in execution order. The frame
    /// pass iterates this copy, so registry mutation from inside an update
    /// callback takes effect next tick.
    pub fn snapshot(&self) -> SmallVec<[(String, Rc<RefCell<SystemFn>>); 16]> {
        self.systems
            .borrow()
            .iter()
            .filter(|s| s.active)
            .map(|s| (s.id.clone(), Rc::clone(&s.callback)))
            .collect()
    }

    /// Priorities in list order; ascending by construction.
    pub fn priorities(&self) -> Vec<i32> {
        self.systems.borrow().iter().map(|s| s.priority).collect()
    }

    pub fn len(&self) -> usize {
        self.systems.borrow().len()
    }

    pub fn clear(&self) {
        self.systems.borrow_mut().clear();
    }
}
