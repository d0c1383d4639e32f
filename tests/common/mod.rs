#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use framepulse::{EventContext, Scheduler};

/// Records every tick request the scheduler makes, with its delay hint.
#[derive(Clone, Default)]
pub struct TickLog(pub Rc<RefCell<Vec<Option<Duration>>>>);

impl TickLog {
    pub fn count(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn last(&self) -> Option<Option<Duration>> {
        self.0.borrow().last().copied()
    }
}

/// An initialized scheduler wired to a recording tick source.
pub fn scheduler_with_ticks() -> (Scheduler, TickLog) {
    let log = TickLog::default();
    let sink = log.clone();
    let scheduler = Scheduler::new(move |delay: Option<Duration>| sink.0.borrow_mut().push(delay));
    scheduler.initialize();
    (scheduler, log)
}

/// A listener callback that appends every delivered context to a shared log.
pub fn capture() -> (Rc<RefCell<Vec<EventContext>>>, impl FnMut(&Scheduler, &EventContext)) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    (log, move |_: &Scheduler, ctx: &EventContext| {
        sink.borrow_mut().push(ctx.clone())
    })
}

/// Shared ordering log for callbacks that only need to record who ran.
pub fn order_log() -> Rc<RefCell<Vec<&'static str>>> {
    Rc::new(RefCell::new(Vec::new()))
}
