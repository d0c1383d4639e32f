//! framepulse — a demand-driven frame scheduler with an integrated
//! publish/subscribe event bus for interactive real-time visualizations.
//!
//! The [`Scheduler`] coordinates recurring per-frame callbacks ("systems"),
//! cross-component notifications ("events"), frame timing, and back-pressure
//! against runaway re-scheduling, all on a single cooperative thread.

pub mod app;
pub mod clock;
pub mod constants;
pub mod error;
pub mod events;
pub mod formatter;
pub mod metrics;
pub mod scheduler;

mod bus;
mod systems;

pub use clock::{FrameContext, FramePhase, TickSource};
pub use error::{SchedulerError, SchedulerResult};
pub use events::{EventContext, EventOptions, EventPayload, EventType};
pub use metrics::MetricsSnapshot;
pub use scheduler::{Scheduler, Subscription, SystemRegistration};
