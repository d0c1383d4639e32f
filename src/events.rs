//! Event vocabulary: types, registration options, and delivered payloads.

use std::fmt;
use std::time::Duration;

use glam::Vec3;
use strum_macros::IntoStaticStr;

use crate::clock::FrameContext;
use crate::constants::{ASSET_PROGRESS_THROTTLE, CAMERA_MOVE_THROTTLE};

/// A named category of notification with its own throttle/priority policy.
///
/// The well-known set is a closed enum so collaborators get compile-time
/// checking; `Custom` is the open extension point for ad hoc signals that
/// only a single collaborator pair cares about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A frame pass is about to run its systems.
    FrameStart,
    /// A frame pass finished running its systems.
    FrameEnd,
    /// Per-frame FPS and processing-time sample.
    PerformanceMetrics,
    /// An adaptive-quality collaborator changed the render scale.
    QualityAdjust,
    /// The camera position or target changed.
    CameraMove,
    /// Camera movement settled after its cooldown window.
    CameraSettled,
    /// An asset began loading.
    AssetLoadStart,
    /// Incremental asset load progress.
    AssetLoadProgress,
    /// An asset finished loading.
    AssetLoadComplete,
    /// An asset failed to load.
    AssetLoadError,
    /// An object was added to the scene/spatial index.
    ObjectAdded,
    /// An object was removed from the scene/spatial index.
    ObjectRemoved,
    /// A collaborator explicitly requested a redraw.
    RenderNeeded,
    /// Ad hoc event name outside the well-known set.
    Custom(String),
}

impl EventType {
    /// The statically declared event set, re-registered on every
    /// [`initialize`](crate::Scheduler::initialize).
    pub const BUILT_IN: [EventType; 13] = [
        EventType::FrameStart,
        EventType::FrameEnd,
        EventType::PerformanceMetrics,
        EventType::QualityAdjust,
        EventType::CameraMove,
        EventType::CameraSettled,
        EventType::AssetLoadStart,
        EventType::AssetLoadProgress,
        EventType::AssetLoadComplete,
        EventType::AssetLoadError,
        EventType::ObjectAdded,
        EventType::ObjectRemoved,
        EventType::RenderNeeded,
    ];

    /// Stable wire/log name of the event type.
    pub fn name(&self) -> &str {
        match self {
            EventType::FrameStart => "frame:start",
            EventType::FrameEnd => "frame:end",
            EventType::PerformanceMetrics => "performance:metrics",
            EventType::QualityAdjust => "quality:adjust",
            EventType::CameraMove => "camera:move",
            EventType::CameraSettled => "camera:settled",
            EventType::AssetLoadStart => "asset:load-start",
            EventType::AssetLoadProgress => "asset:load-progress",
            EventType::AssetLoadComplete => "asset:load-complete",
            EventType::AssetLoadError => "asset:load-error",
            EventType::ObjectAdded => "object:added",
            EventType::ObjectRemoved => "object:removed",
            EventType::RenderNeeded => "render:needed",
            EventType::Custom(name) => name,
        }
    }

    /// Options applied when a type is registered implicitly (first `emit` or
    /// `subscribe`). The two naturally spammy sources ship throttled.
    pub fn default_options(&self) -> EventOptions {
        match self {
            EventType::CameraMove => EventOptions::default().with_throttle(CAMERA_MOVE_THROTTLE),
            EventType::AssetLoadProgress => {
                EventOptions::default().with_throttle(ASSET_PROGRESS_THROTTLE)
            }
            _ => EventOptions::default(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        EventType::Custom(name.to_string())
    }
}

/// Registration-time policy for an event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventOptions {
    /// Default listener priority for the type; lower runs earlier.
    pub priority: i32,
    /// Minimum time between two accepted dispatches. Zero disables throttling.
    pub throttle: Duration,
}

impl Default for EventOptions {
    fn default() -> Self {
        Self {
            priority: 0,
            throttle: Duration::ZERO,
        }
    }
}

impl EventOptions {
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Shorthand for a throttled type with default priority.
    pub fn throttled(throttle: Duration) -> Self {
        Self::default().with_throttle(throttle)
    }
}

/// Typed payload shapes delivered alongside an event.
#[derive(Debug, Clone, PartialEq, IntoStaticStr)]
pub enum EventPayload {
    None,
    /// Camera position/target, with an optional transition duration in seconds.
    Camera {
        position: Vec3,
        target: Vec3,
        duration: Option<f32>,
    },
    /// FPS estimate and frame-processing duration.
    Metrics { fps: f32, frame_time: Duration },
    /// Asset load progress counters.
    Progress { loaded: u32, total: u32 },
    /// Scene object identity for add/remove notifications.
    Object { id: String },
    Scalar(f64),
    Text(String),
}

impl EventPayload {
    /// Variant name, for structured log fields.
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// The value handed to every listener: the payload merged with the event type
/// and the frame metadata current at dispatch time.
#[derive(Debug, Clone, PartialEq)]
pub struct EventContext {
    pub event: EventType,
    pub frame: FrameContext,
    pub payload: EventPayload,
}
