//! Centralized error types for the scheduler.
//!
//! Almost nothing in this crate is fatal: throttled emissions, re-entrant
//! ticks, and callback panics are reported through return values and logs.
//! The variants here cover the few operations that can genuinely be misused.

/// Main error type for scheduler operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("invalid target frame rate: {0}")]
    InvalidFrameRate(f32),

    #[error("unknown system: {0}")]
    UnknownSystem(String),

    #[error("unknown listener: {0}")]
    UnknownListener(String),
}

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;
