use thiserror::Error;

/// Errors that can occur within the scheduling subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Growing the task list failed; the registry is left unchanged.
    #[error("task list allocation failed")]
    Allocation,

    /// The timer driver refused to arm a timer (it has shut down).
    #[error("timer creation failed: {0}")]
    TimerCreation(String),

    /// The schedule fields do not describe a representable time.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
