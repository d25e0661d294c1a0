use chrono::{DateTime, Local};

use crate::timer::TimerHandle;

/// Monotonically increasing task identifier, unique for the life of one
/// server process. Never reused after cancellation.
pub type TaskId = u64;

/// How a task's execution time (and any repetition) is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    /// Offset from now, fired once.
    Relative,
    /// Exact local wall-clock time, fired once.
    Absolute,
    /// Offset from now for the first fire, then a fixed repeat interval.
    Periodic,
}

impl ScheduleKind {
    pub fn is_periodic(&self) -> bool {
        matches!(self, ScheduleKind::Periodic)
    }
}

/// One registered job. Owns its timer exclusively: the handle is released
/// exactly once — at cancellation, at one-shot completion, or at shutdown
/// drain.
pub struct Task {
    pub id: TaskId,
    pub kind: ScheduleKind,
    pub program: String,
    pub args: Vec<String>,
    pub execution_time: DateTime<Local>,
    pub(crate) timer: TimerHandle,
    pub active: bool,
}

/// What `list()` exposes for one task: the fields a Display client prints.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub program: String,
    pub execution_time: DateTime<Local>,
}

impl std::fmt::Display for TaskSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ID: {} | Program: {} | Time: {}",
            self.id,
            self.program,
            self.execution_time.format("%Y-%m-%d %H:%M:%S")
        )
    }
}
