//! `chronod-scheduler` — task registry, timer driver, and executor.
//!
//! # Overview
//!
//! The registry is the single source of truth for pending tasks, held behind
//! one coarse lock shared by the dispatch loop and the asynchronous fire
//! path. One timer-driver task owns a min-heap of deadlines and fires due
//! tasks into the executor, which launches the target program as a detached
//! child and removes one-shot tasks from the registry.
//!
//! # Schedule kinds
//!
//! | Kind       | Behaviour                                                |
//! |------------|----------------------------------------------------------|
//! | `Relative` | Single fire at now + offset (calendar-normalized)        |
//! | `Absolute` | Single fire at an exact local wall-clock time            |
//! | `Periodic` | First fire as Relative, then every fixed-unit interval   |

pub mod error;
pub mod executor;
pub mod registry;
pub mod time;
pub mod timer;
pub mod types;

use std::sync::Arc;

use chronod_logger::Logger;
use tokio::sync::{mpsc, watch};

pub use error::{Result, SchedulerError};
pub use executor::{ProcessSpawner, Spawn, TaskExecutor};
pub use registry::{AddRequest, RegistryHandle, INITIAL_CAPACITY};
pub use timer::{FireJob, TimerDriver, TimerHandle, TimerTx};
pub use types::{ScheduleKind, Task, TaskId, TaskSnapshot};

/// A wired scheduler: registry handle plus the shutdown signal for the
/// background driver and executor tasks.
pub struct SchedulerRuntime {
    registry: RegistryHandle,
    shutdown_tx: watch::Sender<bool>,
}

impl SchedulerRuntime {
    pub fn registry(&self) -> RegistryHandle {
        self.registry.clone()
    }

    /// Stop the timer driver. Pending timers are expected to be drained from
    /// the registry first.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Wire the timer driver, executor, and registry together, launching
/// programs with the real process spawner.
pub fn start(logger: Option<Logger>) -> SchedulerRuntime {
    start_with(logger, Arc::new(ProcessSpawner))
}

/// As [`start`], with a caller-provided spawn seam (tests substitute a
/// recording spawner).
pub fn start_with(logger: Option<Logger>, spawner: Arc<dyn Spawn>) -> SchedulerRuntime {
    let (fired_tx, fired_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let timers = TimerDriver::spawn(fired_tx, shutdown_rx);
    let registry = RegistryHandle::new(timers);
    TaskExecutor::spawn(fired_rx, registry.clone(), logger, spawner);

    SchedulerRuntime {
        registry,
        shutdown_tx,
    }
}
