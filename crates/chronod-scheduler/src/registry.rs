//! The task registry: an ordered, capacity-tracked list of pending tasks
//! behind one coarse lock.
//!
//! Every operation — add from the dispatch loop, cancel from the dispatch
//! loop or a one-shot completion, list for Display, drain at shutdown —
//! takes the same lock, so no traversal ever observes a half-applied
//! mutation and the fire-vs-cancel race resolves to exactly one winner.

use std::sync::{Arc, Mutex};

use chrono::Local;
use tracing::{debug, info};

use crate::error::{Result, SchedulerError};
use crate::time;
use crate::timer::{FireJob, TimerTx};
use crate::types::{ScheduleKind, Task, TaskId, TaskSnapshot};
use chronod_core::TimeSpec;

/// Starting capacity; doubles whenever an add would exceed it.
pub const INITIAL_CAPACITY: usize = 10;

/// One accepted scheduling request, ready for the registry.
#[derive(Debug, Clone)]
pub struct AddRequest {
    pub kind: ScheduleKind,
    pub program: String,
    pub args: Vec<String>,
    pub spec: TimeSpec,
}

pub struct TaskRegistry {
    tasks: Vec<Task>,
    capacity: usize,
    next_id: TaskId,
    timers: TimerTx,
}

impl TaskRegistry {
    fn new(timers: TimerTx) -> Self {
        Self {
            tasks: Vec::with_capacity(INITIAL_CAPACITY),
            capacity: INITIAL_CAPACITY,
            next_id: 0,
            timers,
        }
    }

    /// Register a task: compute its execution time, grow capacity if full,
    /// arm its timer, append. On any failure the registry is unchanged and
    /// no timer is left armed.
    fn add(&mut self, request: AddRequest) -> Result<TaskId> {
        let execution_time = time::execution_time(request.kind, &request.spec, Local::now())?;

        if self.tasks.len() == self.capacity {
            let grown = self.capacity * 2;
            self.tasks
                .try_reserve_exact(grown - self.tasks.len())
                .map_err(|_| SchedulerError::Allocation)?;
            self.capacity = grown;
            debug!(capacity = grown, "task list capacity doubled");
        }

        let interval = match request.kind {
            ScheduleKind::Periodic => time::periodic_interval(&request.spec),
            _ => None,
        };
        let id = self.next_id;
        let job = FireJob {
            id,
            program: request.program.clone(),
            args: request.args.clone(),
            one_shot: !request.kind.is_periodic(),
        };
        let timer = self.timers.arm(id, execution_time, interval, job)?;

        self.next_id += 1;
        self.tasks.push(Task {
            id,
            kind: request.kind,
            program: request.program,
            args: request.args,
            execution_time,
            timer,
            active: true,
        });
        Ok(id)
    }

    /// Release the task's timer and remove its entry, preserving the order
    /// of the rest. False, with no mutation, when the id is absent.
    fn cancel(&mut self, id: TaskId) -> bool {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            return false;
        };
        let mut task = self.tasks.remove(index);
        task.active = false;
        task.timer.release();
        debug!(task_id = id, "task removed");
        true
    }

    fn list(&self) -> Vec<TaskSnapshot> {
        self.tasks
            .iter()
            .map(|t| TaskSnapshot {
                id: t.id,
                program: t.program.clone(),
                execution_time: t.execution_time,
            })
            .collect()
    }

    /// Release every timer and empty the registry. Shutdown only.
    fn drain_all(&mut self) {
        let count = self.tasks.len();
        for task in self.tasks.drain(..) {
            task.timer.release();
        }
        info!(count, "registry drained");
    }
}

/// Cheaply cloneable handle; clones share one registry and its lock.
#[derive(Clone)]
pub struct RegistryHandle {
    inner: Arc<Mutex<TaskRegistry>>,
}

impl RegistryHandle {
    pub fn new(timers: TimerTx) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TaskRegistry::new(timers))),
        }
    }

    pub fn add(&self, request: AddRequest) -> Result<TaskId> {
        self.inner.lock().unwrap().add(request)
    }

    pub fn cancel(&self, id: TaskId) -> bool {
        self.inner.lock().unwrap().cancel(id)
    }

    /// Snapshot read of `(id, program, execution time)` per task, in
    /// registration order.
    pub fn list(&self) -> Vec<TaskSnapshot> {
        self.inner.lock().unwrap().list()
    }

    pub fn drain_all(&self) {
        self.inner.lock().unwrap().drain_all()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().capacity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerCmd;
    use tokio::sync::mpsc;

    fn registry() -> (RegistryHandle, mpsc::UnboundedReceiver<TimerCmd>) {
        let (timers, rx) = TimerTx::stub();
        (RegistryHandle::new(timers), rx)
    }

    fn relative(seconds: i64) -> AddRequest {
        AddRequest {
            kind: ScheduleKind::Relative,
            program: "/bin/true".into(),
            args: vec![],
            spec: TimeSpec::new(0, 0, 0, 0, seconds),
        }
    }

    #[test]
    fn ids_are_unique_and_strictly_increasing() {
        let (registry, _rx) = registry();
        let mut last = None;
        for _ in 0..25 {
            let id = registry.add(relative(60)).unwrap();
            if let Some(prev) = last {
                assert!(id > prev);
            }
            last = Some(id);
        }
    }

    #[test]
    fn cancelled_ids_are_never_reused() {
        let (registry, _rx) = registry();
        let first = registry.add(relative(60)).unwrap();
        assert!(registry.cancel(first));
        let second = registry.add(relative(60)).unwrap();
        assert!(second > first);
    }

    #[test]
    fn capacity_doubles_exactly_when_full() {
        let (registry, _rx) = registry();
        for _ in 0..INITIAL_CAPACITY {
            registry.add(relative(60)).unwrap();
        }
        assert_eq!(registry.capacity(), INITIAL_CAPACITY);

        let ids_before: Vec<_> = registry.list().iter().map(|t| t.id).collect();
        registry.add(relative(60)).unwrap();
        assert_eq!(registry.capacity(), INITIAL_CAPACITY * 2);

        // Doubling drops and reorders nothing.
        let ids_after: Vec<_> = registry.list().iter().map(|t| t.id).collect();
        assert_eq!(&ids_after[..ids_before.len()], &ids_before[..]);
        assert_eq!(ids_after.len(), ids_before.len() + 1);
    }

    #[test]
    fn cancel_of_absent_id_changes_nothing() {
        let (registry, _rx) = registry();
        registry.add(relative(60)).unwrap();
        let before: Vec<_> = registry.list().iter().map(|t| t.id).collect();

        assert!(!registry.cancel(999));
        let after: Vec<_> = registry.list().iter().map(|t| t.id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn cancel_removes_exactly_one_and_preserves_order() {
        let (registry, mut rx) = registry();
        let ids: Vec<_> = (0..5)
            .map(|_| registry.add(relative(60)).unwrap())
            .collect();

        assert!(registry.cancel(ids[2]));
        let remaining: Vec<_> = registry.list().iter().map(|t| t.id).collect();
        assert_eq!(remaining, vec![ids[0], ids[1], ids[3], ids[4]]);

        // Exactly one disarm went to the timer driver, for the right task.
        let mut disarmed = vec![];
        while let Ok(cmd) = rx.try_recv() {
            if let TimerCmd::Disarm { id } = cmd {
                disarmed.push(id);
            }
        }
        assert_eq!(disarmed, vec![ids[2]]);
    }

    #[test]
    fn list_reports_what_was_added() {
        let (registry, _rx) = registry();
        let id = registry.add(relative(120)).unwrap();

        let snapshot = registry.list();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
        assert_eq!(snapshot[0].program, "/bin/true");
        let line = snapshot[0].to_string();
        assert!(line.starts_with(&format!("ID: {id} | Program: /bin/true | Time: ")));
    }

    #[test]
    fn drain_releases_every_timer() {
        let (registry, mut rx) = registry();
        for _ in 0..4 {
            registry.add(relative(60)).unwrap();
        }
        registry.drain_all();
        assert!(registry.is_empty());

        let disarms = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|cmd| matches!(cmd, TimerCmd::Disarm { .. }))
            .count();
        assert_eq!(disarms, 4);
    }

    #[test]
    fn invalid_absolute_schedule_leaves_registry_unchanged() {
        let (registry, _rx) = registry();
        let request = AddRequest {
            kind: ScheduleKind::Absolute,
            program: "/bin/true".into(),
            args: vec![],
            spec: TimeSpec::new(i64::MAX, 0, 0, 0, 0),
        };
        assert!(registry.add(request).is_err());
        assert!(registry.is_empty());

        // The failed add consumed no id.
        let id = registry.add(relative(60)).unwrap();
        assert_eq!(id, 0);
    }
}
