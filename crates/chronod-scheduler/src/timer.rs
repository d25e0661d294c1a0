//! Timer driver: one background task owning every pending deadline.
//!
//! Tasks arm timers through [`TimerTx`]; the driver keeps a min-heap of
//! `(deadline, task)` wakeups validated against an armed-task table (lazy
//! deletion), sleeps until the earliest live deadline, and sends a
//! [`FireJob`] to the executor for each task that comes due. Periodic tasks
//! re-arm at `deadline + interval`; one-shot tasks leave the table on fire.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

use crate::error::SchedulerError;
use crate::types::TaskId;

/// Everything the executor needs to launch a fired task without touching
/// the registry: captured at arm time, so a task cancelled between fire and
/// execution still launches (launch-then-cancel semantics).
#[derive(Debug, Clone)]
pub struct FireJob {
    pub id: TaskId,
    pub program: String,
    pub args: Vec<String>,
    pub one_shot: bool,
}

pub(crate) enum TimerCmd {
    Arm {
        id: TaskId,
        fire_at: DateTime<Local>,
        interval: Option<Duration>,
        job: FireJob,
    },
    Disarm {
        id: TaskId,
    },
}

/// Arming side of the driver, cloned into the registry.
#[derive(Clone)]
pub struct TimerTx {
    tx: mpsc::UnboundedSender<TimerCmd>,
}

impl TimerTx {
    /// Arm a timer for `id`. A `fire_at` already in the past fires
    /// immediately. Fails only when the driver has shut down.
    pub fn arm(
        &self,
        id: TaskId,
        fire_at: DateTime<Local>,
        interval: Option<Duration>,
        job: FireJob,
    ) -> Result<TimerHandle, SchedulerError> {
        self.tx
            .send(TimerCmd::Arm {
                id,
                fire_at,
                interval,
                job,
            })
            .map_err(|_| SchedulerError::TimerCreation("timer driver is not running".into()))?;
        Ok(TimerHandle {
            id,
            tx: self.tx.clone(),
        })
    }

    #[cfg(test)]
    pub(crate) fn stub() -> (TimerTx, mpsc::UnboundedReceiver<TimerCmd>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (TimerTx { tx }, rx)
    }
}

/// Exclusive ownership of one armed timer. Consumed on release, so a timer
/// is disarmed at most once; dropping a task without releasing is a bug the
/// registry never commits.
pub struct TimerHandle {
    id: TaskId,
    tx: mpsc::UnboundedSender<TimerCmd>,
}

impl TimerHandle {
    pub fn release(self) {
        let _ = self.tx.send(TimerCmd::Disarm { id: self.id });
    }
}

struct Armed {
    deadline: Instant,
    interval: Option<Duration>,
    job: FireJob,
}

/// The driver task. Construct through [`TimerDriver::spawn`].
pub struct TimerDriver {
    rx: mpsc::UnboundedReceiver<TimerCmd>,
    shutdown: watch::Receiver<bool>,
    fired_tx: mpsc::UnboundedSender<FireJob>,
    armed: HashMap<TaskId, Armed>,
    queue: BinaryHeap<Reverse<(Instant, TaskId)>>,
}

impl TimerDriver {
    /// Spawn the driver loop; fired jobs are sent to `fired_tx`.
    pub fn spawn(
        fired_tx: mpsc::UnboundedSender<FireJob>,
        shutdown: watch::Receiver<bool>,
    ) -> TimerTx {
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = TimerDriver {
            rx,
            shutdown,
            fired_tx,
            armed: HashMap::new(),
            queue: BinaryHeap::new(),
        };
        tokio::spawn(driver.run());
        TimerTx { tx }
    }

    async fn run(mut self) {
        debug!("timer driver started");
        loop {
            self.discard_stale();
            let next = self.queue.peek().map(|Reverse((deadline, _))| *deadline);
            // The sleep arm is disabled while nothing is armed; the fallback
            // deadline is never awaited.
            let idle = Instant::now() + Duration::from_secs(3600);

            tokio::select! {
                cmd = self.rx.recv() => match cmd {
                    Some(TimerCmd::Arm { id, fire_at, interval, job }) => {
                        let deadline = instant_for(fire_at);
                        trace!(task_id = id, "timer armed");
                        self.armed.insert(id, Armed { deadline, interval, job });
                        self.queue.push(Reverse((deadline, id)));
                    }
                    Some(TimerCmd::Disarm { id }) => {
                        self.armed.remove(&id);
                    }
                    None => break,
                },
                changed = self.shutdown.changed() => {
                    // A dropped sender means the runtime is gone — stop too.
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                _ = sleep_until(next.unwrap_or(idle)), if next.is_some() => {
                    self.fire_due();
                }
            }
        }
        debug!("timer driver stopped");
    }

    /// Pop heap entries whose armed record is gone or re-scheduled, so the
    /// next sleep targets a live deadline.
    fn discard_stale(&mut self) {
        while let Some(Reverse((deadline, id))) = self.queue.peek().copied() {
            let live = self
                .armed
                .get(&id)
                .is_some_and(|armed| armed.deadline == deadline);
            if live {
                break;
            }
            self.queue.pop();
        }
    }

    fn fire_due(&mut self) {
        let now = Instant::now();
        while let Some(Reverse((deadline, id))) = self.queue.peek().copied() {
            if deadline > now {
                break;
            }
            self.queue.pop();
            let Some(armed) = self.armed.get_mut(&id) else {
                continue; // disarmed since it was queued
            };
            if armed.deadline != deadline {
                continue; // superseded by a re-arm
            }

            debug!(task_id = id, "timer fired");
            let _ = self.fired_tx.send(armed.job.clone());

            match armed.interval {
                Some(interval) => {
                    armed.deadline = deadline + interval;
                    let next = armed.deadline;
                    self.queue.push(Reverse((next, id)));
                }
                None => {
                    self.armed.remove(&id);
                }
            }
        }
    }
}

/// Wall-clock deadline to a runtime instant, clamped so past times fire
/// immediately.
fn instant_for(fire_at: DateTime<Local>) -> Instant {
    let delay = (fire_at - Local::now()).to_std().unwrap_or(Duration::ZERO);
    Instant::now() + delay
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
