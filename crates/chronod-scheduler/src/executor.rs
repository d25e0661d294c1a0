//! Task executor: turns fired timers into detached child processes.
//!
//! Launch is fire-and-forget from the scheduler's point of view, but the
//! child is not abandoned: its pid is recorded and a background task reaps
//! the exit status, so no zombies accumulate and abnormal exits are logged.

use std::process::Stdio;
use std::sync::Arc;

use chronod_logger::{Logger, Verbosity};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::registry::RegistryHandle;
use crate::timer::FireJob;

/// Seam between the executor and the operating system. Tests substitute a
/// recording implementation; production uses [`ProcessSpawner`].
pub trait Spawn: Send + Sync {
    /// Launch `program` detached; returns the child pid.
    fn launch(&self, program: &str, args: &[String]) -> std::io::Result<u32>;
}

/// Spawns real detached children with null stdio and reaps them in the
/// background.
pub struct ProcessSpawner;

impl Spawn for ProcessSpawner {
    fn launch(&self, program: &str, args: &[String]) -> std::io::Result<u32> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        let pid = child.id().unwrap_or_default();

        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => debug!(pid, "child exited cleanly"),
                Ok(status) => warn!(pid, %status, "child exited abnormally"),
                Err(e) => warn!(pid, "failed to reap child: {e}"),
            }
        });
        Ok(pid)
    }
}

/// Drains fired jobs: launch the program, then remove one-shot tasks from
/// the registry. Runs independently of the dispatch loop, so its `cancel`
/// contends on the registry lock like any other caller.
pub struct TaskExecutor {
    rx: mpsc::UnboundedReceiver<FireJob>,
    registry: RegistryHandle,
    logger: Option<Logger>,
    spawner: Arc<dyn Spawn>,
}

impl TaskExecutor {
    pub fn spawn(
        rx: mpsc::UnboundedReceiver<FireJob>,
        registry: RegistryHandle,
        logger: Option<Logger>,
        spawner: Arc<dyn Spawn>,
    ) {
        let executor = TaskExecutor {
            rx,
            registry,
            logger,
            spawner,
        };
        tokio::spawn(executor.run());
    }

    async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            self.execute(&job);
        }
        debug!("task executor stopped");
    }

    fn execute(&self, job: &FireJob) {
        info!(task_id = job.id, program = %job.program, "task fired");
        if let Some(ref logger) = self.logger {
            let _ = logger.write(
                Verbosity::Standard,
                &format!("task {} started: {}", job.id, job.program),
            );
        }

        match self.spawner.launch(&job.program, &job.args) {
            Ok(pid) => debug!(task_id = job.id, pid, "child process spawned"),
            Err(e) => {
                warn!(task_id = job.id, program = %job.program, "spawn failed: {e}");
                if let Some(ref logger) = self.logger {
                    let _ = logger.write(
                        Verbosity::Low,
                        &format!("task {} failed to start {}: {e}", job.id, job.program),
                    );
                }
            }
        }

        // Launch first, then cancel: a concurrent operator Cancel may have
        // already removed the task, in which case this observes not-found.
        if job.one_shot {
            self.registry.cancel(job.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AddRequest;
    use crate::timer::TimerTx;
    use crate::types::ScheduleKind;
    use chronod_core::TimeSpec;
    use std::sync::Mutex;
    use std::time::Duration;

    struct RecordingSpawner {
        launched: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingSpawner {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                launched: Mutex::new(vec![]),
                fail,
            })
        }
    }

    impl Spawn for RecordingSpawner {
        fn launch(&self, program: &str, _args: &[String]) -> std::io::Result<u32> {
            if self.fail {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such program",
                ));
            }
            self.launched.lock().unwrap().push(program.to_string());
            Ok(4242)
        }
    }

    fn fixture(
        spawner: Arc<RecordingSpawner>,
    ) -> (
        RegistryHandle,
        mpsc::UnboundedSender<FireJob>,
        mpsc::UnboundedReceiver<crate::timer::TimerCmd>,
    ) {
        let (timers, timer_rx) = TimerTx::stub();
        let registry = RegistryHandle::new(timers);
        let (tx, rx) = mpsc::unbounded_channel();
        TaskExecutor::spawn(rx, registry.clone(), None, spawner);
        (registry, tx, timer_rx)
    }

    async fn settle(registry: &RegistryHandle, until_len: usize) {
        for _ in 0..100 {
            if registry.len() == until_len {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn one_shot_task_is_removed_after_launch() {
        let spawner = RecordingSpawner::new(false);
        let (registry, fired, _timers) = fixture(spawner.clone());

        let id = registry
            .add(AddRequest {
                kind: ScheduleKind::Relative,
                program: "/bin/true".into(),
                args: vec![],
                spec: TimeSpec::new(0, 0, 0, 0, 60),
            })
            .unwrap();

        fired
            .send(FireJob {
                id,
                program: "/bin/true".into(),
                args: vec![],
                one_shot: true,
            })
            .unwrap();

        settle(&registry, 0).await;
        assert!(registry.is_empty());
        assert_eq!(*spawner.launched.lock().unwrap(), vec!["/bin/true"]);
    }

    #[tokio::test]
    async fn periodic_task_stays_registered() {
        let spawner = RecordingSpawner::new(false);
        let (registry, fired, _timers) = fixture(spawner.clone());

        let id = registry
            .add(AddRequest {
                kind: ScheduleKind::Periodic,
                program: "/bin/date".into(),
                args: vec![],
                spec: TimeSpec::new(0, 0, 0, 0, 1),
            })
            .unwrap();

        for _ in 0..3 {
            fired
                .send(FireJob {
                    id,
                    program: "/bin/date".into(),
                    args: vec![],
                    one_shot: false,
                })
                .unwrap();
        }

        // Give the executor time to process all three fires.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(registry.len(), 1);
        assert_eq!(spawner.launched.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn spawn_failure_still_completes_the_one_shot() {
        let spawner = RecordingSpawner::new(true);
        let (registry, fired, _timers) = fixture(spawner.clone());

        let id = registry
            .add(AddRequest {
                kind: ScheduleKind::Relative,
                program: "/no/such/program".into(),
                args: vec![],
                spec: TimeSpec::new(0, 0, 0, 0, 60),
            })
            .unwrap();

        fired
            .send(FireJob {
                id,
                program: "/no/such/program".into(),
                args: vec![],
                one_shot: true,
            })
            .unwrap();

        settle(&registry, 0).await;
        assert!(registry.is_empty());
        assert!(spawner.launched.lock().unwrap().is_empty());
    }
}
