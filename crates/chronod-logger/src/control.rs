//! Operator control surface for the logger.
//!
//! Control actions arrive on an internal event bus; the OS-signal bridge is
//! one producer (SIGUSR1 toggle, SIGUSR2 cycle verbosity, SIGHUP snapshot
//! dump). The scheduler core never touches this module beyond registering a
//! snapshot source on the [`Logger`].

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::Logger;

/// One administrative action against the running logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    ToggleLogging,
    CycleVerbosity,
    DumpSnapshot,
}

/// Spawn the control task; returns the bus handle producers send into.
pub fn spawn_control(logger: Logger) -> mpsc::UnboundedSender<ControlEvent> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ControlEvent::ToggleLogging => {
                    let enabled = logger.toggle();
                    info!(enabled, "logging toggled");
                }
                ControlEvent::CycleVerbosity => {
                    let level = logger.cycle_verbosity();
                    info!(level = level.label(), "verbosity cycled");
                }
                ControlEvent::DumpSnapshot => match logger.dump_snapshot() {
                    Ok(path) => info!(path = %path.display(), "snapshot dumped"),
                    Err(e) => warn!("snapshot dump failed: {e}"),
                },
            }
        }
    });
    tx
}

/// Bridge process signals onto the control bus.
#[cfg(unix)]
pub fn spawn_signal_bridge(tx: mpsc::UnboundedSender<ControlEvent>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut toggle = match signal(SignalKind::user_defined1()) {
            Ok(s) => s,
            Err(e) => {
                warn!("SIGUSR1 handler unavailable: {e}");
                return;
            }
        };
        let mut cycle = match signal(SignalKind::user_defined2()) {
            Ok(s) => s,
            Err(e) => {
                warn!("SIGUSR2 handler unavailable: {e}");
                return;
            }
        };
        let mut dump = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                warn!("SIGHUP handler unavailable: {e}");
                return;
            }
        };

        loop {
            let event = tokio::select! {
                _ = toggle.recv() => ControlEvent::ToggleLogging,
                _ = cycle.recv() => ControlEvent::CycleVerbosity,
                _ = dump.recv() => ControlEvent::DumpSnapshot,
            };
            if tx.send(event).is_err() {
                break;
            }
        }
    });
}
