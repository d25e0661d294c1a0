//! `chronod-logger` — the append-only operator log and its control surface.
//!
//! The scheduler core calls [`Logger::write`] for every significant event and
//! ignores the result; logging failures never influence scheduling control
//! flow. Operators steer the logger out-of-band through [`control`]: an
//! internal event bus that toggles logging, cycles the verbosity label, and
//! dumps a timestamped diagnostic snapshot, with OS signals bridged in as one
//! producer.

pub mod control;

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use chronod_core::config::LogConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("logger is already initialized")]
    AlreadyInitialized,

    #[error("logger is not initialized")]
    NotInitialized,

    #[error("logging is disabled")]
    Disabled,

    #[error("log write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Verbosity label attached to every line. Cycled by the control surface;
/// reported in snapshot dumps. The label does not gate writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Low = 1,
    Standard = 2,
    High = 3,
}

impl Verbosity {
    pub fn label(&self) -> &'static str {
        match self {
            Verbosity::Low => "LOW",
            Verbosity::Standard => "STANDARD",
            Verbosity::High => "HIGH",
        }
    }

    /// Low → Standard → High → Low.
    pub fn next(&self) -> Verbosity {
        match self {
            Verbosity::Low => Verbosity::Standard,
            Verbosity::Standard => Verbosity::High,
            Verbosity::High => Verbosity::Low,
        }
    }

    fn from_u8(v: u8) -> Verbosity {
        match v {
            1 => Verbosity::Low,
            2 => Verbosity::Standard,
            _ => Verbosity::High,
        }
    }
}

type SnapshotFn = Box<dyn Fn() -> String + Send + Sync>;

/// One log file may be owned by at most one live Logger in this process.
fn open_paths() -> &'static Mutex<HashSet<PathBuf>> {
    static OPEN: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    OPEN.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Cheaply cloneable handle to the operator log.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    dump_dir: PathBuf,
    file: Mutex<File>,
    open: AtomicBool,
    enabled: AtomicBool,
    level: AtomicU8,
    snapshot: Mutex<Option<SnapshotFn>>,
}

impl Logger {
    /// Open the log file in append mode. A second init for the same path
    /// while a Logger is live returns `AlreadyInitialized`.
    pub fn init(config: &LogConfig) -> Result<Logger, LoggerError> {
        let path = PathBuf::from(&config.path);
        {
            let mut open = open_paths().lock().unwrap();
            if !open.insert(path.clone()) {
                return Err(LoggerError::AlreadyInitialized);
            }
        }

        let opened = (|| {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            OpenOptions::new().create(true).append(true).open(&path)
        })();
        let file = match opened {
            Ok(f) => f,
            Err(e) => {
                open_paths().lock().unwrap().remove(&path);
                return Err(LoggerError::Io(e));
            }
        };

        Ok(Logger {
            inner: Arc::new(Inner {
                path,
                dump_dir: PathBuf::from(&config.dump_dir),
                file: Mutex::new(file),
                open: AtomicBool::new(true),
                enabled: AtomicBool::new(true),
                level: AtomicU8::new(Verbosity::Low as u8),
                snapshot: Mutex::new(None),
            }),
        })
    }

    /// Stop accepting writes and release the path for a future init.
    pub fn close(&self) -> Result<(), LoggerError> {
        if !self.inner.open.swap(false, Ordering::SeqCst) {
            return Err(LoggerError::NotInitialized);
        }
        open_paths().lock().unwrap().remove(&self.inner.path);
        Ok(())
    }

    /// Append one `[HH:MM:SS] [LEVEL]: message` line.
    pub fn write(&self, level: Verbosity, message: &str) -> Result<(), LoggerError> {
        if !self.inner.open.load(Ordering::SeqCst) {
            return Err(LoggerError::NotInitialized);
        }
        if !self.inner.enabled.load(Ordering::SeqCst) {
            return Err(LoggerError::Disabled);
        }
        let stamp = chrono::Local::now().format("%H:%M:%S");
        let mut file = self.inner.file.lock().unwrap();
        writeln!(file, "[{stamp}] [{}]: {message}", level.label())?;
        Ok(())
    }

    /// Flip the enabled flag; returns the new state.
    pub fn toggle(&self) -> bool {
        let was = self.inner.enabled.fetch_xor(true, Ordering::SeqCst);
        !was
    }

    pub fn enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Advance the verbosity label; returns the new value.
    pub fn cycle_verbosity(&self) -> Verbosity {
        let next = self.verbosity().next();
        self.inner.level.store(next as u8, Ordering::SeqCst);
        next
    }

    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_u8(self.inner.level.load(Ordering::SeqCst))
    }

    /// Register the snapshot content source. The core registers a callback
    /// that renders registry diagnostics; without one, dumps carry a default
    /// header.
    pub fn set_snapshot_source<F>(&self, source: F)
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        *self.inner.snapshot.lock().unwrap() = Some(Box::new(source));
    }

    /// Write a timestamped diagnostic dump file; returns its path.
    pub fn dump_snapshot(&self) -> std::io::Result<PathBuf> {
        let now = chrono::Local::now();
        std::fs::create_dir_all(&self.inner.dump_dir)?;
        let path = self
            .inner
            .dump_dir
            .join(now.format("dump_%Y-%m-%d_%H-%M-%S.dump").to_string());

        let body = match &*self.inner.snapshot.lock().unwrap() {
            Some(source) => source(),
            None => format!(
                "dump time: {}\npid: {}\nverbosity: {}\nlogging enabled: {}\n",
                now.format("%Y-%m-%d %H:%M:%S"),
                std::process::id(),
                self.verbosity().label(),
                self.enabled(),
            ),
        };
        std::fs::write(&path, body)?;
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &tempfile::TempDir, name: &str) -> LogConfig {
        LogConfig {
            path: dir.path().join(name).display().to_string(),
            dump_dir: dir.path().display().to_string(),
        }
    }

    #[test]
    fn writes_are_appended_with_level_tag() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, "chronod.log");
        let logger = Logger::init(&config).unwrap();

        logger.write(Verbosity::Standard, "task 0 added").unwrap();
        logger.write(Verbosity::High, "shutting down").unwrap();
        logger.close().unwrap();

        let contents = std::fs::read_to_string(&config.path).unwrap();
        assert!(contents.contains("[STANDARD]: task 0 added"));
        assert!(contents.contains("[HIGH]: shutting down"));
    }

    #[test]
    fn second_init_for_same_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, "chronod.log");
        let logger = Logger::init(&config).unwrap();

        assert!(matches!(
            Logger::init(&config),
            Err(LoggerError::AlreadyInitialized)
        ));
        logger.close().unwrap();

        // Released on close — a fresh init succeeds.
        let again = Logger::init(&config).unwrap();
        again.close().unwrap();
    }

    #[test]
    fn disabled_logger_rejects_writes_without_failing_close() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, "chronod.log");
        let logger = Logger::init(&config).unwrap();

        assert!(!logger.toggle());
        assert!(matches!(
            logger.write(Verbosity::Low, "dropped"),
            Err(LoggerError::Disabled)
        ));
        assert!(logger.toggle());
        logger.write(Verbosity::Low, "kept").unwrap();
        logger.close().unwrap();

        let contents = std::fs::read_to_string(&config.path).unwrap();
        assert!(!contents.contains("dropped"));
        assert!(contents.contains("kept"));
    }

    #[test]
    fn write_after_close_is_not_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, "chronod.log");
        let logger = Logger::init(&config).unwrap();
        logger.close().unwrap();

        assert!(matches!(
            logger.write(Verbosity::Low, "late"),
            Err(LoggerError::NotInitialized)
        ));
        assert!(matches!(logger.close(), Err(LoggerError::NotInitialized)));
    }

    #[test]
    fn verbosity_cycles_through_all_levels() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, "chronod.log");
        let logger = Logger::init(&config).unwrap();

        assert_eq!(logger.verbosity(), Verbosity::Low);
        assert_eq!(logger.cycle_verbosity(), Verbosity::Standard);
        assert_eq!(logger.cycle_verbosity(), Verbosity::High);
        assert_eq!(logger.cycle_verbosity(), Verbosity::Low);
        logger.close().unwrap();
    }

    #[test]
    fn snapshot_uses_registered_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, "chronod.log");
        let logger = Logger::init(&config).unwrap();

        let default_dump = logger.dump_snapshot().unwrap();
        let body = std::fs::read_to_string(&default_dump).unwrap();
        assert!(body.contains(&format!("pid: {}", std::process::id())));

        logger.set_snapshot_source(|| "tasks: 3\n".to_string());
        let custom_dump = logger.dump_snapshot().unwrap();
        let body = std::fs::read_to_string(&custom_dump).unwrap();
        assert_eq!(body, "tasks: 3\n");
        logger.close().unwrap();
    }
}
