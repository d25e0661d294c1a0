//! `chronod-core` — shared configuration, errors, and the five-field time
//! record used by both the wire protocol and the scheduler.

pub mod config;
pub mod error;
pub mod types;

pub use error::{ChronodError, Result};
pub use types::TimeSpec;
