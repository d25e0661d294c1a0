use chronod_core::config::{MAX_PROGRAM_BYTES, MAX_QUERY_BYTES};
use chronod_core::{ChronodError, Result, TimeSpec};
use serde::{Deserialize, Serialize};

/// Request kind carried by every [`Query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Relative,
    Absolute,
    Periodic,
    Display,
    Cancel,
    Shutdown,
}

/// Client → Server request record. One JSON datagram on the wire; immutable
/// once sent.
///
/// Wire: `{"command":"relative","program":"/bin/true","offset":{"seconds":5,...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub command: Command,
    /// Target task id — meaningful for Cancel only.
    #[serde(default)]
    pub task_id: u64,
    /// Program path — set by the three scheduling commands.
    #[serde(default)]
    pub program: String,
    /// Arguments passed to the program at execution time.
    #[serde(default)]
    pub args: Vec<String>,
    /// Reply socket path — set by Display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    /// Schedule offset or absolute time fields.
    #[serde(default)]
    pub offset: TimeSpec,
}

impl Query {
    pub fn schedule(
        command: Command,
        offset: TimeSpec,
        program: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Self {
            command,
            task_id: 0,
            program: program.into(),
            args,
            reply_to: None,
            offset,
        }
    }

    pub fn display(reply_to: impl Into<String>) -> Self {
        Self {
            command: Command::Display,
            task_id: 0,
            program: String::new(),
            args: Vec::new(),
            reply_to: Some(reply_to.into()),
            offset: TimeSpec::default(),
        }
    }

    pub fn cancel(task_id: u64) -> Self {
        Self {
            command: Command::Cancel,
            task_id,
            program: String::new(),
            args: Vec::new(),
            reply_to: None,
            offset: TimeSpec::default(),
        }
    }

    pub fn shutdown() -> Self {
        Self {
            command: Command::Shutdown,
            task_id: 0,
            program: String::new(),
            args: Vec::new(),
            reply_to: None,
            offset: TimeSpec::default(),
        }
    }

    /// Encode to one datagram, enforcing the bounded-field contract.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.program.len() > MAX_PROGRAM_BYTES {
            return Err(ChronodError::InvalidCommand(format!(
                "program path exceeds {MAX_PROGRAM_BYTES} bytes"
            )));
        }
        let buf = serde_json::to_vec(self)?;
        if buf.len() > MAX_QUERY_BYTES {
            return Err(ChronodError::InvalidCommand(format!(
                "encoded query exceeds {MAX_QUERY_BYTES} bytes"
            )));
        }
        Ok(buf)
    }

    /// Decode one inbound datagram. A malformed record is an
    /// `InvalidCommand` the dispatch loop logs and skips.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        serde_json::from_slice(buf)
            .map_err(|e| ChronodError::InvalidCommand(format!("malformed query: {e}")))
    }
}

/// Server → Client response record for Display streams.
///
/// An empty `data` field is the end-of-stream terminator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub data: String,
    pub status: i32,
}

impl Reply {
    pub fn line(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            status: 0,
        }
    }

    /// The explicit end-of-stream terminator.
    pub fn end() -> Self {
        Self {
            data: String::new(),
            status: 0,
        }
    }

    pub fn is_end(&self) -> bool {
        self.data.is_empty()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(buf)?)
    }
}
