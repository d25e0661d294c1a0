use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Channel constants — both ends of the request channel must agree on these.
/// Intended number of in-flight query records on the request channel. The
/// kernel socket buffer provides the actual bound; a sender blocks once the
/// receiver's queue is full.
pub const REQUEST_CHANNEL_DEPTH: usize = 10;
/// Upper bound on one encoded Query datagram (also the receive buffer size).
pub const MAX_QUERY_BYTES: usize = 4096;
/// Upper bound on one encoded Reply datagram.
pub const MAX_REPLY_BYTES: usize = 1024;
/// Upper bound on the program path field of a Query.
pub const MAX_PROGRAM_BYTES: usize = 256;

/// Top-level config (chronod.toml + CHRONOD_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChronodConfig {
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for ChronodConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Filesystem names for the request channel and per-client reply channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Well-known request socket path. A server binds it create-exclusively;
    /// a path that is already bound means another instance is running.
    #[serde(default = "default_request_socket")]
    pub request_socket: String,
    /// Directory where Display clients bind their ephemeral reply sockets.
    #[serde(default = "default_reply_dir")]
    pub reply_dir: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            request_socket: default_request_socket(),
            reply_dir: default_reply_dir(),
        }
    }
}

/// Logger collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Append-only log file written by the Logger collaborator.
    #[serde(default = "default_log_path")]
    pub path: String,
    /// Directory for timestamped snapshot dump files.
    #[serde(default = "default_dump_dir")]
    pub dump_dir: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            dump_dir: default_dump_dir(),
        }
    }
}

fn runtime_dir() -> String {
    std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string())
}

fn state_dir() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.chronod")
}

fn default_request_socket() -> String {
    format!("{}/chronod/request.sock", runtime_dir())
}

fn default_reply_dir() -> String {
    format!("{}/chronod", runtime_dir())
}

fn default_log_path() -> String {
    format!("{}/chronod.log", state_dir())
}

fn default_dump_dir() -> String {
    state_dir()
}

impl ChronodConfig {
    /// Load config from a TOML file with CHRONOD_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.chronod/chronod.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: ChronodConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CHRONOD_").split("__"))
            .extract()
            .map_err(|e| crate::error::ChronodError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    format!("{}/chronod.toml", state_dir())
}
