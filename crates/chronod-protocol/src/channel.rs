//! Unix-datagram transport for Query and Reply records.
//!
//! The request channel is a well-known socket path the server binds
//! create-exclusively; a pre-existing binding means another instance is
//! already running. Reply channels are ephemeral per-Display sockets named
//! after the client's pid and removed on every exit path via Drop.

use std::path::{Path, PathBuf};

use chronod_core::config::{MAX_QUERY_BYTES, MAX_REPLY_BYTES};
use chronod_core::{ChronodError, Result};
use tokio::net::UnixDatagram;
use tracing::debug;

use crate::frames::{Query, Reply};

/// Server end of the well-known request channel.
pub struct RequestChannel {
    sock: UnixDatagram,
    path: PathBuf,
}

impl RequestChannel {
    /// Bind the request socket, creating its parent directory. Fails with
    /// `ChannelOpen` when the path is already bound (another server runs) or
    /// cannot be created.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let sock = UnixDatagram::bind(&path).map_err(|e| ChronodError::ChannelOpen {
            name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), "request channel bound");
        Ok(Self { sock, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Receive the next whole Query record. Transport failures surface as
    /// `ChannelReceive`, malformed records as `InvalidCommand` — the dispatch
    /// loop logs either and continues.
    pub async fn recv_query(&self) -> Result<Query> {
        let mut buf = vec![0u8; MAX_QUERY_BYTES];
        let n = self
            .sock
            .recv(&mut buf)
            .await
            .map_err(|e| ChronodError::ChannelReceive {
                name: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        Query::decode(&buf[..n])
    }
}

impl Drop for RequestChannel {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Client end of the request channel.
pub struct RequestSender {
    sock: UnixDatagram,
    path: PathBuf,
}

impl RequestSender {
    /// Connect to the pre-existing request socket. An absent or dead socket
    /// fails here, before anything is sent.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let sock = UnixDatagram::unbound().map_err(ChronodError::Io)?;
        sock.connect(&path).map_err(|e| ChronodError::ChannelOpen {
            name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { sock, path })
    }

    pub async fn send_query(&self, query: &Query) -> Result<()> {
        let buf = query.encode()?;
        self.sock
            .send(&buf)
            .await
            .map_err(|e| ChronodError::ChannelSend {
                name: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

/// Liveness probe: a datagram connect succeeds only when a live socket is
/// bound at `path`.
pub fn server_running(path: impl AsRef<Path>) -> bool {
    match UnixDatagram::unbound() {
        Ok(sock) => sock.connect(path.as_ref()).is_ok(),
        Err(_) => false,
    }
}

/// Client-side ephemeral reply channel for one Display request.
///
/// Bound before the query is sent so no reply can race the channel's
/// existence; the socket file is removed on Drop, crash-or-success alike.
pub struct ReplyChannel {
    sock: UnixDatagram,
    path: PathBuf,
}

impl ReplyChannel {
    /// Bind `reply-<pid>.sock` under `dir` for the calling process.
    pub fn bind_for(dir: impl AsRef<Path>, pid: u32) -> Result<Self> {
        let path = dir.as_ref().join(format!("reply-{pid}.sock"));
        Self::bind(path)
    }

    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // A leftover socket from a previous crashed run of this same pid
        // would block the bind; it is ours by construction, so clear it.
        let _ = std::fs::remove_file(&path);
        let sock = UnixDatagram::bind(&path).map_err(|e| ChronodError::ChannelOpen {
            name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { sock, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Receive one Reply record; blocks until the server produces it.
    pub async fn recv_reply(&self) -> Result<Reply> {
        let mut buf = vec![0u8; MAX_REPLY_BYTES];
        let n = self
            .sock
            .recv(&mut buf)
            .await
            .map_err(|e| ChronodError::ChannelReceive {
                name: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        Reply::decode(&buf[..n])
    }
}

impl Drop for ReplyChannel {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Server end used to stream Display replies to one client.
pub struct ReplySender {
    sock: UnixDatagram,
    path: PathBuf,
}

impl ReplySender {
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let sock = UnixDatagram::unbound().map_err(ChronodError::Io)?;
        sock.connect(&path).map_err(|e| ChronodError::ChannelOpen {
            name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { sock, path })
    }

    pub async fn send_reply(&self, reply: &Reply) -> Result<()> {
        let buf = reply.encode()?;
        self.sock
            .send(&buf)
            .await
            .map_err(|e| ChronodError::ChannelSend {
                name: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}
