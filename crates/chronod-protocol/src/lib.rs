//! `chronod-protocol` — wire records and the named-channel transport.
//!
//! Queries travel from client to server over one well-known Unix datagram
//! socket; Display replies stream back over an ephemeral per-client socket.
//! Datagrams carry whole records (a partial Query or Reply cannot be
//! observed) and the kernel socket buffer bounds the in-flight queue, so a
//! sender blocks when the server falls behind.

pub mod channel;
pub mod frames;

pub use channel::{server_running, ReplyChannel, ReplySender, RequestChannel, RequestSender};
pub use frames::{Command, Query, Reply};
