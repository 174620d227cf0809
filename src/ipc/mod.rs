//! IPC module for the sysupdate mock.
//!
//! Exposes the object tree over a local socket (Unix domain socket or named
//! pipe) using length-prefixed JSON frames shaped like D-Bus messages.

mod call;
mod connections;
mod framing;
mod handler;
mod protocol;
mod server;

pub use call::{
    CallError, Interface, JobMethod, ManagerMethod, PeerMethod, PropertiesMethod, TargetMethod,
};
pub use connections::{ConnectionConfig, ConnectionGuard, ConnectionPool};
pub use framing::{read_frame, write_frame};
pub use handler::{HandlerError, IpcHandler};
pub use protocol::{
    decode_message, encode_message, error_name, ErrorReply, IpcMessage, MethodCall, MethodReturn,
    ProtocolError, SignalMessage, MAX_MESSAGE_SIZE,
};
pub use server::{connect, run_server, serve_connection, IpcServerConfig, ServerError};
