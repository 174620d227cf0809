//! IPC client used by the CLI subcommands.
//!
//! One connection per command. Replies are matched by serial; signals that
//! arrive while a call is outstanding are buffered for `next_signal`.

use std::collections::VecDeque;
use std::io;

use interprocess::local_socket::tokio::prelude::*;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::ipc::{
    self, decode_message, encode_message, read_frame, write_frame, IpcMessage, MethodCall,
    ProtocolError, SignalMessage,
};
use crate::sysupdate::ObjectPath;

/// Largest reply the CLI accepts.
const CLIENT_FRAME_LIMIT: usize = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Cannot connect to {socket}: {source}")]
    Connect {
        socket: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{name}: {message}")]
    Remote { name: String, message: String },

    #[error("Connection closed by server")]
    Closed,

    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),
}

impl CliError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Connect { .. } => 3,
            _ => 1,
        }
    }
}

type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;
type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// Connection factory bound to a socket path.
pub struct CliIpcClient {
    socket_path: String,
}

impl CliIpcClient {
    pub fn new(socket_path: String) -> Self {
        Self { socket_path }
    }

    pub fn socket_path(&self) -> &str {
        &self.socket_path
    }

    pub async fn connect(&self) -> Result<CliConnection, CliError> {
        let stream = ipc::connect(&self.socket_path)
            .await
            .map_err(|source| CliError::Connect {
                socket: self.socket_path.clone(),
                source,
            })?;
        let (reader, writer) = stream.split();
        Ok(CliConnection::new(reader, writer))
    }

    /// Open a connection, make one call and return the reply body.
    pub async fn call(
        &self,
        path: ObjectPath,
        interface: &str,
        member: &str,
        args: Vec<Value>,
    ) -> Result<Vec<Value>, CliError> {
        let mut connection = self.connect().await?;
        connection.call(path, interface, member, args).await
    }
}

/// An open client connection.
pub struct CliConnection {
    reader: BoxedReader,
    writer: BoxedWriter,
    next_serial: u32,
    pending_signals: VecDeque<SignalMessage>,
}

impl CliConnection {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            next_serial: 1,
            pending_signals: VecDeque::new(),
        }
    }

    async fn send(&mut self, message: &IpcMessage) -> Result<(), CliError> {
        let bytes = encode_message(message)?;
        write_frame(&mut self.writer, &bytes).await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<IpcMessage, CliError> {
        let frame = read_frame(&mut self.reader, CLIENT_FRAME_LIMIT)
            .await?
            .ok_or(CliError::Closed)?;
        Ok(decode_message(&frame)?)
    }

    /// Make a method call and wait for its reply.
    pub async fn call(
        &mut self,
        path: ObjectPath,
        interface: &str,
        member: &str,
        args: Vec<Value>,
    ) -> Result<Vec<Value>, CliError> {
        let serial = self.next_serial;
        self.next_serial = self.next_serial.wrapping_add(1);
        let call = MethodCall::new(serial, path, interface, member, args);
        self.send(&IpcMessage::MethodCall(call)).await?;

        loop {
            match self.receive().await? {
                IpcMessage::MethodReturn(ret) if ret.reply_serial == serial => return Ok(ret.body),
                IpcMessage::Error(err) if err.reply_serial.map_or(true, |s| s == serial) => {
                    return Err(CliError::Remote {
                        name: err.name,
                        message: err.message,
                    });
                }
                IpcMessage::Signal(signal) => self.pending_signals.push_back(signal),
                // Late reply to an earlier call, or a subscription ack.
                _ => {}
            }
        }
    }

    /// Ask the server to deliver signals on this connection.
    pub async fn subscribe(&mut self) -> Result<(), CliError> {
        self.send(&IpcMessage::Subscribe).await?;
        loop {
            match self.receive().await? {
                IpcMessage::Subscribed => return Ok(()),
                IpcMessage::Signal(signal) => self.pending_signals.push_back(signal),
                IpcMessage::Error(err) => {
                    return Err(CliError::Remote {
                        name: err.name,
                        message: err.message,
                    })
                }
                other => return Err(CliError::UnexpectedReply(format!("{:?}", other))),
            }
        }
    }

    /// Next signal, buffered or from the wire.
    pub async fn next_signal(&mut self) -> Result<SignalMessage, CliError> {
        if let Some(signal) = self.pending_signals.pop_front() {
            return Ok(signal);
        }
        loop {
            if let IpcMessage::Signal(signal) = self.receive().await? {
                return Ok(signal);
            }
        }
    }
}
