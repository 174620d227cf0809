//! IPC server loop.
//!
//! Accepts local-socket connections (Unix domain sockets, named pipes on
//! Windows), applies the connection limit and serves each connection on its
//! own task. A connection that sends `subscribe` additionally receives every
//! signal the object tree emits.

use std::io;
use std::sync::Arc;

use interprocess::local_socket::tokio::{prelude::*, Stream};
use interprocess::local_socket::{GenericFilePath, ListenerOptions, ToFsName};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use super::connections::ConnectionPool;
use super::framing::{read_frame, write_frame};
use super::handler::IpcHandler;
use super::protocol::{decode_message, encode_message, error_name, IpcMessage, SignalMessage};
use crate::sysupdate::Signal;

/// Replies and signals queued per connection before the reader waits.
const OUTBOUND_QUEUE: usize = 64;

#[derive(Debug, Clone)]
pub struct IpcServerConfig {
    pub max_frame_size: usize,
}

impl Default for IpcServerConfig {
    fn default() -> Self {
        Self {
            max_frame_size: 1024 * 1024,
        }
    }
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IPC I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Serve until `shutdown_rx` flips to `true`.
pub async fn run_server(
    socket_path: String,
    handler: Arc<IpcHandler>,
    connections: Arc<ConnectionPool>,
    mut shutdown_rx: watch::Receiver<bool>,
    config: IpcServerConfig,
) -> Result<(), ServerError> {
    clear_stale_socket(&socket_path).await?;
    let name = socket_path.as_str().to_fs_name::<GenericFilePath>()?;
    let listener = ListenerOptions::new().name(name).create_tokio()?;
    tracing::info!(socket = %socket_path, "IPC server listening");

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            accepted = listener.accept() => {
                let stream = match accepted {
                    Ok(stream) => stream,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        continue;
                    }
                };
                let Some(guard) = connections.try_acquire() else {
                    tracing::warn!(
                        max = connections.max_connections(),
                        "Connection limit reached, dropping client"
                    );
                    continue;
                };

                let handler = Arc::clone(&handler);
                let max_frame_size = config.max_frame_size;
                tokio::spawn(async move {
                    let (reader, writer) = stream.split();
                    serve_connection(reader, writer, handler, max_frame_size).await;
                    drop(guard);
                });
            }
        }
    }

    tracing::info!("IPC server stopped accepting connections");
    drop(listener);
    remove_socket_file(&socket_path);
    Ok(())
}

/// Serve one connection until the peer closes it or sends a bad frame.
pub async fn serve_connection<R, W>(
    mut reader: R,
    writer: W,
    handler: Arc<IpcHandler>,
    max_frame_size: usize,
) where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tracing::debug!("Client connected");
    let (out_tx, out_rx) = mpsc::channel::<IpcMessage>(OUTBOUND_QUEUE);
    let writer_task = tokio::spawn(write_outbound(writer, out_rx));
    let mut forwarder: Option<JoinHandle<()>> = None;

    loop {
        let frame = match read_frame(&mut reader, max_frame_size).await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping connection");
                break;
            }
        };

        let response = match decode_message(&frame) {
            Ok(IpcMessage::Subscribe) => {
                if forwarder.is_none() {
                    forwarder = Some(spawn_signal_forwarder(handler.subscribe(), out_tx.clone()));
                }
                IpcMessage::Subscribed
            }
            Ok(message) => handler.handle_message(message),
            Err(e) => IpcMessage::error(None, error_name::INVALID_ARGS, e.to_string()),
        };

        if out_tx.send(response).await.is_err() {
            break;
        }
    }

    if let Some(forwarder) = forwarder {
        forwarder.abort();
        let _ = forwarder.await;
    }
    drop(out_tx);
    let _ = writer_task.await;
    tracing::debug!("Client disconnected");
}

async fn write_outbound<W>(mut writer: W, mut out_rx: mpsc::Receiver<IpcMessage>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = out_rx.recv().await {
        let bytes = match encode_message(&message) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode outbound message");
                continue;
            }
        };
        if let Err(e) = write_frame(&mut writer, &bytes).await {
            tracing::debug!(error = %e, "Write failed, closing connection");
            break;
        }
    }
}

fn spawn_signal_forwarder(
    mut signals: broadcast::Receiver<Signal>,
    out: mpsc::Sender<IpcMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match signals.recv().await {
                Ok(signal) => {
                    let message = IpcMessage::Signal(SignalMessage::from(&signal));
                    if out.send(message).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Subscriber lagging, signals dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Connect to a running server.
pub async fn connect(socket_path: &str) -> io::Result<Stream> {
    let name = socket_path.to_fs_name::<GenericFilePath>()?;
    Stream::connect(name).await
}

/// Remove a socket file left behind by a previous run. Refuses to touch a
/// socket that still accepts connections.
#[cfg(unix)]
async fn clear_stale_socket(path: &str) -> io::Result<()> {
    if connect(path).await.is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AddrInUse,
            format!("{} is served by a running instance", path),
        ));
    }
    remove_socket_file(path);
    Ok(())
}

#[cfg(not(unix))]
async fn clear_stale_socket(_path: &str) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn remove_socket_file(path: &str) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(socket = path, error = %e, "Could not remove socket file");
        }
    }
}

#[cfg(not(unix))]
fn remove_socket_file(_path: &str) {}
