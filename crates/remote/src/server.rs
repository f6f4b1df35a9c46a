//! Callback server: the long-lived listener spawned processes dial
//! back into.
//!
//! One TCP listener, one task per accepted connection. Incoming
//! [`CallbackMessage`]s are handed to a [`CallbackSink`]; none of them
//! carry a response, so a connection is read until the peer hangs up.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::codec::{framed, recv_message, FrameError};
use crate::messages::{CallbackMessage, OutputAppendEvent, RegisterInfo, ResultEvent};

/// The orchestrator must observe the listener serving within this
/// window or refuse to launch processes against it.
pub const SERVER_START_TIMEOUT: Duration = Duration::from_secs(30);

/// Receiver for callback traffic. Implemented by the engine.
#[async_trait]
pub trait CallbackSink: Send + Sync + 'static {
    /// A freshly launched process announced itself.
    async fn register(&self, info: RegisterInfo);

    /// A job finished; the final result arrived.
    async fn result(&self, event: ResultEvent);

    /// Partial output streamed while a job runs. Fire-and-forget.
    async fn output(&self, event: OutputAppendEvent);
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind callback listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("callback server failed to start within {0:?}")]
    StartTimeout(Duration),
}

/// Long-lived listener for process callbacks.
pub struct CallbackServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl CallbackServer {
    /// Bind the listener, enforcing the bounded startup window.
    ///
    /// Binding normally completes immediately; the timeout guards
    /// against a wedged network stack so startup fails loudly instead
    /// of launching processes that can never call back.
    pub async fn bind(addr: SocketAddr) -> Result<Self, ServerError> {
        let bind = TcpListener::bind(addr);
        let listener = match tokio::time::timeout(SERVER_START_TIMEOUT, bind).await {
            Ok(Ok(listener)) => listener,
            Ok(Err(source)) => return Err(ServerError::Bind { addr, source }),
            Err(_elapsed) => return Err(ServerError::StartTimeout(SERVER_START_TIMEOUT)),
        };
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr,
            source,
        })?;
        tracing::info!(addr = %local_addr, "Callback server listening");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Address the listener actually bound to (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until the cancellation token fires.
    ///
    /// Each connection gets its own task; a connection-level error
    /// only ends that connection.
    pub async fn serve(self, sink: Arc<dyn CallbackSink>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(addr = %self.local_addr, "Callback server shutting down");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let sink = Arc::clone(&sink);
                            let cancel = cancel.clone();
                            tokio::spawn(async move {
                                handle_connection(stream, peer, sink, cancel).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to accept callback connection");
                        }
                    }
                }
            }
        }
    }
}

/// Read callbacks off one connection until it closes.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    sink: Arc<dyn CallbackSink>,
    cancel: CancellationToken,
) {
    let mut transport = framed(stream);
    loop {
        let message: Result<CallbackMessage, FrameError> = tokio::select! {
            _ = cancel.cancelled() => break,
            message = recv_message(&mut transport) => message,
        };
        match message {
            Ok(CallbackMessage::Register(info)) => {
                tracing::info!(shebang = %info.shebang, host = %info.host, port = info.port,
                    process_uuid = %info.process_uuid, "Interpreter process registered");
                sink.register(info).await;
            }
            Ok(CallbackMessage::Result(event)) => {
                sink.result(event).await;
            }
            Ok(CallbackMessage::Output(event)) => {
                sink.output(event).await;
            }
            Err(FrameError::Closed) => break,
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "Dropping callback connection");
                break;
            }
        }
    }
}
