//! Per-call RPC client for a registered interpreter process.
//!
//! Every operation opens a fresh TCP connection, performs one
//! request/response exchange under a deadline, and closes the
//! transport. Any failure (connect, send, receive, decode, deadline)
//! yields `None`, never an error: callers treat an absent result as
//! "dispatch failed, the job stays eligible", not as a hard fault.

use std::collections::HashMap;
use std::time::Duration;

use tokio::net::TcpStream;
use uuid::Uuid;

use crate::codec::{framed, recv_message, send_message};
use crate::messages::{
    CancelResult, InterpreterRequest, InterpreterResponse, PingResult, PushRequest, PushResult,
};

/// Default deadline applied to every call.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// RPC client bound to one interpreter process address.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    host: String,
    port: u16,
    call_timeout: Duration,
}

impl RemoteClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Override the per-call deadline.
    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Deliver a job payload and its context maps.
    pub async fn push(
        &self,
        payload: String,
        note_context: HashMap<String, String>,
        user_context: HashMap<String, String>,
        configuration: HashMap<String, String>,
    ) -> Option<PushResult> {
        let request = InterpreterRequest::Push(PushRequest {
            payload,
            note_context,
            user_context,
            configuration,
        });
        match self.call(request).await? {
            InterpreterResponse::Push(result) => Some(result),
            other => {
                tracing::warn!(host = %self.host, port = self.port, response = ?other,
                    "Unexpected response to push");
                None
            }
        }
    }

    /// Health probe used before trusting a registry entry.
    pub async fn ping(&self) -> Option<PingResult> {
        match self.call(InterpreterRequest::Ping).await? {
            InterpreterResponse::Ping(result) => Some(result),
            other => {
                tracing::warn!(host = %self.host, port = self.port, response = ?other,
                    "Unexpected response to ping");
                None
            }
        }
    }

    /// Ask the process to stop executing one job.
    pub async fn cancel(&self, interpreter_job_uuid: Uuid) -> Option<CancelResult> {
        let request = InterpreterRequest::Cancel {
            interpreter_job_uuid,
        };
        match self.call(request).await? {
            InterpreterResponse::Cancel(result) => Some(result),
            other => {
                tracing::warn!(host = %self.host, port = self.port, response = ?other,
                    "Unexpected response to cancel");
                None
            }
        }
    }

    /// Best-effort process-wide shutdown request. Failures are
    /// swallowed; the transport is dropped regardless of outcome.
    pub async fn force_kill(&self) {
        tracing::info!(host = %self.host, port = self.port, "Force kill requested");
        let _ = self.call(InterpreterRequest::Shutdown).await;
    }

    /// One request/response exchange on a fresh connection, bounded by
    /// the call deadline. Timeout is treated identically to transport
    /// failure.
    async fn call(&self, request: InterpreterRequest) -> Option<InterpreterResponse> {
        let exchange = self.exchange(request);
        match tokio::time::timeout(self.call_timeout, exchange).await {
            Ok(Ok(response)) => Some(response),
            Ok(Err(e)) => {
                tracing::warn!(host = %self.host, port = self.port, error = %e, "RPC call failed");
                None
            }
            Err(_elapsed) => {
                tracing::warn!(host = %self.host, port = self.port,
                    timeout_ms = self.call_timeout.as_millis() as u64, "RPC call timed out");
                None
            }
        }
    }

    async fn exchange(
        &self,
        request: InterpreterRequest,
    ) -> Result<InterpreterResponse, crate::codec::FrameError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        let mut transport = framed(stream);
        send_message(&mut transport, &request).await?;
        recv_message(&mut transport).await
    }
}
