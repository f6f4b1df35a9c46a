//! Length-prefixed JSON framing shared by both services.
//!
//! Each frame is a 4-byte big-endian length followed by one JSON
//! message. Frames are capped to keep a misbehaving peer from forcing
//! an unbounded allocation.

use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// Maximum frame size (8 MiB). Interpreter output larger than this is
/// expected to arrive as multiple output-append frames.
const MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

/// A framed transport carrying JSON messages.
pub type Transport<S> = Framed<S, LengthDelimitedCodec>;

/// Errors surfaced while reading or writing frames.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame encode/decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("peer closed the connection")]
    Closed,
}

/// Wrap a stream in the length-delimited framing used on the wire.
pub fn framed<S>(stream: S) -> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_BYTES)
        .length_field_type::<u32>()
        .new_framed(stream)
}

/// Serialize `message` and send it as one frame.
pub async fn send_message<S, M>(transport: &mut Transport<S>, message: &M) -> Result<(), FrameError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    M: Serialize,
{
    let bytes = serde_json::to_vec(message)?;
    transport.send(bytes.into()).await?;
    Ok(())
}

/// Receive one frame and deserialize it as `M`.
///
/// Returns [`FrameError::Closed`] if the peer hung up between frames.
pub async fn recv_message<S, M>(transport: &mut Transport<S>) -> Result<M, FrameError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    M: DeserializeOwned,
{
    let frame = transport.next().await.ok_or(FrameError::Closed)??;
    Ok(serde_json::from_slice(&frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{InterpreterRequest, InterpreterResponse, PingResult, PingStatus};

    #[tokio::test]
    async fn frames_round_trip_over_a_socket_pair() {
        let (client, server) = tokio::io::duplex(1024);
        let mut client = framed(client);
        let mut server = framed(server);

        send_message(&mut client, &InterpreterRequest::Ping)
            .await
            .unwrap();
        let request: InterpreterRequest = recv_message(&mut server).await.unwrap();
        assert!(matches!(request, InterpreterRequest::Ping));

        let response = InterpreterResponse::Ping(PingResult {
            status: PingStatus::Ok,
        });
        send_message(&mut server, &response).await.unwrap();
        let parsed: InterpreterResponse = recv_message(&mut client).await.unwrap();
        assert!(matches!(
            parsed,
            InterpreterResponse::Ping(PingResult {
                status: PingStatus::Ok
            })
        ));
    }

    #[tokio::test]
    async fn closed_peer_yields_closed_error() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let mut client = framed(client);
        let result: Result<InterpreterRequest, _> = recv_message(&mut client).await;
        assert!(matches!(result, Err(FrameError::Closed)));
    }
}
