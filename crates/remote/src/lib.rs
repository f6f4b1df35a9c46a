//! Binary RPC protocol between the orchestrator and interpreter
//! processes.
//!
//! Two logical services share one wire format (length-prefixed frames
//! carrying JSON-encoded messages):
//!
//! - the interpreter-side service ([`client::RemoteClient`]) accepts
//!   push/ping/cancel/shutdown calls from the orchestrator;
//! - the orchestrator-side callback service ([`server::CallbackServer`])
//!   receives unsolicited registration, result, and output messages
//!   from spawned processes.

pub mod client;
pub mod codec;
pub mod messages;
pub mod server;

pub use client::RemoteClient;
pub use server::{CallbackServer, CallbackSink};
