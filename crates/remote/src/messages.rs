//! Wire message types for both RPC services.
//!
//! Every frame on the wire is one of these enums, serialized as JSON
//! with an internal `"type"` tag and a `"data"` payload.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Interpreter-side service (orchestrator -> interpreter process)
// ---------------------------------------------------------------------------

/// A request sent to an interpreter process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InterpreterRequest {
    /// Deliver a job payload plus its context maps for execution.
    #[serde(rename = "push")]
    Push(PushRequest),

    /// Health probe.
    #[serde(rename = "ping")]
    Ping,

    /// Ask the process to stop executing one job.
    #[serde(rename = "cancel")]
    Cancel { interpreter_job_uuid: Uuid },

    /// Ask the whole process to exit.
    #[serde(rename = "shutdown")]
    Shutdown,
}

/// Body of a push call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushRequest {
    /// Paragraph text to execute.
    pub payload: String,
    pub note_context: HashMap<String, String>,
    pub user_context: HashMap<String, String>,
    pub configuration: HashMap<String, String>,
}

/// A response from an interpreter process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InterpreterResponse {
    #[serde(rename = "push")]
    Push(PushResult),

    #[serde(rename = "ping")]
    Ping(PingResult),

    #[serde(rename = "cancel")]
    Cancel(CancelResult),

    /// Acknowledgement of a shutdown request.
    #[serde(rename = "shutdown")]
    Shutdown,
}

/// Outcome of a push call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushResult {
    pub status: PushStatus,
    /// Identity of the process that accepted the job.
    pub interpreter_process_uuid: Uuid,
    /// Identity the process assigned to the accepted job.
    pub interpreter_job_uuid: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PushStatus {
    /// Job accepted; a result callback will follow.
    Accept,
    /// Process is busy; the job stays eligible for a later attempt.
    Decline,
    /// Process rejected the payload.
    Error,
}

/// Outcome of a ping call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResult {
    pub status: PingStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PingStatus {
    Ok,
    /// Process asks to be terminated (e.g. it is wedged or idle).
    KillMe,
}

/// Outcome of a cancel call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResult {
    pub status: CancelStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelStatus {
    /// Cancellation started; an aborted result callback will follow.
    Accept,
    /// The process knows nothing about that job.
    NotFound,
    Error,
}

// ---------------------------------------------------------------------------
// Callback service (interpreter process -> orchestrator)
// ---------------------------------------------------------------------------

/// An unsolicited message from a spawned process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CallbackMessage {
    /// A freshly launched process announces itself.
    #[serde(rename = "register")]
    Register(RegisterInfo),

    /// Final result of one job.
    #[serde(rename = "result")]
    Result(ResultEvent),

    /// Streamed partial output; fire-and-forget.
    #[serde(rename = "output")]
    Output(OutputAppendEvent),
}

/// Registration callback sent once the process is ready to serve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInfo {
    pub shebang: String,
    /// Address the process listens on for interpreter-side calls.
    pub host: String,
    pub port: u16,
    pub process_uuid: Uuid,
}

/// Final result callback for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEvent {
    pub interpreter_job_uuid: Uuid,
    pub result: InterpreterResult,
}

/// What the interpreter produced for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterResult {
    pub code: ResultCode,
    pub messages: Vec<ResultMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    Success,
    Error,
    Aborted,
}

/// One output message within a result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMessage {
    /// Message kind, e.g. `TEXT` or `HTML`.
    pub r#type: String,
    pub data: String,
}

/// Partial output append, streamed while a job runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputAppendEvent {
    pub interpreter_job_uuid: Uuid,
    pub append: String,
}
