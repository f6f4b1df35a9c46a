//! Orchestration engine: turns persisted batches of jobs into RPC
//! calls against interpreter processes.
//!
//! The moving parts, wired together by the server binary:
//!
//! - [`store::JobStore`] — persistence seam over the batch/job tables;
//!   [`pg::PgStore`] is the Postgres implementation.
//! - [`registry::ProcessRegistry`] — in-memory map of interpreter
//!   processes keyed by shebang.
//! - [`launcher::Launcher`] — spawns interpreter host processes and
//!   reports their exits on a channel; [`reaper::run_reaper`] is the
//!   single consumer of that channel.
//! - [`results::ResultHandler`] — receives callbacks (registration,
//!   job results, streamed output) from the processes.
//! - [`scheduler::Scheduler`] — the polling loop driving dispatch,
//!   cancellation, and the dead-interpreter sweep.
//! - [`ops`] — the batch submit/cancel surface used by API layers.

pub mod config;
pub mod launcher;
pub mod ops;
pub mod pg;
pub mod reaper;
pub mod registry;
pub mod results;
pub mod scheduler;
pub mod store;

pub use config::EngineConfig;
pub use launcher::{Launcher, ProcessExit};
pub use pg::PgStore;
pub use registry::ProcessRegistry;
pub use results::ResultHandler;
pub use scheduler::Scheduler;
pub use store::{JobStore, StoreError};
