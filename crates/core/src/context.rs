//! Well-known context-map keys passed to interpreter processes.
//!
//! These must match the environment keys the interpreter runtime reads
//! out of the `note_context` / `user_context` maps on a push call.

/// Database id of the note the paragraph belongs to.
pub const CTX_NOTE_ID: &str = "FOLIO_NOTE_ID";

/// Database id of the paragraph being executed.
pub const CTX_PARAGRAPH_ID: &str = "FOLIO_PARAGRAPH_ID";

/// Database id of the job carrying this dispatch attempt.
pub const CTX_JOB_ID: &str = "FOLIO_JOB_ID";

/// Name of the submitting user.
pub const CTX_USER_NAME: &str = "FOLIO_USER_NAME";

/// Comma-separated roles of the submitting user.
pub const CTX_USER_ROLES: &str = "FOLIO_USER_ROLES";
