pub mod batch;
pub mod job;
pub mod payload;
pub mod result;

pub use batch::JobBatch;
pub use job::{Job, NewJob};
pub use payload::JobPayload;
pub use result::JobResultRow;
